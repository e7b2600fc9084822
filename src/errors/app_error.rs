use thiserror::Error;

use seqflow_annotation::WorkflowError;
use seqflow_core::{ChainError, Classify, ErrorClass};
use seqflow_persistence::PersistenceError;

/// Errores de la fachada: workflow o persistencia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

impl From<ChainError> for AppError {
    fn from(e: ChainError) -> Self {
        AppError::Workflow(e.into())
    }
}

impl Classify for AppError {
    fn class(&self) -> ErrorClass {
        match self {
            AppError::Workflow(e) => e.class(),
            AppError::Persistence(_) => ErrorClass::Fatal,
        }
    }
}
