//! Errores del workflow de anotación.
use seqflow_core::{ChainError, Classify, ErrorClass, StepId, TableError};
use seqflow_domain::DomainError;
use thiserror::Error;

use crate::steps::AnnotationStep;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum WorkflowError {
    #[error("step '{}' cannot be submitted now; the current step is '{}'", found.name(), expected.name())]
    UnexpectedStep { expected: AnnotationStep, found: AnnotationStep },

    #[error("cannot go back from the first step")]
    AtFirstStep,

    #[error("unknown step '{0}'")]
    UnknownStep(String),

    #[error("required fact '{0}' has not been recorded")]
    MissingFact(&'static str),

    #[error("commit failed: {0}")]
    Commit(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Table(#[from] TableError),
}

impl Classify for WorkflowError {
    fn class(&self) -> ErrorClass {
        match self {
            WorkflowError::Domain(e) => e.class(),
            WorkflowError::Chain(e) => e.class(),
            _ => ErrorClass::Fatal,
        }
    }
}
