//! Errores del dominio.
use seqflow_core::{ChainError, Classify, ErrorClass, TableError};
use thiserror::Error;

use crate::categories::BarcodeRole;
use crate::validation::ValidationReport;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum DomainError {
    /// Errores de celda y generales de una pasada de validación.
    #[error("validation failed: {0}")]
    Validation(ValidationReport),

    #[error("invalid nucleotide '{character}' at position {position} in '{sequence}'")]
    InvalidSequence { sequence: String, position: usize, character: char },

    /// Ningún kit encaja: el usuario debe declarar la orientación.
    #[error("orientation of {role:?} barcodes must be declared")]
    OrientationRequired { role: BarcodeRole },

    /// El usuario no conoce la orientación; requiere intervención manual.
    #[error("orientation of {role:?} barcodes is unknown and cannot be resolved automatically")]
    OrientationUnresolved { role: BarcodeRole },

    #[error("index kit {0} not found")]
    KitNotFound(i64),

    #[error("feature kit {0} not found")]
    FeatureKitNotFound(i64),

    #[error("sequence '{sequence}' is not part of kit {kit_id} ({role:?})")]
    UnknownBarcode { kit_id: i64, role: BarcodeRole, sequence: String },

    #[error("unknown {category} '{value}'")]
    UnknownCategory { category: &'static str, value: String },

    #[error("column '{0}' is required but missing")]
    MissingColumn(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Catalog(e.to_string())
    }
}

impl Classify for DomainError {
    fn class(&self) -> ErrorClass {
        match self {
            DomainError::Validation(_) | DomainError::InvalidSequence { .. } | DomainError::OrientationRequired { .. } => {
                ErrorClass::Recoverable
            }
            DomainError::Chain(e) => e.class(),
            _ => ErrorClass::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_shaped_errors_are_recoverable() {
        assert!(DomainError::Validation(ValidationReport::default()).is_recoverable());
        assert!(DomainError::OrientationRequired { role: BarcodeRole::I7 }.is_recoverable());
        assert!(!DomainError::OrientationUnresolved { role: BarcodeRole::I5 }.is_recoverable());
        assert!(!DomainError::KitNotFound(3).is_recoverable());
    }
}
