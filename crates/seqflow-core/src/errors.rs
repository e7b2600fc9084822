//! Errores del core.
//!
//! Taxonomía:
//! - `StoreError`: fallos del backend de persistencia (IO, snapshot corrupto).
//! - `TableError`: uso incorrecto de una `Table` (columna duplicada, tipos).
//! - `ChainError`: errores de secuenciación de steps y envoltorio de los
//!   anteriores.
//!
//! `ErrorClass` fija la política de propagación: lo recuperable vuelve al
//! llamador como datos estructurados; lo fatal aborta el step sin tocar el
//! estado persistido.

use thiserror::Error;

use crate::model::{CellType, SessionId};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StoreError {
    #[error("corrupt session snapshot: {0}")]
    Deserialization(String),
    #[error("could not serialize session snapshot: {0}")]
    Serialization(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TableError {
    #[error("column '{0}' already exists")]
    DuplicateColumn(String),
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    #[error("row has {got} cells but the table has {expected} columns")]
    RowLength { expected: usize, got: usize },
    #[error("row {0} out of bounds")]
    RowOutOfBounds(usize),
    #[error("value of type {found} does not fit column '{column}' ({expected})")]
    TypeMismatch { column: String, expected: CellType, found: CellType },
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ChainError {
    #[error("session {session_id} of workflow '{workflow_kind}' not found")]
    SessionNotFound { workflow_kind: String, session_id: SessionId },
    #[error("corrupt session: {0}")]
    Deserialization(String),
    #[error("session belongs to workflow '{found}', expected '{expected}'")]
    WorkflowKindMismatch { expected: String, found: String },
    #[error("step chain is empty")]
    EmptyChain,
    #[error("step '{0}' not found in chain")]
    KeyNotFound(String),
    #[error("table '{0}' does not exist")]
    TableNotFound(String),
    #[error("invalid branch resolver: {0}")]
    InvalidResolver(String),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("store: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ChainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Deserialization(msg) => ChainError::Deserialization(msg),
            other => ChainError::Store(other),
        }
    }
}

/// Clase de error para decidir si se devuelve al usuario o se aborta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Se presenta al usuario para corrección; la sesión sigue viva.
    Recoverable,
    /// Aborta el step actual; el último write exitoso queda como estado durable.
    Fatal,
}

/// Errores que saben clasificarse según la política de propagación.
pub trait Classify {
    fn class(&self) -> ErrorClass;

    fn is_recoverable(&self) -> bool {
        self.class() == ErrorClass::Recoverable
    }
}

impl Classify for StoreError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Fatal
    }
}

impl Classify for TableError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Fatal
    }
}

impl Classify for ChainError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_snapshot_maps_to_deserialization() {
        let e: ChainError = StoreError::Deserialization("bad json".into()).into();
        assert_eq!(e, ChainError::Deserialization("bad json".into()));
        assert_eq!(e.class(), ErrorClass::Fatal);
    }

    #[test]
    fn io_error_is_wrapped() {
        let e: ChainError = StoreError::Io("disk full".into()).into();
        assert_eq!(e.to_string(), "store: io error: disk full");
    }

    #[test]
    fn type_mismatch_message() {
        let e = TableError::TypeMismatch { column: "seq_depth".into(),
                                           expected: CellType::Float,
                                           found: CellType::Text };
        assert_eq!(e.to_string(), "value of type text does not fit column 'seq_depth' (float)");
    }
}
