//! Persistencia de sesiones completas.
//!
//! `StepStore` lee y escribe el snapshot entero de una sesión. No hay merge:
//! el último write gana. Una sesión inexistente se señala con `Ok(None)`; un
//! snapshot ilegible es `StoreError::Deserialization` y no se reintenta.
pub mod cache;
pub mod memory;

pub use cache::{CachedStepStore, WorkflowCache};
pub use memory::InMemoryStepStore;

use crate::errors::StoreError;
use crate::model::{Fact, SessionId, SessionSnapshot};

pub trait StepStore<F: Fact> {
    fn read(&self, workflow_kind: &str, id: SessionId) -> Result<Option<SessionSnapshot<F>>, StoreError>;

    /// Persiste el snapshot completo, reemplazando el anterior.
    fn write(&mut self, id: SessionId, snapshot: &SessionSnapshot<F>) -> Result<(), StoreError>;

    /// Elimina la sesión. Devuelve `false` si no existía.
    fn delete(&mut self, workflow_kind: &str, id: SessionId) -> Result<bool, StoreError>;

    /// Sesiones persistidas de un tipo de workflow.
    fn list(&self, workflow_kind: &str) -> Result<Vec<SessionId>, StoreError>;
}

impl<F: Fact, T: StepStore<F> + ?Sized> StepStore<F> for &mut T {
    fn read(&self, workflow_kind: &str, id: SessionId) -> Result<Option<SessionSnapshot<F>>, StoreError> {
        (**self).read(workflow_kind, id)
    }

    fn write(&mut self, id: SessionId, snapshot: &SessionSnapshot<F>) -> Result<(), StoreError> {
        (**self).write(id, snapshot)
    }

    fn delete(&mut self, workflow_kind: &str, id: SessionId) -> Result<bool, StoreError> {
        (**self).delete(workflow_kind, id)
    }

    fn list(&self, workflow_kind: &str) -> Result<Vec<SessionId>, StoreError> {
        (**self).list(workflow_kind)
    }
}

impl<F: Fact, T: StepStore<F> + ?Sized> StepStore<F> for Box<T> {
    fn read(&self, workflow_kind: &str, id: SessionId) -> Result<Option<SessionSnapshot<F>>, StoreError> {
        (**self).read(workflow_kind, id)
    }

    fn write(&mut self, id: SessionId, snapshot: &SessionSnapshot<F>) -> Result<(), StoreError> {
        (**self).write(id, snapshot)
    }

    fn delete(&mut self, workflow_kind: &str, id: SessionId) -> Result<bool, StoreError> {
        (**self).delete(workflow_kind, id)
    }

    fn list(&self, workflow_kind: &str) -> Result<Vec<SessionId>, StoreError> {
        (**self).list(workflow_kind)
    }
}

/// Clave de una sesión: `"{workflow_kind}/{session_id}"`. Es la misma para
/// el store y para la cache.
pub fn session_key(workflow_kind: &str, id: SessionId) -> String {
    format!("{workflow_kind}/{id}")
}

pub fn encode_snapshot<F: Fact>(snapshot: &SessionSnapshot<F>) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(snapshot).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Decodifica un snapshot verificando la versión del esquema de hechos antes
/// de tocar los steps. Una versión distinta se trata como snapshot corrupto.
pub fn decode_snapshot<F: Fact>(raw: &[u8]) -> Result<SessionSnapshot<F>, StoreError> {
    let value: serde_json::Value = serde_json::from_slice(raw).map_err(|e| StoreError::Deserialization(e.to_string()))?;
    decode_snapshot_value(value)
}

pub fn decode_snapshot_value<F: Fact>(value: serde_json::Value) -> Result<SessionSnapshot<F>, StoreError> {
    let found = value.pointer("/header/fact_schema_version")
                     .and_then(serde_json::Value::as_u64)
                     .ok_or_else(|| StoreError::Deserialization("missing header.fact_schema_version".into()))?;
    if found != u64::from(F::SCHEMA_VERSION) {
        return Err(StoreError::Deserialization(format!("fact schema version {found} does not match {}", F::SCHEMA_VERSION)));
    }
    serde_json::from_value(value).map_err(|e| StoreError::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::facts::test_facts::DemoFact;

    #[test]
    fn key_is_kind_then_id() {
        let id: SessionId = "6f1c2b9e-1a7d-4c4e-9a51-3f5f0a4d2b10".parse().unwrap();
        assert_eq!(session_key("library_annotation", id), "library_annotation/6f1c2b9e-1a7d-4c4e-9a51-3f5f0a4d2b10");
    }

    #[test]
    fn foreign_schema_version_is_corrupt() {
        let mut snap: SessionSnapshot<DemoFact> = SessionSnapshot::empty("w");
        snap.header.fact_schema_version = 99;
        let raw = encode_snapshot(&snap).unwrap();
        assert!(matches!(decode_snapshot::<DemoFact>(&raw), Err(StoreError::Deserialization(_))));
    }

    #[test]
    fn garbage_is_corrupt() {
        assert!(matches!(decode_snapshot::<DemoFact>(b"{not json"), Err(StoreError::Deserialization(_))));
    }
}
