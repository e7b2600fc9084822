use std::collections::BTreeMap;

use super::{decode_snapshot, encode_snapshot, session_key, StepStore};
use crate::errors::StoreError;
use crate::model::{Fact, SessionId, SessionSnapshot};

/// Store en memoria. Guarda los snapshots serializados para que cada `read`
/// pase por la misma decodificación que un backend durable.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStepStore {
    inner: BTreeMap<String, Vec<u8>>,
}

impl InMemoryStepStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Escribe bytes arbitrarios bajo la clave de una sesión (p.ej. para
    /// simular un snapshot corrupto).
    pub fn put_raw(&mut self, workflow_kind: &str, id: SessionId, raw: Vec<u8>) {
        self.inner.insert(session_key(workflow_kind, id), raw);
    }
}

impl<F: Fact> StepStore<F> for InMemoryStepStore {
    fn read(&self, workflow_kind: &str, id: SessionId) -> Result<Option<SessionSnapshot<F>>, StoreError> {
        match self.inner.get(&session_key(workflow_kind, id)) {
            Some(raw) => decode_snapshot(raw).map(Some),
            None => Ok(None),
        }
    }

    fn write(&mut self, id: SessionId, snapshot: &SessionSnapshot<F>) -> Result<(), StoreError> {
        let raw = encode_snapshot(snapshot)?;
        self.inner.insert(session_key(&snapshot.header.workflow_kind, id), raw);
        Ok(())
    }

    fn delete(&mut self, workflow_kind: &str, id: SessionId) -> Result<bool, StoreError> {
        Ok(self.inner.remove(&session_key(workflow_kind, id)).is_some())
    }

    fn list(&self, workflow_kind: &str) -> Result<Vec<SessionId>, StoreError> {
        let prefix = format!("{workflow_kind}/");
        Ok(self.inner
               .keys()
               .filter_map(|k| k.strip_prefix(&prefix))
               .filter_map(|id| id.parse().ok())
               .collect())
    }
}
