//! Cache de sesiones en memoria delante de un `StepStore`.
//!
//! La cache se construye explícitamente y se comparte por `Arc`; no existe
//! una instancia global. `CachedStepStore` es la única vía de escritura: cada
//! `write` actualiza la entrada con el snapshot recién persistido y cada
//! `delete` la purga.
//!
//! Limitación conocida: la cache vive en un proceso. Dos procesos (o dos
//! escritores concurrentes sobre la misma sesión) compiten con semántica
//! last-write-wins y pueden leer estado obsoleto.
use dashmap::DashMap;
use std::sync::Arc;

use super::{session_key, StepStore};
use crate::errors::StoreError;
use crate::model::{Fact, SessionId, SessionSnapshot};

pub struct WorkflowCache<F: Fact> {
    entries: Arc<DashMap<String, SessionSnapshot<F>>>,
}

impl<F: Fact> Clone for WorkflowCache<F> {
    fn clone(&self) -> Self {
        Self { entries: Arc::clone(&self.entries) }
    }
}

impl<F: Fact> Default for WorkflowCache<F> {
    fn default() -> Self {
        Self { entries: Arc::new(DashMap::new()) }
    }
}

impl<F: Fact> WorkflowCache<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<SessionSnapshot<F>> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    pub fn put(&self, key: String, snapshot: SessionSnapshot<F>) {
        self.entries.insert(key, snapshot);
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `StepStore` que mantiene una `WorkflowCache` sincronizada.
pub struct CachedStepStore<F: Fact, S: StepStore<F>> {
    inner: S,
    cache: WorkflowCache<F>,
}

impl<F: Fact, S: StepStore<F>> CachedStepStore<F, S> {
    pub fn new(inner: S, cache: WorkflowCache<F>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &WorkflowCache<F> {
        &self.cache
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<F: Fact, S: StepStore<F>> StepStore<F> for CachedStepStore<F, S> {
    fn read(&self, workflow_kind: &str, id: SessionId) -> Result<Option<SessionSnapshot<F>>, StoreError> {
        let key = session_key(workflow_kind, id);
        if let Some(hit) = self.cache.get(&key) {
            log::debug!("workflow_cache:hit key={key}");
            return Ok(Some(hit));
        }
        let loaded = self.inner.read(workflow_kind, id)?;
        if let Some(snapshot) = &loaded {
            self.cache.put(key, snapshot.clone());
        }
        Ok(loaded)
    }

    fn write(&mut self, id: SessionId, snapshot: &SessionSnapshot<F>) -> Result<(), StoreError> {
        let key = session_key(&snapshot.header.workflow_kind, id);
        match self.inner.write(id, snapshot) {
            Ok(()) => {
                self.cache.put(key, snapshot.clone());
                Ok(())
            }
            Err(e) => {
                // estado durable desconocido; la próxima lectura va al backend
                self.cache.invalidate(&key);
                Err(e)
            }
        }
    }

    fn delete(&mut self, workflow_kind: &str, id: SessionId) -> Result<bool, StoreError> {
        self.cache.invalidate(&session_key(workflow_kind, id));
        self.inner.delete(workflow_kind, id)
    }

    fn list(&self, workflow_kind: &str) -> Result<Vec<SessionId>, StoreError> {
        self.inner.list(workflow_kind)
    }
}
