//! `StepChain`: colección ordenada y reanudable de `StepRecord` de una sesión.
//!
//! Reglas:
//! - El orden es el de inserción; sólo el último record puede eliminarse
//!   (`pop_last`).
//! - Visitar un step nuevo crea un record que hereda una copia profunda de
//!   metadata y tablas del último.
//! - Toda mutación pública termina con un `StepStore::write` del snapshot
//!   completo. Si el write falla, el estado en memoria vuelve al anterior y el
//!   último write exitoso sigue siendo el estado durable.
use crate::errors::ChainError;
use crate::model::{Fact, FactSheet, SessionHeader, SessionId, SessionSnapshot, StepArgs, StepRecord};
use crate::store::StepStore;

pub struct StepChain<F: Fact, S: StepStore<F>> {
    session_id: SessionId,
    snapshot: SessionSnapshot<F>,
    store: S,
}

impl<F: Fact, S: StepStore<F>> StepChain<F, S> {
    /// Abre la sesión; si no existe la crea vacía y la persiste.
    pub fn open(store: S, workflow_kind: &str, session_id: SessionId) -> Result<Self, ChainError> {
        log::debug!("step_chain:open:start kind={workflow_kind} session={session_id}");
        match Self::load(&store, workflow_kind, session_id)? {
            Some(snapshot) => Ok(Self { session_id, snapshot, store }),
            None => {
                let mut chain = Self { session_id,
                                       snapshot: SessionSnapshot::empty(workflow_kind),
                                       store };
                chain.persist()?;
                log::debug!("step_chain:open:done kind={workflow_kind} session={session_id} fresh=true");
                Ok(chain)
            }
        }
    }

    /// Abre una sesión que debe existir.
    pub fn open_existing(store: S, workflow_kind: &str, session_id: SessionId) -> Result<Self, ChainError> {
        match Self::load(&store, workflow_kind, session_id)? {
            Some(snapshot) => Ok(Self { session_id, snapshot, store }),
            None => Err(ChainError::SessionNotFound { workflow_kind: workflow_kind.to_string(),
                                                      session_id }),
        }
    }

    fn load(store: &S, workflow_kind: &str, session_id: SessionId) -> Result<Option<SessionSnapshot<F>>, ChainError> {
        let Some(snapshot) = store.read(workflow_kind, session_id)? else {
            return Ok(None);
        };
        if snapshot.header.workflow_kind != workflow_kind {
            return Err(ChainError::WorkflowKindMismatch { expected: workflow_kind.to_string(),
                                                          found: snapshot.header.workflow_kind });
        }
        Ok(Some(snapshot))
    }

    fn persist(&mut self) -> Result<(), ChainError> {
        self.store.write(self.session_id, &self.snapshot)?;
        Ok(())
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn header(&self) -> &SessionHeader {
        &self.snapshot.header
    }

    pub fn workflow_kind(&self) -> &str {
        &self.snapshot.header.workflow_kind
    }

    pub fn snapshot(&self) -> &SessionSnapshot<F> {
        &self.snapshot
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.snapshot.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.steps.is_empty()
    }

    pub fn contains(&self, step_name: &str) -> bool {
        self.snapshot.steps.contains_key(step_name)
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.snapshot.step_names()
    }

    pub fn records(&self) -> impl Iterator<Item = (&str, &StepRecord<F>)> {
        self.snapshot.steps.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Record del step `step_name`, creándolo si es la primera visita.
    ///
    /// - Cadena vacía: record semilla con `default_args`.
    /// - Step nuevo: hereda copia del último record, con `default_args`.
    /// - Step existente: se devuelve sin cambios.
    pub fn current(&mut self, step_name: &str, default_args: StepArgs) -> Result<&StepRecord<F>, ChainError> {
        if !self.contains(step_name) {
            log::debug!("step_chain:current:start session={} step={step_name} new=true", self.session_id);
            let record = match self.snapshot.steps.last() {
                Some((_, last)) => StepRecord::inherit(last, default_args),
                None => StepRecord::seed(default_args),
            };
            self.snapshot.steps.insert(step_name.to_string(), record);
            if let Err(e) = self.persist() {
                self.snapshot.steps.shift_remove(step_name);
                log::error!("step_chain:current:failed session={} step={step_name} error={e}", self.session_id);
                return Err(e);
            }
            log::debug!("step_chain:current:done session={} step={step_name} len={}", self.session_id, self.len());
        }
        self.get(step_name)
    }

    /// Aplica `f` sobre una copia del record y, si `f` termina bien, la
    /// persiste. Un error de `f` o del store deja el record intacto.
    pub fn update<R, E>(&mut self, step_name: &str, f: impl FnOnce(&mut StepRecord<F>) -> Result<R, E>) -> Result<R, E>
        where E: From<ChainError>
    {
        let mut working = self.get(step_name)?.clone();
        let out = f(&mut working)?;
        let slot = self.snapshot
                       .steps
                       .get_mut(step_name)
                       .ok_or_else(|| ChainError::KeyNotFound(step_name.to_string()))?;
        let previous = std::mem::replace(slot, working);
        if let Err(e) = self.persist() {
            if let Some(slot) = self.snapshot.steps.get_mut(step_name) {
                *slot = previous;
            }
            log::error!("step_chain:update:failed session={} step={step_name} error={e}", self.session_id);
            return Err(e.into());
        }
        log::debug!("step_chain:update:done session={} step={step_name}", self.session_id);
        Ok(out)
    }

    /// Quita y devuelve el último record.
    pub fn pop_last(&mut self) -> Result<(String, StepRecord<F>), ChainError> {
        let (name, record) = self.snapshot.steps.pop().ok_or(ChainError::EmptyChain)?;
        if let Err(e) = self.persist() {
            self.snapshot.steps.insert(name, record);
            return Err(e);
        }
        log::debug!("step_chain:pop_last:done session={} step={name} len={}", self.session_id, self.len());
        Ok((name, record))
    }

    pub fn get(&self, step_name: &str) -> Result<&StepRecord<F>, ChainError> {
        self.snapshot.steps.get(step_name).ok_or_else(|| ChainError::KeyNotFound(step_name.to_string()))
    }

    pub fn get_last(&self) -> Result<&StepRecord<F>, ChainError> {
        self.snapshot.steps.last().map(|(_, r)| r).ok_or(ChainError::EmptyChain)
    }

    pub fn last_step_name(&self) -> Option<&str> {
        self.snapshot.steps.last().map(|(k, _)| k.as_str())
    }

    /// Lista `(step, hechos)` en orden de visita.
    pub fn traceback(&self) -> Vec<(&str, &FactSheet<F>)> {
        self.records().map(|(name, r)| (name, &r.metadata)).collect()
    }

    /// Cierra la sesión: opcionalmente archiva el snapshot final en otro
    /// store, luego lo elimina del store principal (y de su cache).
    pub fn complete(mut self, archive_to: Option<&mut dyn StepStore<F>>) -> Result<SessionSnapshot<F>, ChainError> {
        let kind = self.snapshot.header.workflow_kind.clone();
        if let Some(archive) = archive_to {
            archive.write(self.session_id, &self.snapshot)?;
        }
        self.store.delete(&kind, self.session_id)?;
        log::debug!("step_chain:complete:done kind={kind} session={} steps={}", self.session_id, self.len());
        Ok(self.snapshot)
    }

    /// Descarta la sesión sin archivar.
    pub fn discard(mut self) -> Result<bool, ChainError> {
        let kind = self.snapshot.header.workflow_kind.clone();
        Ok(self.store.delete(&kind, self.session_id)?)
    }
}
