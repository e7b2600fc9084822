//! Resolución del siguiente step.
//!
//! Cada workflow declara una única lista ordenada de reglas `(step, predicado)`
//! más un step terminal. `next` evalúa, en ese orden, sólo las reglas
//! posteriores al último step de la cadena que figure en la lista; la primera
//! que aplica gana y, si ninguna aplica, se pasa al terminal.
//!
//! Como nunca se vuelve a evaluar una regla anterior al step actual, el grafo
//! de steps es acíclico por construcción. Los predicados son punteros a
//! función sobre el último record: no capturan estado ni tienen efectos.
use std::collections::HashSet;
use std::fmt::Debug;

use indexmap::IndexMap;

use crate::chain::StepChain;
use crate::errors::ChainError;
use crate::model::{Fact, StepRecord};
use crate::store::StepStore;

/// Identificador tipado de un step. `name` es la clave del record en la cadena.
pub trait StepId: Copy + Eq + Debug {
    fn name(&self) -> &'static str;
}

pub type Predicate<F> = fn(&StepRecord<F>) -> bool;

pub struct BranchRule<Id: StepId, F: Fact> {
    pub step: Id,
    pub applies: Predicate<F>,
}

impl<Id: StepId, F: Fact> BranchRule<Id, F> {
    pub fn new(step: Id, applies: Predicate<F>) -> Self {
        Self { step, applies }
    }
}

impl<Id: StepId, F: Fact> Clone for BranchRule<Id, F> {
    fn clone(&self) -> Self {
        Self { step: self.step, applies: self.applies }
    }
}

pub struct BranchResolver<Id: StepId, F: Fact> {
    rules: Vec<BranchRule<Id, F>>,
    terminal: Id,
}

impl<Id: StepId, F: Fact> BranchResolver<Id, F> {
    /// Valida que ningún step aparezca dos veces (ni repita el terminal).
    pub fn new(rules: Vec<BranchRule<Id, F>>, terminal: Id) -> Result<Self, ChainError> {
        let mut seen = HashSet::new();
        for name in rules.iter().map(|r| r.step.name()).chain(std::iter::once(terminal.name())) {
            if !seen.insert(name) {
                return Err(ChainError::InvalidResolver(format!("step '{name}' declared twice")));
            }
        }
        Ok(Self { rules, terminal })
    }

    pub fn terminal(&self) -> Id {
        self.terminal
    }

    /// Steps en orden de prioridad, terminal al final.
    pub fn steps(&self) -> Vec<Id> {
        self.rules.iter().map(|r| r.step).chain(std::iter::once(self.terminal)).collect()
    }

    pub fn position(&self, step_name: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.step.name() == step_name)
    }

    pub fn is_terminal(&self, step_name: &str) -> bool {
        self.terminal.name() == step_name
    }

    pub fn next<S: StepStore<F>>(&self, chain: &StepChain<F, S>) -> Result<Id, ChainError> {
        self.next_from(&chain.snapshot().steps)
    }

    /// Igual que `next` pero sobre los steps de un snapshot.
    pub fn next_from(&self, steps: &IndexMap<String, StepRecord<F>>) -> Result<Id, ChainError> {
        let Some((_, last)) = steps.last() else {
            return Err(ChainError::EmptyChain);
        };
        if steps.keys().any(|k| self.is_terminal(k)) {
            return Ok(self.terminal);
        }
        // la última posición visitada dentro de la lista ordenada
        let start = steps.keys().rev().find_map(|k| self.position(k)).map(|p| p + 1).unwrap_or(0);
        let chosen = self.rules[start..].iter().find(|r| (r.applies)(last)).map(|r| r.step).unwrap_or(self.terminal);
        if log::log_enabled!(log::Level::Debug) {
            let fp = last.fingerprint().unwrap_or_default();
            log::debug!("branch_resolver:next from={start} chosen={} fingerprint={fp}", chosen.name());
        }
        Ok(chosen)
    }
}
