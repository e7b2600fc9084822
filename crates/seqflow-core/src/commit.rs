//! Frontera con la persistencia de entidades de dominio.
//!
//! Sólo el step terminal llama a `DomainCommitter::commit` con el record
//! final; el core no sabe qué entidades se crean.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{Fact, StepRecord};

/// Ids creados por el commit, agrupados por tipo de entidad
/// (`"sample"`, `"library"`, `"pool"`...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedIds {
    #[serde(with = "crate::model::ordered")]
    entities: IndexMap<String, Vec<i64>>,
}

impl CommittedIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entity: &str, id: i64) {
        self.entities.entry(entity.to_string()).or_default().push(id);
    }

    pub fn get(&self, entity: &str) -> &[i64] {
        self.entities.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total(&self) -> usize {
        self.entities.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[i64])> {
        self.entities.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

pub trait DomainCommitter<F: Fact> {
    type Error: std::error::Error;

    fn commit(&mut self, record: &StepRecord<F>) -> Result<CommittedIds, Self::Error>;
}
