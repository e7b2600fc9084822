//! Sesión de workflow persistida: cabecera + steps ordenados.
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::facts::Fact;
use super::ordered;
use super::record::StepRecord;
use crate::constants::ENGINE_VERSION;

/// Token opaco que identifica una sesión.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SessionId {
    fn from(u: Uuid) -> Self {
        SessionId(u)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(SessionId)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHeader {
    pub workflow_kind: String,
    pub created_at: DateTime<Utc>,
    pub engine_version: String,
    pub fact_schema_version: u32,
}

impl SessionHeader {
    pub fn new(workflow_kind: &str, fact_schema_version: u32) -> Self {
        Self { workflow_kind: workflow_kind.to_string(),
               created_at: Utc::now(),
               engine_version: ENGINE_VERSION.to_string(),
               fact_schema_version }
    }
}

/// Snapshot completo de una sesión; siempre se escribe entero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "F: Fact")]
pub struct SessionSnapshot<F: Fact> {
    pub header: SessionHeader,
    #[serde(with = "ordered")]
    pub steps: IndexMap<String, StepRecord<F>>,
}

impl<F: Fact> SessionSnapshot<F> {
    pub fn empty(workflow_kind: &str) -> Self {
        Self { header: SessionHeader::new(workflow_kind, F::SCHEMA_VERSION),
               steps: IndexMap::new() }
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.keys().map(String::as_str).collect()
    }
}
