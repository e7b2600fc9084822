//! `StepRecord`: estado persistido de un step.
//!
//! - `arguments`: inputs del constructor del step; inmutables tras la creación.
//! - `metadata`: hechos acumulados (mutables).
//! - `tables`: datasets nombrados, en orden de inserción.
//!
//! `inherit` produce un record nuevo con una copia profunda de metadata y
//! tablas del anterior; nunca comparte referencias.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::cell::{CellType, CellValue};
use super::facts::{Fact, FactSheet};
use super::ordered;
use super::table::Table;
use crate::constants::{COMMENT_TABLE, ENGINE_VERSION};
use crate::errors::{ChainError, StoreError};
use crate::hashing::hash_value;

/// Argumentos de construcción de un step.
pub type StepArgs = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "F: Fact")]
pub struct StepRecord<F: Fact> {
    arguments: StepArgs,
    pub metadata: FactSheet<F>,
    #[serde(with = "ordered")]
    tables: IndexMap<String, Table>,
}

impl<F: Fact> StepRecord<F> {
    /// Primer record de una cadena: sin hechos ni tablas.
    pub fn seed(arguments: StepArgs) -> Self {
        Self { arguments,
               metadata: FactSheet::new(),
               tables: IndexMap::new() }
    }

    /// Record para un step nuevo que hereda una copia de `previous`.
    pub fn inherit(previous: &StepRecord<F>, arguments: StepArgs) -> Self {
        Self { arguments,
               metadata: previous.metadata.clone(),
               tables: previous.tables.clone() }
    }

    pub fn arguments(&self) -> &StepArgs {
        &self.arguments
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    pub fn tables(&self) -> &IndexMap<String, Table> {
        &self.tables
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn table(&self, name: &str) -> Result<&Table, ChainError> {
        self.tables.get(name).ok_or_else(|| ChainError::TableNotFound(name.to_string()))
    }

    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table, ChainError> {
        self.tables.get_mut(name).ok_or_else(|| ChainError::TableNotFound(name.to_string()))
    }

    /// Guarda (o reemplaza) una tabla.
    pub fn add_table(&mut self, name: &str, table: Table) {
        self.tables.insert(name.to_string(), table);
    }

    /// Reemplaza una tabla existente; falla si nunca fue agregada.
    pub fn update_table(&mut self, name: &str, table: Table) -> Result<(), ChainError> {
        let slot = self.table_mut(name)?;
        *slot = table;
        Ok(())
    }

    pub fn remove_table(&mut self, name: &str) -> Option<Table> {
        self.tables.shift_remove(name)
    }

    /// Agrega un comentario `(context, text)` a la tabla de comentarios,
    /// creándola si no existe.
    pub fn add_comment(&mut self, context: &str, text: &str) -> Result<(), ChainError> {
        if !self.tables.contains_key(COMMENT_TABLE) {
            let t = Table::with_columns([("context", CellType::Text), ("text", CellType::Text)])?;
            self.tables.insert(COMMENT_TABLE.to_string(), t);
        }
        let table = self.table_mut(COMMENT_TABLE)?;
        table.push_row(vec![CellValue::text(context), CellValue::text(text)])?;
        Ok(())
    }

    /// Hash estable de `(metadata, tables)`: dos records con el mismo
    /// fingerprint producen la misma decisión de ramificación.
    pub fn fingerprint(&self) -> Result<String, ChainError> {
        let to_value = |v: Result<Value, serde_json::Error>| v.map_err(|e| ChainError::Store(StoreError::Serialization(e.to_string())));
        let state = json!({
            "engine_version": ENGINE_VERSION,
            "schema_version": F::SCHEMA_VERSION,
            "metadata": to_value(serde_json::to_value(&self.metadata))?,
            "tables": to_value(serde_json::to_value(&self.tables))?,
        });
        Ok(hash_value(&state))
    }
}
