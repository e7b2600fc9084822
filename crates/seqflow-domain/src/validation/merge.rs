//! Merge-on-resume: combinar la entrada nueva de un step revisitado con la
//! tabla heredada.
//!
//! - El orden de las filas es el de la entrada nueva.
//! - Una fila cuya clave existe en la heredada parte de esa fila y se
//!   sobrescriben las columnas que trae la entrada (override superficial).
//! - Filas sin clave o con clave desconocida son filas nuevas.
//! - Filas heredadas que no aparecen en la entrada se descartan.
use std::collections::HashMap;

use seqflow_core::{CellValue, Table, TableError};

pub fn merge_on_resume(inherited: &Table, incoming: &Table, key: &str) -> Result<Table, TableError> {
    if !incoming.has_column(key) {
        return Err(TableError::UnknownColumn(key.to_string()));
    }

    let mut merged = Table::new();
    for col in inherited.columns() {
        merged.add_column(&col.name, col.cell_type)?;
    }
    for col in incoming.columns() {
        match merged.column_type(&col.name) {
            None => merged.add_column(&col.name, col.cell_type)?,
            Some(ty) if ty != col.cell_type => {
                return Err(TableError::TypeMismatch { column: col.name.clone(),
                                                      expected: ty,
                                                      found: col.cell_type })
            }
            Some(_) => {}
        }
    }

    let mut by_key: HashMap<String, usize> = HashMap::new();
    if inherited.has_column(key) {
        for row in inherited.rows() {
            if let Some(k) = row.get(key).identity_key() {
                by_key.entry(k).or_insert(row.index());
            }
        }
    }

    let names: Vec<String> = merged.column_names().into_iter().map(str::to_string).collect();
    for row in incoming.rows() {
        let base = row.get(key).identity_key().and_then(|k| by_key.get(&k)).and_then(|&i| inherited.row(i));
        let cells: Vec<CellValue> = names.iter()
                                         .map(|name| {
                                             if incoming.has_column(name) {
                                                 row.get(name).clone()
                                             } else {
                                                 base.map(|b| b.get(name).clone()).unwrap_or(CellValue::Null)
                                             }
                                         })
                                         .collect();
        merged.push_row(cells)?;
    }
    Ok(merged)
}
