//! `Table`: dataset rectangular de columnas nombradas y tipadas.
//!
//! Invariantes:
//! - Todas las filas tienen exactamente una celda por columna.
//! - Cada celda encaja en el tipo de su columna (ver `CellValue::coerce_to`).
//! - Las columnas pueden agregarse (crecimiento de esquema) pero nunca se
//!   renombran implícitamente; `rename_column` es la única vía.
//!
//! Un snapshot con filas de longitud distinta al número de columnas se
//! rechaza al deserializar.
use serde::{Deserialize, Serialize};

use super::cell::{CellType, CellValue};
use crate::errors::TableError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    pub name: String,
    pub cell_type: CellType,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    columns: Vec<TableColumn>,
    rows: Vec<Vec<CellValue>>,
}

#[derive(Deserialize)]
struct RawTable {
    columns: Vec<TableColumn>,
    rows: Vec<Vec<CellValue>>,
}

impl TryFrom<RawTable> for Table {
    type Error = TableError;

    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        let mut table = Table::new();
        for c in raw.columns {
            table.add_column(&c.name, c.cell_type)?;
        }
        for row in raw.rows {
            table.push_row(row)?;
        }
        Ok(table)
    }
}

/// Vista de sólo lectura sobre una fila.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> RowRef<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Valor de la columna `name`; `Null` si la columna no existe.
    pub fn get(&self, name: &str) -> &'a CellValue {
        const NULL: &CellValue = &CellValue::Null;
        self.table
            .column_index(name)
            .and_then(|c| self.table.rows[self.index].get(c))
            .unwrap_or(NULL)
    }

    pub fn cells(&self) -> &'a [CellValue] {
        &self.table.rows[self.index]
    }

    pub fn is_blank(&self) -> bool {
        self.cells().iter().all(CellValue::is_null)
    }
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tabla vacía con las columnas dadas.
    pub fn with_columns<'n>(columns: impl IntoIterator<Item = (&'n str, CellType)>) -> Result<Self, TableError> {
        let mut t = Table::new();
        for (name, ty) in columns {
            t.add_column(name, ty)?;
        }
        Ok(t)
    }

    /// Construye una tabla de texto a partir de filas ya parseadas (p.ej. una
    /// hoja de cálculo). Strings vacíos se guardan tal cual; la limpieza es
    /// responsabilidad del validador.
    pub fn from_text_rows<S: AsRef<str>>(headers: &[&str], rows: &[Vec<S>]) -> Result<Self, TableError> {
        let mut t = Table::with_columns(headers.iter().map(|h| (*h, CellType::Text)))?;
        for row in rows {
            t.push_row(row.iter().map(|s| CellValue::text(s.as_ref())).collect())?;
        }
        Ok(t)
    }

    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_type(&self, name: &str) -> Option<CellType> {
        self.column_index(name).map(|i| self.columns[i].cell_type)
    }

    fn require_column(&self, name: &str) -> Result<usize, TableError> {
        self.column_index(name).ok_or_else(|| TableError::UnknownColumn(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Agrega una columna llena de `Null`.
    pub fn add_column(&mut self, name: &str, ty: CellType) -> Result<(), TableError> {
        self.add_column_filled(name, ty, CellValue::Null)
    }

    pub fn add_column_filled(&mut self, name: &str, ty: CellType, fill: CellValue) -> Result<(), TableError> {
        if self.has_column(name) {
            return Err(TableError::DuplicateColumn(name.to_string()));
        }
        let fill = fill.coerce_to(ty).map_err(|v| TableError::TypeMismatch { column: name.to_string(),
                                                                           expected: ty,
                                                                           found: v.cell_type().unwrap_or(ty) })?;
        self.columns.push(TableColumn { name: name.to_string(),
                                        cell_type: ty });
        for row in self.rows.iter_mut() {
            row.push(fill.clone());
        }
        Ok(())
    }

    /// Garantiza que la columna exista (la crea vacía si falta).
    pub fn ensure_column(&mut self, name: &str, ty: CellType) -> Result<(), TableError> {
        if self.has_column(name) {
            return Ok(());
        }
        self.add_column(name, ty)
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<(), TableError> {
        let idx = self.require_column(from)?;
        if from != to && self.has_column(to) {
            return Err(TableError::DuplicateColumn(to.to_string()));
        }
        self.columns[idx].name = to.to_string();
        Ok(())
    }

    fn coerce_row(&self, row: Vec<CellValue>) -> Result<Vec<CellValue>, TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowLength { expected: self.columns.len(),
                                               got: row.len() });
        }
        row.into_iter()
           .zip(self.columns.iter())
           .map(|(v, c)| {
               v.coerce_to(c.cell_type).map_err(|v| TableError::TypeMismatch { column: c.name.clone(),
                                                                                 expected: c.cell_type,
                                                                                 found: v.cell_type().unwrap_or(c.cell_type) })
           })
           .collect()
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<(), TableError> {
        let row = self.coerce_row(row)?;
        self.rows.push(row);
        Ok(())
    }

    /// Agrega una fila por nombre de columna; las columnas omitidas quedan en `Null`.
    pub fn push_named<'n>(&mut self, cells: impl IntoIterator<Item = (&'n str, CellValue)>) -> Result<(), TableError> {
        let mut row = vec![CellValue::Null; self.columns.len()];
        for (name, value) in cells {
            let idx = self.require_column(name)?;
            row[idx] = value;
        }
        self.push_row(row)
    }

    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        (index < self.rows.len()).then_some(RowRef { table: self, index })
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> + '_ {
        (0..self.rows.len()).map(move |index| RowRef { table: self, index })
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let c = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(c))
    }

    pub fn set(&mut self, row: usize, column: &str, value: CellValue) -> Result<(), TableError> {
        let c = self.require_column(column)?;
        let ty = self.columns[c].cell_type;
        let value = value.coerce_to(ty).map_err(|v| TableError::TypeMismatch { column: column.to_string(),
                                                                             expected: ty,
                                                                             found: v.cell_type().unwrap_or(ty) })?;
        let r = self.rows.get_mut(row).ok_or(TableError::RowOutOfBounds(row))?;
        r[c] = value;
        Ok(())
    }

    /// Asigna `value` a todas las filas de la columna.
    pub fn fill_column(&mut self, column: &str, value: CellValue) -> Result<(), TableError> {
        for i in 0..self.rows.len() {
            self.set(i, column, value.clone())?;
        }
        Ok(())
    }

    /// Reemplaza cada celda de la columna por `f(celda)`.
    pub fn map_column<F>(&mut self, column: &str, mut f: F) -> Result<(), TableError>
        where F: FnMut(&CellValue) -> CellValue
    {
        let c = self.require_column(column)?;
        for i in 0..self.rows.len() {
            let next = f(&self.rows[i][c]);
            self.set(i, column, next)?;
        }
        Ok(())
    }

    pub fn column_values(&self, column: &str) -> Result<Vec<&CellValue>, TableError> {
        let c = self.require_column(column)?;
        Ok(self.rows.iter().map(|r| &r[c]).collect())
    }

    /// Valores distintos no nulos de la columna, en orden de primera aparición.
    pub fn unique_values(&self, column: &str) -> Result<Vec<CellValue>, TableError> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for v in self.column_values(column)? {
            if let Some(k) = v.identity_key() {
                if seen.insert(k) {
                    out.push(v.clone());
                }
            }
        }
        Ok(out)
    }

    /// `true` si alguna celda de la columna cumple `pred`. Columna ausente: `false`.
    pub fn any_in_column(&self, column: &str, pred: impl Fn(&CellValue) -> bool) -> bool {
        match self.column_index(column) {
            Some(c) => self.rows.iter().any(|r| pred(&r[c])),
            None => false,
        }
    }

    /// `true` si todas las celdas de la columna cumplen `pred`. Columna ausente: `false`.
    pub fn all_in_column(&self, column: &str, pred: impl Fn(&CellValue) -> bool) -> bool {
        match self.column_index(column) {
            Some(c) => self.rows.iter().all(|r| pred(&r[c])),
            None => false,
        }
    }

    pub fn retain_rows(&mut self, mut keep: impl FnMut(RowRef<'_>) -> bool) {
        let keep_mask: Vec<bool> = self.rows().map(|r| keep(r)).collect();
        let mut i = 0;
        self.rows.retain(|_| {
            let k = keep_mask[i];
            i += 1;
            k
        });
    }

    /// Copia con las filas que cumplen `keep`.
    pub fn filter(&self, keep: impl FnMut(RowRef<'_>) -> bool) -> Table {
        let mut t = self.clone();
        t.retain_rows(keep);
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn libraries() -> Table {
        let mut t = Table::with_columns([("library_name", CellType::Text), ("seq_depth", CellType::Float)]).unwrap();
        t.push_row(vec!["lib_a".into(), CellValue::Int(10)]).unwrap();
        t.push_row(vec!["lib_b".into(), CellValue::Null]).unwrap();
        t
    }

    #[test]
    fn int_cells_are_promoted_in_float_columns() {
        let t = libraries();
        assert_eq!(t.get(0, "seq_depth"), Some(&CellValue::Float(10.0)));
    }

    #[test]
    fn schema_growth_fills_existing_rows() {
        let mut t = libraries();
        t.add_column_filled("pool", CellType::Text, "p1".into()).unwrap();
        assert_eq!(t.get(1, "pool"), Some(&CellValue::text("p1")));
        assert_eq!(t.add_column("pool", CellType::Text), Err(TableError::DuplicateColumn("pool".into())));
    }

    #[test]
    fn rename_refuses_to_overwrite() {
        let mut t = libraries();
        assert!(t.rename_column("library_name", "seq_depth").is_err());
        t.rename_column("library_name", "name").unwrap();
        assert!(t.has_column("name"));
        assert!(!t.has_column("library_name"));
    }

    #[test]
    fn rows_must_match_width_and_types() {
        let mut t = libraries();
        assert_eq!(t.push_row(vec!["x".into()]), Err(TableError::RowLength { expected: 2, got: 1 }));
        assert!(matches!(t.push_row(vec!["x".into(), "deep".into()]), Err(TableError::TypeMismatch { .. })));
    }

    #[test]
    fn ragged_snapshot_is_rejected() {
        let json = r#"{"columns":[{"name":"a","cell_type":"text"}],"rows":[["x","y"]]}"#;
        assert!(serde_json::from_str::<Table>(json).is_err());
    }

    #[test]
    fn filter_and_row_views() {
        let t = libraries();
        let with_depth = t.filter(|r| !r.get("seq_depth").is_null());
        assert_eq!(with_depth.len(), 1);
        assert_eq!(with_depth.row(0).unwrap().get("library_name"), &CellValue::text("lib_a"));
        assert!(t.row(5).is_none());
        assert!(t.row(1).unwrap().get("missing").is_null());
    }
}
