//! Especificación declarativa de columnas tabulares.
//!
//! Un `ColumnRegistry` es la lista ordenada y tipada de columnas que un step
//! espera. Agregar columnas es explícito (`add`) y falla si el label ya
//! existe; no hay creación implícita de columnas.
use seqflow_core::{CellType, CellValue, Table, TableError};

use crate::categories::Category;

/// Transformación aplicada a una celda no nula antes de validarla.
pub type CleanUpFn = fn(CellValue) -> CellValue;

/// Validación adicional; `Some(mensaje)` marca la celda como inválida.
pub type ValidateFn = fn(&CellValue) -> Option<String>;

pub const DEFAULT_MAX_LENGTH: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    Text { min_length: usize, max_length: usize },
    Integer { min: Option<i64>, max: Option<i64> },
    Float { min: Option<f64>, max: Option<f64> },
    Dropdown { choices: Vec<String>, all_options_required: bool },
    /// Dropdown sobre una categoría: el usuario ve nombres, la tabla guarda ids.
    Category { category: &'static str, options: Vec<(i64, String)> },
}

impl ColumnKind {
    /// Tipo de la columna en la tabla validada.
    pub fn cell_type(&self) -> CellType {
        match self {
            ColumnKind::Text { .. } | ColumnKind::Dropdown { .. } => CellType::Text,
            ColumnKind::Integer { .. } | ColumnKind::Category { .. } => CellType::Integer,
            ColumnKind::Float { .. } => CellType::Float,
        }
    }

    pub fn is_dropdown(&self) -> bool {
        matches!(self, ColumnKind::Dropdown { .. } | ColumnKind::Category { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub label: String,
    pub display_name: String,
    /// Ancho sugerido para la UI; no afecta la validación.
    pub width: f32,
    pub kind: ColumnKind,
    pub required: bool,
    pub unique: bool,
    pub read_only: bool,
    pub clean_up: Option<CleanUpFn>,
    pub validate: Option<ValidateFn>,
}

impl ColumnSpec {
    fn base(label: &str, display_name: &str, width: f32, kind: ColumnKind) -> Self {
        Self { label: label.to_string(),
               display_name: display_name.to_string(),
               width,
               kind,
               required: false,
               unique: false,
               read_only: false,
               clean_up: None,
               validate: None }
    }

    pub fn text(label: &str, display_name: &str, width: f32) -> Self {
        Self::base(label, display_name, width, ColumnKind::Text { min_length: 0, max_length: DEFAULT_MAX_LENGTH })
    }

    pub fn integer(label: &str, display_name: &str, width: f32) -> Self {
        Self::base(label, display_name, width, ColumnKind::Integer { min: None, max: None })
    }

    pub fn float(label: &str, display_name: &str, width: f32) -> Self {
        Self::base(label, display_name, width, ColumnKind::Float { min: None, max: None })
    }

    pub fn dropdown<S: Into<String>>(label: &str, display_name: &str, width: f32, choices: impl IntoIterator<Item = S>) -> Self {
        let choices = choices.into_iter().map(Into::into).collect();
        Self::base(label, display_name, width, ColumnKind::Dropdown { choices, all_options_required: false })
    }

    pub fn category<C: Category>(label: &str, display_name: &str, width: f32, category: &'static str) -> Self {
        Self::base(label, display_name, width, ColumnKind::Category { category, options: C::options() })
    }

    /// Texto derivado de un título desconocido (crecimiento de esquema).
    pub fn inferred(label: &str) -> Self {
        Self::text(label, label, 100.0)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn length(mut self, min: usize, max: usize) -> Self {
        if let ColumnKind::Text { min_length, max_length } = &mut self.kind {
            *min_length = min;
            *max_length = max;
        }
        self
    }

    pub fn int_range(mut self, lo: Option<i64>, hi: Option<i64>) -> Self {
        if let ColumnKind::Integer { min, max } = &mut self.kind {
            *min = lo;
            *max = hi;
        }
        self
    }

    pub fn float_range(mut self, lo: Option<f64>, hi: Option<f64>) -> Self {
        if let ColumnKind::Float { min, max } = &mut self.kind {
            *min = lo;
            *max = hi;
        }
        self
    }

    /// Cada opción del dropdown debe aparecer al menos una vez.
    pub fn all_options_required(mut self) -> Self {
        if let ColumnKind::Dropdown { all_options_required, .. } = &mut self.kind {
            *all_options_required = true;
        }
        self
    }

    pub fn clean_up_with(mut self, f: CleanUpFn) -> Self {
        self.clean_up = Some(f);
        self
    }

    pub fn validate_with(mut self, f: ValidateFn) -> Self {
        self.validate = Some(f);
        self
    }

    pub fn cell_type(&self) -> CellType {
        self.kind.cell_type()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    columns: Vec<ColumnSpec>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_specs(specs: impl IntoIterator<Item = ColumnSpec>) -> Result<Self, TableError> {
        let mut r = Self::new();
        for s in specs {
            r.add(s)?;
        }
        Ok(r)
    }

    pub fn add(&mut self, spec: ColumnSpec) -> Result<(), TableError> {
        if self.get(&spec.label).is_some() {
            return Err(TableError::DuplicateColumn(spec.label));
        }
        self.columns.push(spec);
        Ok(())
    }

    pub fn get(&self, label: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.label == label)
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.label == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Label de la columna a la que corresponde un título de entrada: por
    /// label o nombre de presentación; si no coincide, el título en snake_case.
    pub fn resolve_title(&self, title: &str) -> String {
        let trimmed = title.trim();
        self.columns
            .iter()
            .find(|c| c.label == trimmed || c.display_name == trimmed)
            .map(|c| c.label.clone())
            .unwrap_or_else(|| snake_case(trimmed))
    }

    /// Tabla vacía con las columnas declaradas y sus tipos.
    pub fn empty_table(&self) -> Result<Table, TableError> {
        Table::with_columns(self.columns.iter().map(|c| (c.label.as_str(), c.cell_type())))
    }
}

pub fn snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_sep = false;
    for ch in s.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::GenomeRef;

    fn registry() -> ColumnRegistry {
        ColumnRegistry::from_specs([ColumnSpec::text("sample_name", "Sample Name", 300.0).required(),
                                    ColumnSpec::category::<GenomeRef>("genome_id", "Genome", 300.0, "genome")]).unwrap()
    }

    #[test]
    fn titles_resolve_by_label_or_display_name() {
        let r = registry();
        assert_eq!(r.resolve_title("Sample Name"), "sample_name");
        assert_eq!(r.resolve_title("sample_name"), "sample_name");
        assert_eq!(r.resolve_title(" Seq Depth (M) "), "seq_depth_m");
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let mut r = registry();
        assert_eq!(r.add(ColumnSpec::text("sample_name", "Other", 10.0)), Err(TableError::DuplicateColumn("sample_name".into())));
    }

    #[test]
    fn category_columns_store_ids() {
        let r = registry();
        let t = r.empty_table().unwrap();
        assert_eq!(t.column_type("genome_id"), Some(CellType::Integer));
    }
}
