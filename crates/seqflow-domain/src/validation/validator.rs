//! `TableValidator`: limpia, tipa y valida una tabla de entrada contra un
//! `ColumnRegistry`.
//!
//! Orden por celda: clean-up → required → longitud/rango (y tipo) →
//! unicidad → validación propia. Una celda se detiene en su primer error,
//! pero la pasada completa recorre todas las filas y columnas y reporta todos
//! los errores. La tabla de entrada nunca se modifica.
use std::collections::HashMap;

use seqflow_core::{CellValue, Table};

use super::columns::{ColumnKind, ColumnRegistry, ColumnSpec};
use super::report::{CellError, CellErrorKind, ValidationReport};
use crate::error::DomainError;

#[derive(Debug, Clone)]
pub struct TableValidator {
    registry: ColumnRegistry,
    allow_new_columns: bool,
    can_be_empty: bool,
}

/// Resultado de `validate`: la tabla tipada (celdas con error quedan `Null`),
/// el reporte y el registro de trabajo (incluye columnas inferidas).
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub table: Table,
    pub report: ValidationReport,
    pub columns: ColumnRegistry,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.report.is_empty()
    }

    pub fn into_result(self) -> Result<Table, DomainError> {
        if self.report.is_empty() {
            Ok(self.table)
        } else {
            Err(DomainError::Validation(self.report))
        }
    }
}

type CellOutcome = Result<CellValue, (CellErrorKind, String)>;

impl TableValidator {
    pub fn new(registry: ColumnRegistry) -> Self {
        Self { registry,
               allow_new_columns: false,
               can_be_empty: false }
    }

    /// Columnas desconocidas se agregan como texto en lugar de rechazarse.
    pub fn allow_new_columns(mut self, allow: bool) -> Self {
        self.allow_new_columns = allow;
        self
    }

    pub fn can_be_empty(mut self, allow: bool) -> Self {
        self.can_be_empty = allow;
        self
    }

    pub fn registry(&self) -> &ColumnRegistry {
        &self.registry
    }

    /// Atajo: tabla validada o `DomainError::Validation`.
    pub fn check(&self, input: &Table) -> Result<Table, DomainError> {
        self.validate(input).into_result()
    }

    pub fn validate(&self, input: &Table) -> ValidationOutcome {
        let mut report = ValidationReport::default();
        let mut columns = self.registry.clone();

        // título de entrada -> label de trabajo
        let mut source_of: HashMap<String, usize> = HashMap::new();
        for (idx, col) in input.columns().iter().enumerate() {
            let label = self.registry.resolve_title(&col.name);
            if source_of.contains_key(&label) {
                report.push_general(format!("Column '{}' appears more than once.", col.name));
                continue;
            }
            if columns.get(&label).is_none() {
                if !self.allow_new_columns {
                    report.push_general(format!("Unknown column '{}'.", col.name));
                    continue;
                }
                // `label` no está en el registro: no puede fallar
                if columns.add(ColumnSpec::inferred(&label)).is_err() {
                    continue;
                }
            }
            source_of.insert(label, idx);
        }

        let mut rows: Vec<Vec<CellValue>> = input.rows()
                                                 .map(|row| {
                                                     columns.iter()
                                                            .map(|spec| match source_of.get(&spec.label) {
                                                                Some(&i) => pre_clean(&row.cells()[i]),
                                                                None => CellValue::Null,
                                                            })
                                                            .collect()
                                                 })
                                                 .collect();
        rows.retain(|r| !r.iter().all(CellValue::is_null));

        if rows.is_empty() && !self.can_be_empty {
            report.push_general("Spreadsheet is empty.");
        }

        for (c, spec) in columns.iter().enumerate() {
            if let ColumnKind::Dropdown { choices, all_options_required: true } = &spec.kind {
                for opt in choices {
                    if !rows.iter().any(|r| r[c].as_str() == Some(opt.as_str())) {
                        report.push_general(format!("Column '{}' has missing option '{opt}'. You must use all options at least once.",
                                                    spec.display_name));
                    }
                }
            }
        }

        let mut table = match columns.empty_table() {
            Ok(t) => t,
            Err(e) => {
                report.push_general(e.to_string());
                return ValidationOutcome { table: Table::new(), report, columns };
            }
        };

        // columna a columna: la unicidad necesita todos los valores convertidos
        let mut converted: Vec<Vec<CellOutcome>> = Vec::with_capacity(columns.len());
        for (c, spec) in columns.iter().enumerate() {
            let mut cells: Vec<CellOutcome> = rows.iter().map(|r| convert_cell(spec, r[c].clone())).collect();
            if spec.unique {
                flag_duplicates(spec, &mut cells);
            }
            if let Some(f) = spec.validate {
                for cell in cells.iter_mut() {
                    if let Ok(v) = cell {
                        if v.is_null() {
                            continue;
                        }
                        if let Some(msg) = f(v) {
                            *cell = Err((CellErrorKind::Invalid, format!("Validation failed for '{}': {msg}", spec.display_name)));
                        }
                    }
                }
            }
            converted.push(cells);
        }

        for r in 0..rows.len() {
            let mut out_row = Vec::with_capacity(columns.len());
            for (c, spec) in columns.iter().enumerate() {
                match &converted[c][r] {
                    Ok(v) => out_row.push(v.clone()),
                    Err((kind, message)) => {
                        report.push_cell(CellError { row: r + 1,
                                                     column_label: spec.label.clone(),
                                                     column_index: c,
                                                     kind: *kind,
                                                     message: message.clone() });
                        out_row.push(CellValue::Null);
                    }
                }
            }
            if let Err(e) = table.push_row(out_row) {
                report.push_general(e.to_string());
            }
        }
        // reporte en orden de lectura (fila, columna)
        report.cells.sort_by_key(|e| (e.row, e.column_index));

        if !report.is_empty() {
            log::debug!("table_validator:done rows={} errors={}", table.len(), report.len());
        }
        ValidationOutcome { table, report, columns }
    }
}

/// Limpieza base de cualquier celda de texto: sin NUL, sin espacios en los
/// extremos, vacío → `Null`.
pub fn pre_clean(value: &CellValue) -> CellValue {
    match value {
        CellValue::Text(s) => {
            let s: String = s.chars().filter(|c| *c != '\0').collect();
            let s = s.trim();
            if s.is_empty() {
                CellValue::Null
            } else {
                CellValue::text(s)
            }
        }
        other => other.clone(),
    }
}

fn convert_cell(spec: &ColumnSpec, raw: CellValue) -> CellOutcome {
    let value = match (spec.clean_up, raw.is_null()) {
        (Some(f), false) => f(raw),
        _ => raw,
    };
    if value.is_null() {
        if spec.required {
            return Err((CellErrorKind::Missing, format!("Missing value for '{}'", spec.display_name)));
        }
        return Ok(CellValue::Null);
    }
    let name = &spec.display_name;
    match &spec.kind {
        ColumnKind::Text { min_length, max_length } => {
            let text = value.to_string();
            let len = text.chars().count();
            if len < *min_length {
                return Err((CellErrorKind::Invalid, format!("Value for '{name}' is too short. Minimum length is {min_length}.")));
            }
            if len > *max_length {
                return Err((CellErrorKind::Invalid, format!("Value for '{name}' is too long. Maximum length is {max_length}.")));
            }
            Ok(CellValue::Text(text))
        }
        ColumnKind::Integer { min, max } => {
            let Some(i) = to_i64(&value) else {
                return Err((CellErrorKind::Invalid, format!("Invalid value '{value}' for '{name}'. Must be an integer.")));
            };
            check_range(name, i as f64, min.map(|m| m as f64), max.map(|m| m as f64))?;
            Ok(CellValue::Int(i))
        }
        ColumnKind::Float { min, max } => {
            let Some(x) = to_f64(&value) else {
                return Err((CellErrorKind::Invalid, format!("Invalid value '{value}' for '{name}'. Must be a number.")));
            };
            check_range(name, x, *min, *max)?;
            Ok(CellValue::Float(x))
        }
        ColumnKind::Dropdown { choices, .. } => {
            let text = value.to_string();
            if choices.iter().any(|c| *c == text) {
                Ok(CellValue::Text(text))
            } else {
                Err((CellErrorKind::Invalid, format!("Invalid value '{text}' for '{name}'. Must be one of: {}", choices.join(", "))))
            }
        }
        ColumnKind::Category { options, .. } => {
            let found = match &value {
                CellValue::Int(id) => options.iter().find(|(i, _)| i == id),
                other => {
                    let text = other.to_string();
                    options.iter().find(|(_, n)| *n == text)
                }
            };
            match found {
                Some((id, _)) => Ok(CellValue::Int(*id)),
                None => Err((CellErrorKind::Invalid, format!("Invalid category '{value}' for '{name}'."))),
            }
        }
    }
}

fn to_i64(v: &CellValue) -> Option<i64> {
    match v {
        CellValue::Int(i) => Some(*i),
        CellValue::Float(x) if x.fract() == 0.0 && x.is_finite() => Some(*x as i64),
        CellValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_f64(v: &CellValue) -> Option<f64> {
    match v {
        CellValue::Int(i) => Some(*i as f64),
        CellValue::Float(x) => Some(*x),
        CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
        _ => None,
    }
}

fn check_range(name: &str, x: f64, min: Option<f64>, max: Option<f64>) -> Result<(), (CellErrorKind, String)> {
    if let Some(m) = min {
        if x < m {
            return Err((CellErrorKind::Invalid, format!("Value for '{name}' must be at least {m}.")));
        }
    }
    if let Some(m) = max {
        if x > m {
            return Err((CellErrorKind::Invalid, format!("Value for '{name}' must be at most {m}.")));
        }
    }
    Ok(())
}

/// Marca todas las apariciones de un valor repetido, no sólo la segunda.
fn flag_duplicates(spec: &ColumnSpec, cells: &mut [CellOutcome]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for key in cells.iter().filter_map(|c| c.as_ref().ok().and_then(CellValue::identity_key)) {
        *counts.entry(key).or_default() += 1;
    }
    for cell in cells.iter_mut() {
        let dup = match cell {
            Ok(v) => v.identity_key().map(|k| counts.get(&k).copied().unwrap_or(0) > 1).unwrap_or(false),
            Err(_) => false,
        };
        if dup {
            let shown = cell.as_ref().map(|v| v.to_string()).unwrap_or_default();
            *cell = Err((CellErrorKind::Duplicate,
                         format!("Value '{shown}' for '{}' is not unique. It appears multiple times in the column.", spec.display_name)));
        }
    }
}
