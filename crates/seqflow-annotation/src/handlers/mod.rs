//! Un handler por step: valida la entrada del usuario y escribe hechos y
//! tablas en el record del step. Corren dentro de `StepChain::update`, así
//! que un error deja el record como estaba.
pub mod assay;
pub mod barcodes;
pub mod features;
pub mod mux;
pub mod pooled;
pub mod samples;
pub mod spatial;

use seqflow_core::{CellValue, StepRecord, Table, TableError};
use seqflow_domain::validation::merge_on_resume;
use seqflow_domain::{CellError, CellErrorKind, ColumnRegistry, DomainError, KitCatalog, TableValidator, ValidationReport};

use crate::error::WorkflowError;
use crate::facts::AnnotationFact;
use crate::tables;
use crate::workflow::StepInput;

pub(crate) type Record = StepRecord<AnnotationFact>;

pub(crate) fn apply<C: KitCatalog + ?Sized>(record: &mut Record, input: StepInput, catalog: &C) -> Result<(), WorkflowError> {
    match input {
        StepInput::ProjectSelect { project } => assay::project_select(record, project),
        StepInput::AssaySelect(selection) => assay::assay_select(record, selection),
        StepInput::SampleDefinition { samples } => samples::sample_definition(record, &samples, false),
        StepInput::MultiplexedSampleDefinition { samples } => samples::sample_definition(record, &samples, true),
        StepInput::OcmAnnotation { mux } => mux::mux_annotation(record, &mux, tables::ocm_columns()?, "barcode_id"),
        StepInput::OligoMuxAnnotation { mux } => mux::mux_annotation(record, &mux, tables::oligo_mux_columns()?, "barcode"),
        StepInput::FlexAnnotation { mux } => mux::mux_annotation(record, &mux, tables::flex_columns()?, "barcode_id"),
        StepInput::PooledLibraryAnnotation { libraries } => pooled::pooled_library_annotation(record, &libraries),
        StepInput::BarcodeMatch(choices) => barcodes::barcode_match(record, choices, catalog),
        StepInput::IndexKitMapping { kits } => barcodes::index_kit_mapping(record, &kits, catalog),
        StepInput::FeatureAnnotation { features } => features::feature_annotation(record, &features, catalog),
        StepInput::FeatureKitMapping { kits } => features::feature_kit_mapping(record, &kits, catalog),
        StepInput::OpenStAnnotation { slides } => spatial::openst_annotation(record, &slides),
        StepInput::VisiumAnnotation { slides } => spatial::visium_annotation(record, &slides),
    }
}

/// Tabla validada y registro de trabajo, o los errores como `Validation`.
pub(crate) fn validate(registry: ColumnRegistry, input: &Table) -> Result<(Table, ColumnRegistry), WorkflowError> {
    let outcome = TableValidator::new(registry).validate(input);
    if !outcome.is_valid() {
        return Err(DomainError::Validation(outcome.report).into());
    }
    Ok((outcome.table, outcome.columns))
}

pub(crate) fn reject(report: ValidationReport) -> Result<(), WorkflowError> {
    if report.is_empty() {
        Ok(())
    } else {
        Err(DomainError::Validation(report).into())
    }
}

pub(crate) fn general(message: impl Into<String>) -> WorkflowError {
    let mut report = ValidationReport::default();
    report.push_general(message);
    DomainError::Validation(report).into()
}

/// Guarda `table` bajo `name`. Si el record ya la tenía (step revisitado)
/// se combina con la anterior por `key`.
pub(crate) fn store_table(record: &mut Record, name: &str, table: Table, key: &str) -> Result<(), WorkflowError> {
    let table = match record.table(name) {
        Ok(previous) => merge_on_resume(previous, &table, key)?,
        Err(_) => table,
    };
    record.add_table(name, table);
    Ok(())
}

/// Copia de `source` con sólo `columns`, en ese orden.
pub(crate) fn select_columns(source: &Table, columns: &[&str]) -> Result<Table, TableError> {
    let mut out = Table::new();
    for &c in columns {
        let ty = source.column_type(c).ok_or_else(|| TableError::UnknownColumn(c.to_string()))?;
        out.add_column(c, ty)?;
    }
    for row in source.rows() {
        out.push_row(columns.iter().map(|c| row.get(c).clone()).collect())?;
    }
    Ok(out)
}

/// Valores de texto distintos de `column`; vacío si la tabla no existe.
pub(crate) fn text_values(record: &Record, table: &str, column: &str) -> Vec<String> {
    record.table(table)
          .ok()
          .and_then(|t| t.unique_values(column).ok())
          .map(|values| values.iter().map(CellValue::to_string).collect())
          .unwrap_or_default()
}

pub(crate) fn cell_error(table: &Table, row: usize, column: &str, kind: CellErrorKind, message: String) -> CellError {
    CellError { row: row + 1,
                column_label: column.to_string(),
                column_index: table.column_index(column).unwrap_or(0),
                kind,
                message }
}

/// Marca las celdas de `column` cuyo valor no está en `known`.
pub(crate) fn check_known(table: &Table, column: &str, known: &[String], what: &str) -> ValidationReport {
    let mut report = ValidationReport::default();
    for row in table.rows() {
        let value = row.get(column);
        if value.is_null() || known.iter().any(|k| *k == value.to_string()) {
            continue;
        }
        report.push_cell(cell_error(table, row.index(), column, CellErrorKind::Invalid, format!("Unknown {what} '{value}'.")));
    }
    report
}
