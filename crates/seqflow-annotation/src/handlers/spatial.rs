//! Anotación espacial: Open-ST y Visium.
use seqflow_core::Table;
use seqflow_domain::{Category, ColumnRegistry, LibraryType};

use super::{check_known, reject, store_table, validate, Record};
use crate::error::WorkflowError;
use crate::tables::{self, LIBRARY_TABLE, OPENST_TABLE, VISIUM_TABLE};

fn libraries_where(record: &Record, pred: impl Fn(LibraryType) -> bool) -> Vec<String> {
    let Ok(libs) = record.table(LIBRARY_TABLE) else {
        return Vec::new();
    };
    libs.rows()
        .filter(|r| r.get("library_type_id").as_i64().and_then(LibraryType::from_id).is_some_and(&pred))
        .map(|r| r.get("library_name").to_string())
        .collect()
}

fn annotate(record: &mut Record,
            input: &Table,
            registry: ColumnRegistry,
            table_name: &str,
            pred: impl Fn(LibraryType) -> bool,
            what: &str)
            -> Result<(), WorkflowError> {
    let (slides, _) = validate(registry, input)?;
    reject(check_known(&slides, "library_name", &libraries_where(record, pred), what))?;
    log::debug!("spatial_annotation:done table={table_name} libraries={}", slides.len());
    store_table(record, table_name, slides, "library_name")
}

pub(crate) fn openst_annotation(record: &mut Record, input: &Table) -> Result<(), WorkflowError> {
    annotate(record, input, tables::openst_columns()?, OPENST_TABLE, |t| t == LibraryType::OpenSt, "Open-ST library")
}

pub(crate) fn visium_annotation(record: &mut Record, input: &Table) -> Result<(), WorkflowError> {
    annotate(record, input, tables::visium_columns()?, VISIUM_TABLE, |t| t.is_visium(), "Visium library")
}
