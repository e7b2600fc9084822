//! Definición de muestras y generación de librerías.
use seqflow_core::Table;

use super::{store_table, validate, Record};
use crate::error::WorkflowError;
use crate::facts::AnnotationFacts;
use crate::library;
use crate::tables::{self, LIBRARY_TABLE, SAMPLE_TABLE};

pub(crate) fn sample_definition(record: &mut Record, input: &Table, multiplexed: bool) -> Result<(), WorkflowError> {
    let assay = record.metadata.assay().ok_or(WorkflowError::MissingFact("assay"))?;
    let (samples, _) = validate(tables::sample_columns(multiplexed)?, input)?;
    store_table(record, SAMPLE_TABLE, samples, "sample_name")?;

    let libraries = library::generate(record.table(SAMPLE_TABLE)?, assay, record.metadata.services(), record.metadata.mux())?;
    log::debug!("sample_definition:done samples={} libraries={} multiplexed={multiplexed}",
                record.table(SAMPLE_TABLE)?.len(),
                libraries.len());
    record.add_table(LIBRARY_TABLE, libraries);
    Ok(())
}
