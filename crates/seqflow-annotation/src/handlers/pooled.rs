//! Librerías enviadas ya agrupadas en pools, con sus índices.
use seqflow_core::Table;

use super::{select_columns, store_table, validate, Record};
use crate::error::WorkflowError;
use crate::tables::{self, BARCODE_TABLE, LIBRARY_TABLE};

const LIBRARY_COLUMNS: [&str; 5] = ["library_name", "sample_name", "library_type_id", "genome_id", "pool"];
const BARCODE_COLUMNS: [&str; 9] = ["library_name",
                                    "index_well",
                                    "index_type_id",
                                    "kit_i7",
                                    "name_i7",
                                    "sequence_i7",
                                    "kit_i5",
                                    "name_i5",
                                    "sequence_i5"];

/// Separa la entrada en `library_table` y `barcode_table`.
pub(crate) fn pooled_library_annotation(record: &mut Record, input: &Table) -> Result<(), WorkflowError> {
    let (table, _) = validate(tables::pooled_library_columns()?, input)?;
    let libraries = select_columns(&table, &LIBRARY_COLUMNS)?;
    let barcodes = select_columns(&table, &BARCODE_COLUMNS)?;
    log::debug!("pooled_library_annotation:done libraries={} pools={}",
                libraries.len(),
                libraries.unique_values("pool")?.len());
    store_table(record, LIBRARY_TABLE, libraries, "library_name")?;
    store_table(record, BARCODE_TABLE, barcodes, "library_name")
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqflow_core::{CellValue, StepArgs};
    use seqflow_domain::{Category, LibraryType};

    fn input() -> Table {
        Table::from_text_rows(&["Sample Name", "Library Name", "Library Type", "Genome", "Pool", "i7 Sequence"],
                              &[vec!["s1", "lib1", "Whole Genome Sequencing", "Human (GRCh38)", "P1", "agatctcg"],
                                vec!["s2", "lib2", "Whole Genome Sequencing", "Human (GRCh38)", "P1", "ACGTACGT"]]).unwrap()
    }

    #[test]
    fn input_is_split_into_libraries_and_barcodes() {
        let mut r = Record::seed(StepArgs::new());
        pooled_library_annotation(&mut r, &input()).unwrap();
        let libs = r.table(LIBRARY_TABLE).unwrap();
        assert_eq!(libs.column_names(), LIBRARY_COLUMNS.to_vec());
        assert_eq!(libs.get(0, "library_type_id"), Some(&CellValue::Int(LibraryType::Wgs.id())));
        let barcodes = r.table(BARCODE_TABLE).unwrap();
        assert_eq!(barcodes.get(0, "sequence_i7"), Some(&CellValue::text("AGATCTCG")));
        assert_eq!(barcodes.get(1, "kit_i7"), Some(&CellValue::Null));
    }

    #[test]
    fn resubmission_keeps_rows_by_library_name() {
        let mut r = Record::seed(StepArgs::new());
        pooled_library_annotation(&mut r, &input()).unwrap();
        let again = Table::from_text_rows(&["Sample Name", "Library Name", "Library Type", "Genome", "Pool"],
                                          &[vec!["s2", "lib2", "Whole Genome Sequencing", "Mouse (GRCm39)", "P2"]]).unwrap();
        pooled_library_annotation(&mut r, &again).unwrap();
        let libs = r.table(LIBRARY_TABLE).unwrap();
        assert_eq!(libs.len(), 1);
        assert_eq!(libs.get(0, "pool"), Some(&CellValue::text("P2")));
    }
}
