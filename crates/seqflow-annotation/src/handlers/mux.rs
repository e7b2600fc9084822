//! Anotación de multiplexado (on-chip, oligos/hashing y sondas Flex).
//!
//! Los tres steps comparten la forma: una fila por muestra con su barcode.
//! Las muestras deben existir y un barcode no puede repetirse dentro de un
//! mismo pool.
use std::collections::{HashMap, HashSet};

use seqflow_core::{CellType, CellValue, Table};
use seqflow_domain::{CellErrorKind, ColumnRegistry};

use super::{cell_error, check_known, reject, store_table, text_values, validate, Record};
use crate::error::WorkflowError;
use crate::tables::{LIBRARY_TABLE, MUX_TABLE, SAMPLE_TABLE};

/// Pool de cada muestra definida, si se definieron muestras multiplexadas.
fn sample_pools(record: &Record) -> HashMap<String, String> {
    let Ok(samples) = record.table(SAMPLE_TABLE) else {
        return HashMap::new();
    };
    samples.rows()
           .filter_map(|r| Some((r.get("sample_name").as_str()?.to_string(), r.get("sample_pool").as_str()?.to_string())))
           .collect()
}

pub(crate) fn mux_annotation(record: &mut Record, input: &Table, registry: ColumnRegistry, barcode_column: &str) -> Result<(), WorkflowError> {
    let (mut mux, _) = validate(registry, input)?;

    let known = if record.has_table(SAMPLE_TABLE) {
        text_values(record, SAMPLE_TABLE, "sample_name")
    } else {
        text_values(record, LIBRARY_TABLE, "sample_name")
    };
    let mut report = check_known(&mux, "sample_name", &known, "sample");

    let pools = sample_pools(record);
    let mut used: HashSet<(String, String)> = HashSet::new();
    for row in mux.rows() {
        let sample = row.get("sample_name").to_string();
        let pool = pools.get(&sample).cloned().unwrap_or_default();
        let barcode = row.get(barcode_column).to_string();
        if !used.insert((pool.clone(), barcode.clone())) {
            report.push_cell(cell_error(&mux,
                                        row.index(),
                                        barcode_column,
                                        CellErrorKind::Duplicate,
                                        format!("Barcode '{barcode}' is used more than once in pool '{pool}'.")));
        }
    }
    reject(report)?;

    if !pools.is_empty() {
        mux.ensure_column("sample_pool", CellType::Text)?;
        for i in 0..mux.len() {
            let pool = mux.get(i, "sample_name").and_then(|s| pools.get(&s.to_string())).cloned();
            mux.set(i, "sample_pool", CellValue::from(pool))?;
        }
    }
    log::debug!("mux_annotation:done samples={} barcode_column={barcode_column}", mux.len());
    store_table(record, MUX_TABLE, mux, "sample_name")
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqflow_core::StepArgs;
    use seqflow_domain::DomainError;

    use crate::tables::ocm_columns;

    fn record() -> Record {
        let mut r = Record::seed(StepArgs::new());
        let samples = Table::from_text_rows(&["sample_name", "sample_pool"],
                                            &[vec!["s1", "p1"], vec!["s2", "p1"], vec!["s3", "p2"]]).unwrap();
        r.add_table(SAMPLE_TABLE, samples);
        r
    }

    #[test]
    fn barcodes_repeat_only_across_pools() {
        let mut r = record();
        let input = Table::from_text_rows(&["sample_name", "barcode_id"], &[vec!["s1", "OB1"], vec!["s2", "OB2"], vec!["s3", "OB1"]]).unwrap();
        mux_annotation(&mut r, &input, ocm_columns().unwrap(), "barcode_id").unwrap();
        let mux = r.table(MUX_TABLE).unwrap();
        assert_eq!(mux.get(2, "sample_pool"), Some(&CellValue::text("p2")));
    }

    #[test]
    fn same_barcode_in_one_pool_is_a_duplicate() {
        let mut r = record();
        let input = Table::from_text_rows(&["sample_name", "barcode_id"], &[vec!["s1", "OB1"], vec!["s2", "OB1"], vec!["s9", "OB3"]]).unwrap();
        let Err(WorkflowError::Domain(DomainError::Validation(report))) = mux_annotation(&mut r, &input, ocm_columns().unwrap(), "barcode_id")
        else {
            panic!("expected validation errors");
        };
        assert_eq!(report.cells.len(), 2);
        assert!(report.cells.iter().any(|e| e.kind == CellErrorKind::Duplicate && e.row == 2));
        assert!(report.cells.iter().any(|e| e.message == "Unknown sample 's9'." && e.row == 3));
    }
}
