//! Features de anticuerpos y su mapeo a kits del catálogo.
//!
//! Una fila referencia un kit (con o sin feature concreta) o describe una
//! feature propia con secuencia, patrón y read. Las filas de kit se
//! expanden con los datos del catálogo una vez que todos los kits tienen id.
use std::collections::{BTreeMap, HashMap};

use seqflow_core::{CellType, CellValue, Table};
use seqflow_domain::{Category, CellErrorKind, DomainError, KitCatalog, LibraryType, ValidationReport};

use super::{cell_error, check_known, reject, validate, Record};
use crate::error::WorkflowError;
use crate::tables::{self, FEATURE_KIT_TABLE, FEATURE_TABLE, LIBRARY_TABLE};

const CUSTOM_FEATURE_COLUMNS: [(&str, &str); 4] = [("feature", "Feature"), ("sequence", "Sequence"), ("pattern", "Pattern"), ("read", "Read")];

/// Librerías que requieren anotación de features.
fn feature_libraries(record: &Record) -> Vec<String> {
    let Ok(libs) = record.table(LIBRARY_TABLE) else {
        return Vec::new();
    };
    libs.rows()
        .filter(|r| r.get("library_type_id").as_i64().and_then(LibraryType::from_id).is_some_and(|t| t.needs_features()))
        .map(|r| r.get("library_name").to_string())
        .collect()
}

pub(crate) fn feature_annotation<C: KitCatalog + ?Sized>(record: &mut Record, input: &Table, catalog: &C) -> Result<(), WorkflowError> {
    let (features, _) = validate(tables::feature_columns()?, input)?;
    let mut report = check_known(&features, "library_name", &feature_libraries(record), "antibody capture library");
    for row in features.rows().filter(|r| r.get("kit").is_null()) {
        for (column, display) in CUSTOM_FEATURE_COLUMNS {
            if row.get(column).is_null() {
                report.push_cell(cell_error(&features,
                                            row.index(),
                                            column,
                                            CellErrorKind::Missing,
                                            format!("Missing value for '{display}'")));
            }
        }
    }
    reject(report)?;

    let mut kits = Table::with_columns([("kit", CellType::Text), ("kit_id", CellType::Integer)])?;
    for name in features.unique_values("kit")? {
        let kit_id = catalog.find_feature_kit(&name.to_string()).map(|k| k.kit_id);
        kits.push_row(vec![name, kit_id.into()])?;
    }
    let unresolved = kits.any_in_column("kit_id", CellValue::is_null);
    log::debug!("feature_annotation:done features={} kits={} unresolved={unresolved}", features.len(), kits.len());
    record.add_table(FEATURE_TABLE, features);
    record.add_table(FEATURE_KIT_TABLE, kits);
    if !unresolved {
        expand_kit_features(record, catalog)?;
    }
    Ok(())
}

pub(crate) fn feature_kit_mapping<C: KitCatalog + ?Sized>(record: &mut Record,
                                                          mapping: &BTreeMap<String, i64>,
                                                          catalog: &C)
                                                          -> Result<(), WorkflowError> {
    let mut kits = record.table(FEATURE_KIT_TABLE)?.clone();
    let mut report = ValidationReport::default();
    for i in 0..kits.len() {
        if kits.get(i, "kit_id").is_some_and(|v| !v.is_null()) {
            continue;
        }
        let name = kits.get(i, "kit").map(CellValue::to_string).unwrap_or_default();
        match mapping.get(&name).copied().filter(|id| catalog.feature_kit(*id).is_some()) {
            Some(id) => kits.set(i, "kit_id", CellValue::Int(id))?,
            None => report.push_general(format!("Feature kit '{name}' must be mapped to a catalog kit.")),
        }
    }
    reject(report)?;
    record.update_table(FEATURE_KIT_TABLE, kits)?;
    expand_kit_features(record, catalog)
}

/// Reemplaza las filas de kit por las features del catálogo: una fila si
/// nombra la feature, todas las del kit si no.
fn expand_kit_features<C: KitCatalog + ?Sized>(record: &mut Record, catalog: &C) -> Result<(), WorkflowError> {
    let kit_ids: HashMap<String, i64> = record.table(FEATURE_KIT_TABLE)?
                                              .rows()
                                              .filter_map(|r| Some((r.get("kit").to_string(), r.get("kit_id").as_i64()?)))
                                              .collect();
    let features = record.table(FEATURE_TABLE)?;
    let mut expanded = Table::new();
    for col in features.columns() {
        expanded.add_column(&col.name, col.cell_type)?;
    }
    expanded.ensure_column("kit_id", CellType::Integer)?;

    let mut report = ValidationReport::default();
    for row in features.rows() {
        let kit_name = row.get("kit");
        if kit_name.is_null() {
            expanded.push_named(features.column_names().into_iter().map(|c| (c, row.get(c).clone())))?;
            continue;
        }
        let kit_id = kit_ids.get(&kit_name.to_string()).copied().ok_or_else(|| DomainError::Catalog(format!("feature kit '{kit_name}' has no id")))?;
        let kit = catalog.get_feature_kit(kit_id)?;
        let selected: Vec<_> = match row.get("feature").as_str() {
            Some(name) => match kit.feature(name) {
                Some(f) => vec![f],
                None => {
                    report.push_cell(cell_error(features,
                                                row.index(),
                                                "feature",
                                                CellErrorKind::Invalid,
                                                format!("Feature '{name}' is not part of kit '{}'.", kit.name)));
                    continue;
                }
            },
            None => kit.features.iter().collect(),
        };
        for f in selected {
            expanded.push_named([("library_name", row.get("library_name").clone()),
                                 ("kit", CellValue::text(&kit.identifier)),
                                 ("kit_id", CellValue::Int(kit.kit_id)),
                                 ("feature", CellValue::text(&f.name)),
                                 ("sequence", CellValue::text(&f.sequence)),
                                 ("pattern", CellValue::text(&f.pattern)),
                                 ("read", CellValue::text(&f.read))])?;
        }
    }
    reject(report)?;
    log::debug!("feature_kits:expand:done rows={}", expanded.len());
    record.add_table(FEATURE_TABLE, expanded);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqflow_core::StepArgs;
    use seqflow_domain::{Feature, FeatureKit, InMemoryKitCatalog};

    fn catalog() -> InMemoryKitCatalog {
        let feature = |name: &str, seq: &str| Feature { name: name.into(),
                                                       target_name: None,
                                                       target_id: None,
                                                       sequence: seq.into(),
                                                       pattern: "5PNNNNNNNNNN(BC)".into(),
                                                       read: "R2".into() };
        let mut cat = InMemoryKitCatalog::new();
        cat.add_feature_kit(FeatureKit { kit_id: 7,
                                         name: "TotalSeq-B Human".into(),
                                         identifier: "TSB-H".into(),
                                         features: vec![feature("CD3", "AACAAGACCCTTGAG"), feature("CD4", "TACCCGTAATAGCGT")] })
           .unwrap();
        cat
    }

    fn record() -> Record {
        let mut r = Record::seed(StepArgs::new());
        let mut libs = Table::with_columns([("library_name", CellType::Text), ("library_type_id", CellType::Integer)]).unwrap();
        libs.push_row(vec!["s1_10XABC".into(), CellValue::Int(LibraryType::TenxAntibodyCapture.id())]).unwrap();
        libs.push_row(vec!["s1_10XGEX3P".into(), CellValue::Int(LibraryType::TenxScGex3Prime.id())]).unwrap();
        r.add_table(LIBRARY_TABLE, libs);
        r
    }

    #[test]
    fn known_kits_expand_to_catalog_features() {
        let mut r = record();
        let input = Table::from_text_rows(&["library_name", "kit", "feature"], &[vec!["s1_10XABC", "TSB-H", ""]]).unwrap();
        feature_annotation(&mut r, &input, &catalog()).unwrap();
        let features = r.table(FEATURE_TABLE).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features.get(1, "sequence"), Some(&CellValue::text("TACCCGTAATAGCGT")));
        assert_eq!(features.get(0, "kit_id"), Some(&CellValue::Int(7)));
    }

    #[test]
    fn custom_features_need_all_fields_and_an_antibody_library() {
        let mut r = record();
        let input = Table::from_text_rows(&["library_name", "feature", "sequence", "pattern", "read"],
                                          &[vec!["s1_10XGEX3P", "CD8", "ACGT", "5P(BC)", "R2"], vec!["s1_10XABC", "CD19", "", "5P(BC)", "R2"]]).unwrap();
        let Err(WorkflowError::Domain(DomainError::Validation(report))) = feature_annotation(&mut r, &input, &catalog()) else {
            panic!("expected validation errors");
        };
        assert_eq!(report.cells.len(), 2);
        assert_eq!(report.cells[0].message, "Unknown antibody capture library 's1_10XGEX3P'.");
        assert_eq!(report.cells[1].cell_ref(), "D2");
    }

    #[test]
    fn unknown_kits_wait_for_mapping() {
        let mut r = record();
        let input = Table::from_text_rows(&["library_name", "kit", "feature"], &[vec!["s1_10XABC", "My Panel", "CD4"]]).unwrap();
        feature_annotation(&mut r, &input, &catalog()).unwrap();
        assert!(r.table(FEATURE_KIT_TABLE).unwrap().any_in_column("kit_id", CellValue::is_null));
        assert!(!r.table(FEATURE_TABLE).unwrap().has_column("kit_id"));

        assert!(feature_kit_mapping(&mut r, &BTreeMap::new(), &catalog()).is_err());
        let mapping = BTreeMap::from([("My Panel".to_string(), 7)]);
        feature_kit_mapping(&mut r, &mapping, &catalog()).unwrap();
        let features = r.table(FEATURE_TABLE).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features.get(0, "sequence"), Some(&CellValue::text("TACCCGTAATAGCGT")));
    }
}
