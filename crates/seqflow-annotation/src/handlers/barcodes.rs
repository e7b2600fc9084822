//! Resolución de índices: match contra el catálogo y mapeo de kits
//! declarados por nombre.
use std::collections::{BTreeMap, HashMap};

use seqflow_core::{CellType, CellValue, RowRef, Table};
use seqflow_domain::barcode::{INDEX_TYPE_ID_COLUMN, INDEX_WELL_COLUMN};
use seqflow_domain::{assign_barcodes, detect_index_type, normalize, reverse_complement, settle_choice, BarcodeMatchReport, BarcodeOrientation, BarcodeResolver,
                     BarcodeRole, CellError, CellErrorKind, Category, DomainError, IndexType, KitCatalog, ValidationReport};

use super::{cell_error, general, reject, Record};
use crate::error::WorkflowError;
use crate::facts::{AnnotationFact, BarcodeChoices};
use crate::tables::BARCODE_TABLE;

/// Tipo de índice de la tabla. Si ninguna fila lo declara se infiere de las
/// secuencias: con i5 es dual, si no single i7.
pub(crate) fn index_type_of(table: &Table) -> Result<IndexType, WorkflowError> {
    if table.any_in_column(INDEX_TYPE_ID_COLUMN, |v| !v.is_null()) {
        return detect_index_type(table).ok_or_else(|| general("All libraries must use the same index type."));
    }
    if table.any_in_column(&BarcodeRole::I5.sequence_column(), |v| !v.is_null()) {
        Ok(IndexType::DualIndex)
    } else {
        Ok(IndexType::SingleIndexI7)
    }
}

fn active_rows(table: &Table) -> impl Iterator<Item = RowRef<'_>> {
    table.rows().filter(|r| r.get(INDEX_WELL_COLUMN).as_str() != Some("del"))
}

/// Roles con secuencias enviadas y sin kit declarado en ninguna fila activa.
/// Cada rol se resuelve por separado: un kit i7 declarado no cubre las
/// secuencias i5.
pub(crate) fn unresolved_roles(table: &Table) -> Vec<BarcodeRole> {
    [BarcodeRole::I7, BarcodeRole::I5].into_iter()
                                      .filter(|role| {
                                          let (seq_col, kit_col) = (role.sequence_column(), role.kit_column());
                                          active_rows(table).all(|row| row.get(&kit_col).is_null())
                                          && active_rows(table).any(|row| !row.get(&seq_col).is_null())
                                      })
                                      .collect()
}

/// Reporte de coincidencias para los roles sin kit declarado.
pub(crate) fn match_report<C: KitCatalog + ?Sized>(record: &Record, catalog: &C) -> Result<BarcodeMatchReport, WorkflowError> {
    let table = record.table(BARCODE_TABLE)?;
    let index_type = index_type_of(table)?;
    let unresolved = unresolved_roles(table);
    let roles: Vec<BarcodeRole> = index_type.roles().iter().copied().filter(|r| unresolved.contains(r)).collect();
    Ok(BarcodeResolver::from_catalog(catalog, &[index_type]).resolve(table, &roles)?)
}

pub(crate) fn barcode_match<C: KitCatalog + ?Sized>(record: &mut Record, choices: BarcodeChoices, catalog: &C) -> Result<(), WorkflowError> {
    let report = match_report(record, catalog)?;
    if report.has_invalid_sequences() {
        return Err(DomainError::Validation(report.invalid).into());
    }
    let mut table = record.table(BARCODE_TABLE)?.clone();
    let index_type = index_type_of(&table)?;

    let mut settled = BarcodeChoices::default();
    for &role in &report.roles {
        let choice = settle_choice(&report, role, choices.get(role))?;
        assign_barcodes(&mut table, role, choice, catalog)?;
        settled.set(role, choice);
    }
    record.update_table(BARCODE_TABLE, table)?;
    record.metadata.set(AnnotationFact::IndexType(index_type));
    record.metadata.set(AnnotationFact::BarcodeChoices(settled));
    log::debug!("barcode_match:done index_type={} submitted={} choices={settled:?}", index_type.name(), report.submitted);
    Ok(())
}

struct BarcodeUpdate {
    row: usize,
    role: BarcodeRole,
    kit_id: i64,
    kit: String,
    sequence: CellValue,
    name: CellValue,
    orientation: BarcodeOrientation,
}

/// Ids de catálogo para los kits declarados por nombre y aún sin id.
fn resolve_kit_names<C: KitCatalog + ?Sized>(table: &Table,
                                             role: BarcodeRole,
                                             kits: &BTreeMap<String, i64>,
                                             catalog: &C,
                                             report: &mut ValidationReport)
                                             -> HashMap<String, i64> {
    let (kit_col, id_col) = (role.kit_column(), role.kit_id_column());
    let mut resolved = HashMap::new();
    for row in active_rows(table) {
        let name = row.get(&kit_col);
        if name.is_null() || !row.get(&id_col).is_null() {
            continue;
        }
        let name = name.to_string();
        if resolved.contains_key(&name) {
            continue;
        }
        let id = kits.get(&name).copied().or_else(|| catalog.find_index_kit(&name).map(|k| k.kit_id));
        match id.filter(|id| catalog.index_kit(*id).is_some()) {
            Some(id) => {
                resolved.insert(name, id);
            }
            None => report.push_general(format!("Index kit '{name}' was not found in the catalog.")),
        }
    }
    resolved
}

/// Completa secuencia, nombre e id de kit de las filas con kit declarado.
///
/// - Sin secuencia: se busca el barcode por nombre y, si no, por pocillo.
/// - Con secuencia: si está en el kit queda `Forward`; si no, se conserva
///   como `ForwardNotValidated`.
pub(crate) fn index_kit_mapping<C: KitCatalog + ?Sized>(record: &mut Record,
                                                        kits: &BTreeMap<String, i64>,
                                                        catalog: &C)
                                                        -> Result<(), WorkflowError> {
    let mut table = record.table(BARCODE_TABLE)?.clone();
    let mut report = ValidationReport::default();
    let mut updates = Vec::new();
    let mut errors: Vec<CellError> = Vec::new();

    for role in [BarcodeRole::I7, BarcodeRole::I5] {
        if !table.has_column(&role.kit_column()) {
            continue;
        }
        let resolved = resolve_kit_names(&table, role, kits, catalog, &mut report);
        let (seq_col, name_col) = (role.sequence_column(), role.name_column());
        for row in table.rows() {
            let Some(&kit_id) = resolved.get(&row.get(&role.kit_column()).to_string()) else {
                continue;
            };
            if row.get(INDEX_WELL_COLUMN).as_str() == Some("del") || !row.get(&role.kit_id_column()).is_null() {
                continue;
            }
            let kit = catalog.get_index_kit(kit_id)?;
            let sequence = row.get(&seq_col);
            let (sequence, name, orientation) = if sequence.is_null() {
                let by_name = row.get(&name_col).as_str().and_then(|n| kit.by_name(role, n));
                let by_well = || row.get(INDEX_WELL_COLUMN).as_str().and_then(|w| kit.by_well(role, w));
                match by_name.or_else(by_well) {
                    Some(b) => (CellValue::text(&b.sequence), CellValue::text(&b.name), BarcodeOrientation::Forward),
                    None => {
                        errors.push(cell_error(&table,
                                               row.index(),
                                               &name_col,
                                               CellErrorKind::Invalid,
                                               format!("No {} barcode of kit '{}' matches this row.", role.as_str(), kit.identifier)));
                        continue;
                    }
                }
            } else {
                let seq = normalize(&sequence.to_string());
                if let Err(e) = reverse_complement(&seq) {
                    errors.push(cell_error(&table, row.index(), &seq_col, CellErrorKind::Invalid, e.to_string()));
                    continue;
                }
                match kit.name_for(role, &seq) {
                    Some(n) => (CellValue::text(&seq), CellValue::text(n), BarcodeOrientation::Forward),
                    None => (CellValue::text(&seq), row.get(&name_col).clone(), BarcodeOrientation::ForwardNotValidated),
                }
            };
            updates.push(BarcodeUpdate { row: row.index(),
                                         role,
                                         kit_id,
                                         kit: kit.identifier.clone(),
                                         sequence,
                                         name,
                                         orientation });
        }
    }
    for e in errors {
        report.push_cell(e);
    }
    reject(report)?;

    for u in updates {
        table.ensure_column(&u.role.kit_id_column(), CellType::Integer)?;
        table.ensure_column(&u.role.name_column(), CellType::Text)?;
        table.ensure_column(&u.role.sequence_column(), CellType::Text)?;
        table.ensure_column(&u.role.orientation_column(), CellType::Integer)?;
        table.set(u.row, &u.role.kit_column(), CellValue::text(u.kit))?;
        table.set(u.row, &u.role.kit_id_column(), CellValue::Int(u.kit_id))?;
        table.set(u.row, &u.role.sequence_column(), u.sequence)?;
        table.set(u.row, &u.role.name_column(), u.name)?;
        table.set(u.row, &u.role.orientation_column(), CellValue::Int(u.orientation.id()))?;
    }
    record.update_table(BARCODE_TABLE, table)?;
    log::debug!("index_kit_mapping:done kits={}", kits.len());
    Ok(())
}
