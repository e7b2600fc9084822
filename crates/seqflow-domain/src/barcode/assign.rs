//! Aplicación de la orientación elegida sobre la tabla de barcodes.
use serde::{Deserialize, Serialize};

use seqflow_core::{CellType, CellValue, Table};

use super::resolver::{BarcodeMatchReport, MatchOrientation};
use super::{is_deleted, INDEX_TYPE_ID_COLUMN};
use crate::categories::{BarcodeOrientation, BarcodeRole, Category, IndexType};
use crate::error::DomainError;
use crate::kits::KitCatalog;
use crate::sequence::{normalize, reverse_complement};

/// Decisión del usuario para un rol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "choice", rename_all = "snake_case")]
pub enum OrientationChoice {
    /// Un kit candidato, en la orientación en que coincidió.
    Kit { kit_id: i64, orientation: MatchOrientation },
    /// Secuencias declaradas en orientación directa, sin validar.
    Forward,
    /// Secuencias declaradas como reverso complementario, sin validar.
    ReverseComplement,
    /// El usuario no conoce la orientación.
    Unknown,
}

/// Decide qué elección aplicar a `role`.
///
/// Sin declaración explícita se toma el primer candidato completo del
/// reporte; si no hay ninguno el usuario debe declarar la orientación.
pub fn settle_choice(report: &BarcodeMatchReport,
                     role: BarcodeRole,
                     declared: Option<OrientationChoice>)
                     -> Result<OrientationChoice, DomainError> {
    match declared {
        Some(OrientationChoice::Unknown) => Err(DomainError::OrientationUnresolved { role }),
        Some(choice) => Ok(choice),
        None => report.full_candidates(role)
                      .first()
                      .map(|c| OrientationChoice::Kit { kit_id: c.kit_id,
                                                        orientation: c.orientation })
                      .ok_or(DomainError::OrientationRequired { role }),
    }
}

/// Reescribe las columnas de `role` según `choice`. Las filas borradas
/// (`index_well == "del"`) no se tocan.
///
/// - `Kit`: pasa las secuencias a orientación directa, completa nombre,
///   kit e id de kit, y marca la orientación como `Forward`.
/// - `Forward` / `ReverseComplement`: orientación `ForwardNotValidated`
///   (reverso-complementando en el segundo caso).
/// - `Unknown`: `OrientationUnresolved`, sin modificar la tabla.
pub fn assign_barcodes<C: KitCatalog + ?Sized>(table: &mut Table,
                                               role: BarcodeRole,
                                               choice: OrientationChoice,
                                               catalog: &C)
                                               -> Result<(), DomainError> {
    log::debug!("barcode_assign:start role={} choice={choice:?}", role.as_str());
    let seq_col = role.sequence_column();
    if !table.has_column(&seq_col) {
        return Err(DomainError::MissingColumn(seq_col));
    }
    let orient_col = role.orientation_column();

    let (kit, rc, orientation) = match choice {
        OrientationChoice::Unknown => return Err(DomainError::OrientationUnresolved { role }),
        OrientationChoice::Kit { kit_id, orientation } => {
            (Some(catalog.get_index_kit(kit_id)?), orientation == MatchOrientation::ReverseComplement, BarcodeOrientation::Forward)
        }
        OrientationChoice::Forward => (None, false, BarcodeOrientation::ForwardNotValidated),
        OrientationChoice::ReverseComplement => (None, true, BarcodeOrientation::ForwardNotValidated),
    };

    // primero se calcula todo y sólo después se escribe: un error deja la tabla intacta
    let mut updates = Vec::new();
    for row in table.rows().filter(|r| !is_deleted(r)) {
        let cell = row.get(&seq_col);
        let sequence = if cell.is_null() {
            None
        } else {
            let raw = normalize(&cell.to_string());
            Some(if rc { reverse_complement(&raw)? } else { raw })
        };
        let name = match (kit, &sequence) {
            (Some(kit), Some(seq)) => {
                let name = kit.name_for(role, seq).ok_or_else(|| DomainError::UnknownBarcode { kit_id: kit.kit_id,
                                                                                               role,
                                                                                               sequence: seq.clone() })?;
                Some(name.to_string())
            }
            _ => None,
        };
        updates.push((row.index(), sequence, name));
    }

    table.ensure_column(&orient_col, CellType::Integer)?;
    if kit.is_some() {
        table.ensure_column(&role.name_column(), CellType::Text)?;
        table.ensure_column(&role.kit_column(), CellType::Text)?;
        table.ensure_column(&role.kit_id_column(), CellType::Integer)?;
    }
    for (row, sequence, name) in updates {
        table.set(row, &seq_col, sequence.map(CellValue::text).unwrap_or_default())?;
        table.set(row, &orient_col, CellValue::Int(orientation.id()))?;
        if let Some(kit) = kit {
            table.set(row, &role.name_column(), name.into())?;
            table.set(row, &role.kit_column(), CellValue::text(&kit.identifier))?;
            table.set(row, &role.kit_id_column(), CellValue::Int(kit.kit_id))?;
        }
    }
    log::debug!("barcode_assign:done role={} orientation={}", role.as_str(), orientation.name());
    Ok(())
}

/// Tipo de índice común a todas las filas; `None` si la tabla está vacía,
/// falta la columna o las filas no coinciden.
pub fn detect_index_type(table: &Table) -> Option<IndexType> {
    let mut ids = table.rows().filter(|r| !is_deleted(r)).map(|r| {
                                                               let cell = r.get(INDEX_TYPE_ID_COLUMN);
                                                               cell.as_i64().or_else(|| cell.as_str().and_then(|s| s.trim().parse().ok()))
                                                           });
    let first = ids.next()??;
    if ids.all(|id| id == Some(first)) {
        IndexType::from_id(first)
    } else {
        None
    }
}
