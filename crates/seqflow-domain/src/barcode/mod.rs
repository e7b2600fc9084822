//! Resolución de barcodes contra el catálogo de kits de índices.
//!
//! `resolver` cuenta coincidencias por kit y rol en orientación directa y
//! reverso-complementaria; `assign` aplica la elección del usuario sobre la
//! tabla de barcodes.
pub mod assign;
pub mod resolver;

pub use assign::{assign_barcodes, detect_index_type, settle_choice, OrientationChoice};
pub use resolver::{BarcodeMatchReport, BarcodeResolver, FullCandidate, KitMatch, MatchOrientation, RoleMatch};

use seqflow_core::model::RowRef;

/// Columna con el pocillo del índice; `"del"` marca filas borradas.
pub const INDEX_WELL_COLUMN: &str = "index_well";
pub const INDEX_TYPE_ID_COLUMN: &str = "index_type_id";

pub(crate) fn is_deleted(row: &RowRef<'_>) -> bool {
    row.get(INDEX_WELL_COLUMN).as_str() == Some("del")
}
