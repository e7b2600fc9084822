//! seqflow-domain: catálogos, validación tabular y resolución de barcodes
//! usados por los workflows de anotación.
pub mod barcode;
pub mod categories;
pub mod error;
pub mod kits;
pub mod sequence;
pub mod validation;

pub use barcode::{assign_barcodes, detect_index_type, settle_choice, BarcodeMatchReport, BarcodeResolver, FullCandidate, KitMatch,
                  MatchOrientation, OrientationChoice, RoleMatch};
pub use categories::{AssayType, BarcodeOrientation, BarcodeRole, Category, GenomeRef, IndexType, LibraryType, MuxType, SubmissionType};
pub use error::DomainError;
pub use kits::{Feature, FeatureKit, InMemoryKitCatalog, IndexKitCatalogEntry, KitBarcode, KitCatalog};
pub use sequence::{normalize, reverse_complement};
pub use validation::{CellError, CellErrorKind, ColumnKind, ColumnRegistry, ColumnSpec, TableValidator, ValidationOutcome, ValidationReport};
