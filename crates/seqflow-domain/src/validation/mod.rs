pub mod columns;
pub mod merge;
pub mod report;
pub mod validator;

pub use columns::{snake_case, CleanUpFn, ColumnKind, ColumnRegistry, ColumnSpec, ValidateFn, DEFAULT_MAX_LENGTH};
pub use merge::merge_on_resume;
pub use report::{column_letter, CellError, CellErrorKind, ValidationReport};
pub use validator::{pre_clean, TableValidator, ValidationOutcome};
