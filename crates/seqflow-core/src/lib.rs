//! seqflow-core: motor de workflows por pasos, reanudable y con ramificación
//! determinista.
pub mod branch;
pub mod chain;
pub mod commit;
pub mod constants;
pub mod errors;
pub mod hashing;
pub mod model;
pub mod store;

pub use branch::{BranchResolver, BranchRule, Predicate, StepId};
pub use chain::StepChain;
pub use commit::{CommittedIds, DomainCommitter};
pub use errors::{ChainError, Classify, ErrorClass, StoreError, TableError};
pub use model::{CellType, CellValue, Fact, FactSheet, RowRef, SessionHeader, SessionId, SessionSnapshot, StepArgs, StepRecord, Table,
                TableColumn};
pub use store::{CachedStepStore, InMemoryStepStore, StepStore, WorkflowCache};
