//! seqflow-annotation: workflow de anotación de librerías sobre el motor de
//! steps de `seqflow-core`.
pub mod commit;
pub mod error;
pub mod facts;
pub mod handlers;
pub mod library;
pub mod steps;
pub mod tables;
pub mod workflow;

pub use commit::{plan_commit, CommitPlan, InMemoryCommitter};
pub use error::WorkflowError;
pub use facts::{AdditionalServices, AnnotationFact, AnnotationFacts, BarcodeChoices, FactKey, ProjectRef};
pub use handlers::assay::AssaySelection;
pub use steps::{AnnotationStep, WORKFLOW_KIND};
pub use workflow::{LibraryAnnotation, SeqRequestInfo, StepInput, StepOutcome};
