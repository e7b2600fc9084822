//! Commit del record final: muestras, librerías y pools a crear.
use serde::{Deserialize, Serialize};

use seqflow_core::{CommittedIds, DomainCommitter, StepRecord, Table};

use crate::error::WorkflowError;
use crate::facts::{AnnotationFact, AnnotationFacts};
use crate::tables::{LIBRARY_TABLE, SAMPLE_TABLE};

/// Entidades que el record final describe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitPlan {
    pub seq_request_id: Option<i64>,
    pub project: Option<String>,
    pub samples: Vec<String>,
    pub libraries: Vec<String>,
    pub pools: Vec<String>,
}

fn distinct(table: &Table, column: &str) -> Vec<String> {
    table.unique_values(column).map(|v| v.iter().map(ToString::to_string).collect()).unwrap_or_default()
}

pub fn plan_commit(record: &StepRecord<AnnotationFact>) -> Result<CommitPlan, WorkflowError> {
    let libraries = record.table(LIBRARY_TABLE)?;
    // sin definición de muestras (librerías en pool) salen de las librerías
    let samples = match record.table(SAMPLE_TABLE) {
        Ok(samples) => distinct(samples, "sample_name"),
        Err(_) => distinct(libraries, "sample_name"),
    };
    Ok(CommitPlan { seq_request_id: record.metadata.seq_request(),
                    project: record.metadata.project().map(|p| p.name.clone()),
                    samples,
                    libraries: distinct(libraries, "library_name"),
                    pools: distinct(libraries, "pool") })
}

/// Committer en memoria: asigna ids secuenciales y guarda los planes.
#[derive(Debug, Default)]
pub struct InMemoryCommitter {
    next_id: i64,
    committed: Vec<CommitPlan>,
}

impl InMemoryCommitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn committed(&self) -> &[CommitPlan] {
        &self.committed
    }

    fn next(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl DomainCommitter<AnnotationFact> for InMemoryCommitter {
    type Error = WorkflowError;

    fn commit(&mut self, record: &StepRecord<AnnotationFact>) -> Result<CommittedIds, WorkflowError> {
        let plan = plan_commit(record)?;
        let mut ids = CommittedIds::new();
        for (entity, names) in [("sample", &plan.samples), ("library", &plan.libraries), ("pool", &plan.pools)] {
            for _ in names {
                let id = self.next();
                ids.push(entity, id);
            }
        }
        log::debug!("annotation_commit:done samples={} libraries={} pools={}", plan.samples.len(), plan.libraries.len(), plan.pools.len());
        self.committed.push(plan);
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqflow_core::{CellType, CellValue, ChainError, StepArgs};

    #[test]
    fn pooled_libraries_commit_samples_from_libraries() {
        let mut r = StepRecord::seed(StepArgs::new());
        r.metadata.set(AnnotationFact::SeqRequest(42));
        let mut libs = Table::with_columns([("library_name", CellType::Text), ("sample_name", CellType::Text), ("pool", CellType::Text)])
            .unwrap();
        libs.push_row(vec!["l1".into(), "s1".into(), "P1".into()]).unwrap();
        libs.push_row(vec!["l2".into(), "s1".into(), "P1".into()]).unwrap();
        libs.push_row(vec!["l3".into(), "s2".into(), CellValue::Null]).unwrap();
        r.add_table(LIBRARY_TABLE, libs);

        let plan = plan_commit(&r).unwrap();
        assert_eq!(plan.samples, vec!["s1", "s2"]);
        assert_eq!(plan.pools, vec!["P1"]);
        assert_eq!(plan.seq_request_id, Some(42));

        let mut committer = InMemoryCommitter::new();
        let ids = committer.commit(&r).unwrap();
        assert_eq!(ids.get("sample"), &[1, 2]);
        assert_eq!(ids.get("library"), &[3, 4, 5]);
        assert_eq!(ids.get("pool"), &[6]);
        assert_eq!(committer.committed().len(), 1);
    }

    #[test]
    fn commit_needs_a_library_table() {
        let r = StepRecord::seed(StepArgs::new());
        assert_eq!(plan_commit(&r), Err(WorkflowError::Chain(ChainError::TableNotFound(LIBRARY_TABLE.into()))));
    }
}
