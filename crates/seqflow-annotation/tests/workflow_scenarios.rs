use std::collections::BTreeMap;

use seqflow_annotation::tables::{BARCODE_TABLE, LIBRARY_TABLE, MUX_TABLE, SAMPLE_TABLE};
use seqflow_annotation::{AnnotationFact, AnnotationFacts, AnnotationStep, AssaySelection, BarcodeChoices, InMemoryCommitter, LibraryAnnotation,
                         ProjectRef, SeqRequestInfo, StepInput, StepOutcome, WORKFLOW_KIND};
use seqflow_core::{CellValue, Classify, InMemoryStepStore, SessionId, SessionSnapshot, StepStore, StoreError, Table};
use seqflow_domain::{AssayType, BarcodeOrientation, BarcodeRole, Category, DomainError, IndexKitCatalogEntry, IndexType, InMemoryKitCatalog, MuxType,
                     OrientationChoice, SubmissionType};

fn catalog() -> InMemoryKitCatalog {
    let mut cat = InMemoryKitCatalog::new();
    cat.add_index_kit(IndexKitCatalogEntry::new(1, "Dual Index Kit TT Set A", "TT-A", IndexType::DualIndex)
            .with_barcode(BarcodeRole::I7, "AGATCTCG", "TT-A1", Some("A1"))
            .with_barcode(BarcodeRole::I7, "ACGTACGT", "TT-B1", Some("B1"))
            .with_barcode(BarcodeRole::I5, "CCCCAAAA", "TT-A1", Some("A1"))
            .with_barcode(BarcodeRole::I5, "GGGGTTTT", "TT-B1", Some("B1")))
       .unwrap();
    cat.add_index_kit(IndexKitCatalogEntry::new(2, "Single Index Kit N Set A", "SI-NA", IndexType::SingleIndexI7)
            .with_barcode(BarcodeRole::I7, "AGATCTCG", "SI-NA-A1", Some("A1"))
            .with_barcode(BarcodeRole::I7, "ACGTACGT", "SI-NA-B1", Some("B1")))
       .unwrap();
    cat
}

fn request(submission_type: SubmissionType) -> SeqRequestInfo {
    SeqRequestInfo { seq_request_id: 7, submission_type }
}

fn project() -> StepInput {
    StepInput::ProjectSelect { project: ProjectRef { project_id: None,
                                                     name: "Atlas".into() } }
}

fn advanced(outcome: StepOutcome) -> AnnotationStep {
    match outcome {
        StepOutcome::Advanced { next } => next,
        other => panic!("expected to advance, got {other:?}"),
    }
}

fn pooled_libraries(i7: [&str; 2]) -> Table {
    let headers = ["Sample Name", "Library Name", "Library Type", "Genome", "Pool", "i7 Sequence"];
    Table::from_text_rows(&headers,
                          &[vec!["s1", "lib1", "10X Single Cell 3-P Gene Expression", "Human (GRCh38)", "P1", i7[0]],
                            vec!["s2", "lib2", "10X Single Cell 3-P Gene Expression", "Human (GRCh38)", "P1", i7[1]]])
    .unwrap()
}

#[test]
fn raw_samples_walk_to_completion_and_commit() {
    let mut store = InMemoryStepStore::new();
    let mut archive = InMemoryStepStore::new();
    let cat = catalog();
    let id = SessionId::new();

    let mut wf = LibraryAnnotation::start(&mut store, &cat, id, request(SubmissionType::RawSamples)).unwrap();
    assert_eq!(wf.current_step().unwrap(), AnnotationStep::ProjectSelect);
    assert_eq!(advanced(wf.submit(project()).unwrap()), AnnotationStep::AssaySelect);
    let next = advanced(wf.submit(StepInput::AssaySelect(AssaySelection::new(AssayType::TenxScGex3Prime))).unwrap());
    assert_eq!(next, AnnotationStep::SampleDefinition);

    let samples = Table::from_text_rows(&["Sample Name", "Genome"], &[vec!["s1", "Human (GRCh38)"], vec!["s2", "Mouse (GRCm39)"]]).unwrap();
    assert_eq!(advanced(wf.submit(StepInput::SampleDefinition { samples }).unwrap()), AnnotationStep::Complete);
    assert!(wf.is_complete());
    assert_eq!(wf.facts().unwrap().seq_request(), Some(7));
    assert_eq!(wf.record().unwrap().table(LIBRARY_TABLE).unwrap().len(), 2);

    let names: Vec<&str> = wf.traceback().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, ["project_select", "assay_select", "sample_definition", "complete"]);

    let mut committer = InMemoryCommitter::new();
    let ids = wf.finish(&mut committer, Some(&mut archive)).unwrap();
    assert_eq!(ids.get("sample").len(), 2);
    assert_eq!(ids.get("library").len(), 2);
    assert!(ids.get("pool").is_empty());
    assert_eq!(committer.committed()[0].project.as_deref(), Some("Atlas"));

    assert!(StepStore::<AnnotationFact>::read(&store, WORKFLOW_KIND, id).unwrap().is_none());
    assert!(StepStore::<AnnotationFact>::read(&archive, WORKFLOW_KIND, id).unwrap().is_some());
}

#[test]
fn sessions_resume_where_they_stopped() {
    let mut store = InMemoryStepStore::new();
    let cat = catalog();
    let id = SessionId::new();
    {
        let mut wf = LibraryAnnotation::start(&mut store, &cat, id, request(SubmissionType::RawSamples)).unwrap();
        wf.submit(project()).unwrap();
    }
    let wf = LibraryAnnotation::open(&mut store, &cat, id).unwrap();
    assert_eq!(wf.current_step().unwrap(), AnnotationStep::AssaySelect);
    assert_eq!(wf.facts().unwrap().project().map(|p| p.name.as_str()), Some("Atlas"));

    // start sobre una sesión existente no la reinicia
    let wf = LibraryAnnotation::start(&mut store, &cat, id, request(SubmissionType::RawSamples)).unwrap();
    assert_eq!(wf.chain().len(), 2);
}

#[test]
fn input_for_another_step_is_rejected() {
    let cat = catalog();
    let mut wf = LibraryAnnotation::start(InMemoryStepStore::new(), &cat, SessionId::new(), request(SubmissionType::RawSamples)).unwrap();
    let e = wf.submit(StepInput::AssaySelect(AssaySelection::new(AssayType::TenxScGex3Prime))).unwrap_err();
    assert!(matches!(e, seqflow_annotation::WorkflowError::UnexpectedStep { expected: AnnotationStep::ProjectSelect,
                                                                            found: AnnotationStep::AssaySelect }));
    assert_eq!(e.to_string(), "step 'assay_select' cannot be submitted now; the current step is 'project_select'");
    assert!(!e.is_recoverable());
    assert_eq!(wf.chain().len(), 1);
}

#[test]
fn invalid_samples_keep_the_session_on_the_same_step() {
    let cat = catalog();
    let mut wf = LibraryAnnotation::start(InMemoryStepStore::new(), &cat, SessionId::new(), request(SubmissionType::RawSamples)).unwrap();
    wf.submit(project()).unwrap();
    wf.submit(StepInput::AssaySelect(AssaySelection::new(AssayType::TenxScGex3Prime))).unwrap();

    let samples = Table::from_text_rows(&["Sample Name", "Genome"], &[vec!["s1", "Human (GRCh38)"], vec!["s2", "Zebrafish"]]).unwrap();
    let StepOutcome::Invalid(report) = wf.submit(StepInput::SampleDefinition { samples }).unwrap() else {
        panic!("expected validation errors");
    };
    assert_eq!(report.cells.len(), 1);
    assert_eq!(report.cells[0].row, 2);
    assert_eq!(wf.current_step().unwrap(), AnnotationStep::SampleDefinition);
    assert!(!wf.record().unwrap().has_table(SAMPLE_TABLE));
}

#[test]
fn going_back_merges_the_resubmitted_table() {
    let cat = catalog();
    let mut wf = LibraryAnnotation::start(InMemoryStepStore::new(), &cat, SessionId::new(), request(SubmissionType::RawSamples)).unwrap();
    wf.submit(project()).unwrap();
    wf.submit(StepInput::AssaySelect(AssaySelection::new(AssayType::TenxScGex3Prime))).unwrap();
    let samples = Table::from_text_rows(&["Sample Name", "Genome"], &[vec!["s1", "Human (GRCh38)"], vec!["s2", "Human (GRCh38)"]]).unwrap();
    wf.submit(StepInput::SampleDefinition { samples }).unwrap();

    assert_eq!(wf.back().unwrap(), AnnotationStep::SampleDefinition);
    let samples = Table::from_text_rows(&["Sample Name", "Genome"], &[vec!["s2", "Mouse (GRCm39)"], vec!["s3", "Human (GRCh38)"]]).unwrap();
    assert_eq!(advanced(wf.submit(StepInput::SampleDefinition { samples }).unwrap()), AnnotationStep::Complete);

    let samples = wf.record().unwrap().table(SAMPLE_TABLE).unwrap();
    let names: Vec<String> = samples.column_values("sample_name").unwrap().iter().map(ToString::to_string).collect();
    assert_eq!(names, ["s2", "s3"]);
    assert_eq!(samples.get(0, "genome_id"), Some(&CellValue::Int(2)));
}

#[test]
fn back_on_the_first_step_fails() {
    let cat = catalog();
    let mut wf = LibraryAnnotation::start(InMemoryStepStore::new(), &cat, SessionId::new(), request(SubmissionType::RawSamples)).unwrap();
    assert!(matches!(wf.back(), Err(seqflow_annotation::WorkflowError::AtFirstStep)));
}

#[test]
fn on_chip_multiplexing_annotates_barcodes_per_pool() {
    let cat = catalog();
    let mut wf = LibraryAnnotation::start(InMemoryStepStore::new(), &cat, SessionId::new(), request(SubmissionType::RawSamples)).unwrap();
    wf.submit(project()).unwrap();
    let selection = AssaySelection::new(AssayType::TenxScGex3Prime).with_mux(MuxType::TenxOnChip);
    assert_eq!(advanced(wf.submit(StepInput::AssaySelect(selection)).unwrap()), AnnotationStep::MultiplexedSampleDefinition);

    let samples = Table::from_text_rows(&["Sample Name", "Genome", "Sample Pool"],
                                        &[vec!["s1", "Human (GRCh38)", "pool_a"], vec!["s2", "Human (GRCh38)", "pool_a"]]).unwrap();
    assert_eq!(advanced(wf.submit(StepInput::MultiplexedSampleDefinition { samples }).unwrap()), AnnotationStep::OcmAnnotation);
    assert_eq!(wf.record().unwrap().table(LIBRARY_TABLE).unwrap().len(), 1);

    let mux = Table::from_text_rows(&["Sample Name", "OCM Barcode"], &[vec!["s1", "OB1"], vec!["s2", "OB2"]]).unwrap();
    assert_eq!(advanced(wf.submit(StepInput::OcmAnnotation { mux }).unwrap()), AnnotationStep::Complete);
    assert_eq!(wf.record().unwrap().table(MUX_TABLE).unwrap().get(1, "sample_pool"), Some(&CellValue::text("pool_a")));
}

#[test]
fn pooled_libraries_match_a_catalog_kit() {
    let cat = catalog();
    let mut wf = LibraryAnnotation::start(InMemoryStepStore::new(), &cat, SessionId::new(), request(SubmissionType::PooledLibraries)).unwrap();
    wf.submit(project()).unwrap();
    let next = advanced(wf.submit(StepInput::AssaySelect(AssaySelection::new(AssayType::TenxScGex3Prime))).unwrap());
    assert_eq!(next, AnnotationStep::PooledLibraryAnnotation);

    let libraries = pooled_libraries(["AGATCTCG", "ACGTACGT"]);
    assert_eq!(advanced(wf.submit(StepInput::PooledLibraryAnnotation { libraries }).unwrap()), AnnotationStep::BarcodeMatch);
    assert_eq!(advanced(wf.submit(StepInput::BarcodeMatch(BarcodeChoices::default())).unwrap()), AnnotationStep::Complete);

    let barcodes = wf.record().unwrap().table(BARCODE_TABLE).unwrap();
    assert_eq!(barcodes.get(1, "name_i7"), Some(&CellValue::text("SI-NA-B1")));
    assert_eq!(barcodes.get(0, "kit_i7_id"), Some(&CellValue::Int(2)));
    assert_eq!(wf.facts().unwrap().index_type(), Some(IndexType::SingleIndexI7));

    let mut committer = InMemoryCommitter::new();
    let ids = wf.finish(&mut committer, None).unwrap();
    assert_eq!(ids.get("pool").len(), 1);
    assert_eq!(committer.committed()[0].samples, ["s1", "s2"]);
}

#[test]
fn unmatched_barcodes_need_a_declared_orientation() {
    let cat = catalog();
    let mut wf = LibraryAnnotation::start(InMemoryStepStore::new(), &cat, SessionId::new(), request(SubmissionType::PooledLibraries)).unwrap();
    wf.submit(project()).unwrap();
    wf.submit(StepInput::AssaySelect(AssaySelection::new(AssayType::TenxScGex3Prime))).unwrap();
    wf.submit(StepInput::PooledLibraryAnnotation { libraries: pooled_libraries(["TTTTTTTT", "GGGGGGGG"]) }).unwrap();

    let StepOutcome::NeedsOrientation { role, report } = wf.submit(StepInput::BarcodeMatch(BarcodeChoices::default())).unwrap() else {
        panic!("expected an orientation request");
    };
    assert_eq!(role, BarcodeRole::I7);
    assert!(report.full_candidates(BarcodeRole::I7).is_empty());
    assert_eq!(wf.current_step().unwrap(), AnnotationStep::BarcodeMatch);

    let unknown = BarcodeChoices { i7: Some(OrientationChoice::Unknown), i5: None };
    let e = wf.submit(StepInput::BarcodeMatch(unknown)).unwrap_err();
    assert_eq!(e, seqflow_annotation::WorkflowError::Domain(DomainError::OrientationUnresolved { role: BarcodeRole::I7 }));
    assert!(!e.is_recoverable());
    assert_eq!(wf.current_step().unwrap(), AnnotationStep::BarcodeMatch);

    let forward = BarcodeChoices { i7: Some(OrientationChoice::Forward), i5: None };
    assert_eq!(advanced(wf.submit(StepInput::BarcodeMatch(forward)).unwrap()), AnnotationStep::Complete);
    assert_eq!(wf.facts().unwrap().barcode_choices().i7, Some(OrientationChoice::Forward));
}

#[test]
fn declared_kit_names_are_mapped_before_completion() {
    let cat = catalog();
    let mut wf = LibraryAnnotation::start(InMemoryStepStore::new(), &cat, SessionId::new(), request(SubmissionType::PooledLibraries)).unwrap();
    wf.submit(project()).unwrap();
    wf.submit(StepInput::AssaySelect(AssaySelection::new(AssayType::TenxScGex3Prime))).unwrap();

    let headers = ["Sample Name", "Library Name", "Library Type", "Genome", "Pool", "i7 Kit", "i7 Name"];
    let libraries = Table::from_text_rows(&headers,
                                          &[vec!["s1", "lib1", "10X Single Cell 3-P Gene Expression", "Human (GRCh38)", "P1", "Legacy TT", "TT-A1"]])
                    .unwrap();
    assert_eq!(advanced(wf.submit(StepInput::PooledLibraryAnnotation { libraries }).unwrap()), AnnotationStep::IndexKitMapping);

    let StepOutcome::Invalid(_) = wf.submit(StepInput::IndexKitMapping { kits: BTreeMap::new() }).unwrap() else {
        panic!("unmapped kit should be reported");
    };
    let kits = BTreeMap::from([("Legacy TT".to_string(), 1)]);
    assert_eq!(advanced(wf.submit(StepInput::IndexKitMapping { kits }).unwrap()), AnnotationStep::Complete);
    assert_eq!(wf.record().unwrap().table(BARCODE_TABLE).unwrap().get(0, "sequence_i7"), Some(&CellValue::text("AGATCTCG")));
}

#[test]
fn raw_i5_sequences_are_matched_when_only_the_i7_kit_is_declared() {
    let cat = catalog();
    let mut wf = LibraryAnnotation::start(InMemoryStepStore::new(), &cat, SessionId::new(), request(SubmissionType::PooledLibraries)).unwrap();
    wf.submit(project()).unwrap();
    wf.submit(StepInput::AssaySelect(AssaySelection::new(AssayType::TenxScGex3Prime))).unwrap();

    let headers = ["Sample Name", "Library Name", "Library Type", "Genome", "Pool", "i7 Kit", "i7 Name", "i5 Sequence"];
    let gex = "10X Single Cell 3-P Gene Expression";
    let libraries = Table::from_text_rows(&headers,
                                          &[vec!["s1", "lib1", gex, "Human (GRCh38)", "P1", "TT-A", "TT-A1", "TTTTGGGG"],
                                            vec!["s2", "lib2", gex, "Human (GRCh38)", "P1", "TT-A", "TT-B1", "AAAACCCC"]])
                    .unwrap();
    assert_eq!(advanced(wf.submit(StepInput::PooledLibraryAnnotation { libraries }).unwrap()), AnnotationStep::BarcodeMatch);
    assert_eq!(wf.barcode_report().unwrap().roles, vec![BarcodeRole::I5]);
    assert_eq!(advanced(wf.submit(StepInput::BarcodeMatch(BarcodeChoices::default())).unwrap()), AnnotationStep::IndexKitMapping);
    assert_eq!(advanced(wf.submit(StepInput::IndexKitMapping { kits: BTreeMap::new() }).unwrap()), AnnotationStep::Complete);

    let t = wf.record().unwrap().table(BARCODE_TABLE).unwrap();
    assert_eq!(t.get(0, "sequence_i7"), Some(&CellValue::text("AGATCTCG")));
    assert_eq!(t.get(0, "sequence_i5"), Some(&CellValue::text("CCCCAAAA")));
    assert_eq!(t.get(1, "sequence_i5"), Some(&CellValue::text("GGGGTTTT")));
    assert_eq!(t.get(1, "name_i5"), Some(&CellValue::text("TT-B1")));
    assert_eq!(t.get(1, "kit_i5_id"), Some(&CellValue::Int(1)));
    assert_eq!(t.get(0, "orientation_i5_id"), Some(&CellValue::Int(BarcodeOrientation::Forward.id())));
}

#[test]
fn declared_kit_with_invalid_sequence_is_rejected() {
    let cat = catalog();
    let mut wf = LibraryAnnotation::start(InMemoryStepStore::new(), &cat, SessionId::new(), request(SubmissionType::PooledLibraries)).unwrap();
    wf.submit(project()).unwrap();
    wf.submit(StepInput::AssaySelect(AssaySelection::new(AssayType::TenxScGex3Prime))).unwrap();

    let headers = ["Sample Name", "Library Name", "Library Type", "Genome", "Pool", "i7 Kit", "i7 Sequence"];
    let libraries = Table::from_text_rows(&headers,
                                          &[vec!["s1", "lib1", "10X Single Cell 3-P Gene Expression", "Human (GRCh38)", "P1", "SI-NA", "ACGXACGT"]])
                    .unwrap();
    assert_eq!(advanced(wf.submit(StepInput::PooledLibraryAnnotation { libraries }).unwrap()), AnnotationStep::IndexKitMapping);
    let StepOutcome::Invalid(report) = wf.submit(StepInput::IndexKitMapping { kits: BTreeMap::new() }).unwrap() else {
        panic!("invalid nucleotides should be reported");
    };
    assert_eq!(report.cells.len(), 1);
    assert_eq!(report.cells[0].column_label, "sequence_i7");
    assert_eq!(wf.current_step().unwrap(), AnnotationStep::IndexKitMapping);
}

/// Store en memoria cuyo primer `delete` falla.
struct FailingDelete<'a> {
    inner: &'a mut InMemoryStepStore,
    failures: usize,
}

impl StepStore<AnnotationFact> for FailingDelete<'_> {
    fn read(&self, workflow_kind: &str, id: SessionId) -> Result<Option<SessionSnapshot<AnnotationFact>>, StoreError> {
        StepStore::<AnnotationFact>::read(&*self.inner, workflow_kind, id)
    }

    fn write(&mut self, id: SessionId, snapshot: &SessionSnapshot<AnnotationFact>) -> Result<(), StoreError> {
        StepStore::<AnnotationFact>::write(&mut *self.inner, id, snapshot)
    }

    fn delete(&mut self, workflow_kind: &str, id: SessionId) -> Result<bool, StoreError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(StoreError::Backend("connection reset".into()));
        }
        StepStore::<AnnotationFact>::delete(&mut *self.inner, workflow_kind, id)
    }

    fn list(&self, workflow_kind: &str) -> Result<Vec<SessionId>, StoreError> {
        StepStore::<AnnotationFact>::list(&*self.inner, workflow_kind)
    }
}

#[test]
fn finish_retry_after_failed_delete_does_not_commit_twice() {
    let mut store = InMemoryStepStore::new();
    let cat = catalog();
    let id = SessionId::new();
    let samples = Table::from_text_rows(&["Sample Name", "Genome"], &[vec!["s1", "Human (GRCh38)"]]).unwrap();
    {
        let flaky = FailingDelete { inner: &mut store, failures: 1 };
        let mut wf = LibraryAnnotation::start(flaky, &cat, id, request(SubmissionType::RawSamples)).unwrap();
        wf.submit(project()).unwrap();
        wf.submit(StepInput::AssaySelect(AssaySelection::new(AssayType::TenxScGex3Prime))).unwrap();
        assert_eq!(advanced(wf.submit(StepInput::SampleDefinition { samples }).unwrap()), AnnotationStep::Complete);
    }

    let mut committer = InMemoryCommitter::new();
    let flaky = FailingDelete { inner: &mut store, failures: 1 };
    let wf = LibraryAnnotation::open(flaky, &cat, id).unwrap();
    assert!(wf.finish(&mut committer, None).is_err());
    assert_eq!(committer.committed().len(), 1);

    let wf = LibraryAnnotation::open(&mut store, &cat, id).unwrap();
    assert!(wf.facts().unwrap().committed().is_some());
    let ids = wf.finish(&mut committer, None).unwrap();
    assert_eq!(committer.committed().len(), 1);
    assert_eq!(ids.get("sample").len(), 1);
    assert!(StepStore::<AnnotationFact>::read(&store, WORKFLOW_KIND, id).unwrap().is_none());
}

#[test]
fn finishing_before_completion_is_rejected() {
    let cat = catalog();
    let wf = LibraryAnnotation::start(InMemoryStepStore::new(), &cat, SessionId::new(), request(SubmissionType::RawSamples)).unwrap();
    let mut committer = InMemoryCommitter::new();
    assert!(wf.finish(&mut committer, None).is_err());
    assert!(committer.committed().is_empty());
}
