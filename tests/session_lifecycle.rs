use seqflow::seqflow_annotation::{AnnotationStep, AssaySelection, InMemoryCommitter, ProjectRef, SeqRequestInfo, StepInput, StepOutcome};
use seqflow::seqflow_core::{Classify, SessionId, Table};
use seqflow::seqflow_domain::{AssayType, InMemoryKitCatalog, SubmissionType};
use seqflow::{AppConfig, Seqflow};

fn request() -> SeqRequestInfo {
    SeqRequestInfo { seq_request_id: 21,
                     submission_type: SubmissionType::RawSamples }
}

#[test]
fn file_backed_session_survives_restarts_and_is_archived() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = InMemoryKitCatalog::new();
    let id = SessionId::new();
    let session_file = dir.path().join("library_annotation").join(format!("{id}.msf"));

    let app = Seqflow::new(AppConfig::with_uploads_dir(dir.path()));
    {
        let mut session = app.start(&catalog, id, request()).unwrap();
        session.submit(StepInput::ProjectSelect { project: ProjectRef { project_id: Some(5),
                                                                        name: "Atlas".into() } })
               .unwrap();
        session.submit(StepInput::AssaySelect(AssaySelection::new(AssayType::TenxScGex5Prime))).unwrap();
    }
    assert!(session_file.exists());
    assert_eq!(app.cache().len(), 1);

    // otro proceso: cache vacía, el estado sale del disco
    let app = Seqflow::new(AppConfig::with_uploads_dir(dir.path()));
    let mut session = app.resume(&catalog, id).unwrap();
    assert_eq!(session.current_step().unwrap(), AnnotationStep::SampleDefinition);

    let samples = Table::from_text_rows(&["Sample Name", "Genome"], &[vec!["s1", "Human (GRCh38)"]]).unwrap();
    let outcome = session.submit(StepInput::SampleDefinition { samples }).unwrap();
    assert_eq!(outcome, StepOutcome::Advanced { next: AnnotationStep::Complete });

    let mut committer = InMemoryCommitter::new();
    let ids = app.finish(session, &mut committer).unwrap();
    assert_eq!(ids.get("library").len(), 1);
    assert!(!session_file.exists());
    assert!(dir.path().join("archive").join("library_annotation").join(format!("{id}.msf")).exists());
    assert!(app.cache().is_empty());
}

#[test]
fn resuming_an_unknown_session_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = InMemoryKitCatalog::new();
    let app = Seqflow::new(AppConfig::with_uploads_dir(dir.path()));
    let e = app.resume(&catalog, SessionId::new()).err().unwrap();
    assert!(!e.is_recoverable());
}
