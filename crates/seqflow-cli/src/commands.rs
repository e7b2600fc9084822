//! Operaciones de la CLI sobre sesiones persistidas.
//!
//! Cada comando recibe el store y un `Write` de salida para poder probarse
//! sin proceso ni terminal.
use std::io::Write;
use std::path::Path;

use thiserror::Error;

use seqflow_annotation::{steps, AnnotationFact, WORKFLOW_KIND};
use seqflow_core::{ChainError, SessionId, StepChain, StepId, StepStore};
use seqflow_domain::{BarcodeRole, Category, DomainError, InMemoryKitCatalog, KitCatalog};
use seqflow_persistence::PersistenceError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid session id '{0}'")]
    InvalidSessionId(String),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// 4: sesión inexistente o entrada rechazada; 5: error de backend.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::InvalidSessionId(_) | CliError::Chain(ChainError::SessionNotFound { .. } | ChainError::EmptyChain) => 4,
            _ => 5,
        }
    }
}

pub fn parse_session(raw: &str) -> Result<SessionId, CliError> {
    raw.parse().map_err(|_| CliError::InvalidSessionId(raw.to_string()))
}

fn open<S: StepStore<AnnotationFact>>(store: S, id: SessionId) -> Result<StepChain<AnnotationFact, S>, CliError> {
    Ok(StepChain::open_existing(store, WORKFLOW_KIND, id)?)
}

/// Cabecera de la sesión y, por step, sus hechos en JSON.
pub fn show<S: StepStore<AnnotationFact>>(store: S, id: SessionId, out: &mut impl Write) -> Result<(), CliError> {
    let chain = open(store, id)?;
    let header = chain.header();
    writeln!(out,
             "session {id} kind={} created_at={} engine={} schema=v{}",
             header.workflow_kind,
             header.created_at.to_rfc3339(),
             header.engine_version,
             header.fact_schema_version)?;
    for (i, (name, facts)) in chain.traceback().into_iter().enumerate() {
        writeln!(out, "{:>2}. {name} {}", i + 1, serde_json::to_string(facts)?)?;
    }
    Ok(())
}

/// Step que el resolver elegiría a continuación del último.
pub fn next<S: StepStore<AnnotationFact>>(store: S, id: SessionId, out: &mut impl Write) -> Result<(), CliError> {
    let chain = open(store, id)?;
    let next = steps::resolver()?.next(&chain)?;
    writeln!(out, "{}", next.name())?;
    Ok(())
}

/// Descarta el último step de la sesión.
pub fn pop<S: StepStore<AnnotationFact>>(store: S, id: SessionId, out: &mut impl Write) -> Result<(), CliError> {
    let mut chain = open(store, id)?;
    let (name, _) = chain.pop_last()?;
    log::info!("cli:pop session={id} step={name} remaining={}", chain.len());
    writeln!(out, "removed '{name}', {} step(s) left", chain.len())?;
    Ok(())
}

/// Borra la sesión sin archivarla.
pub fn delete<S: StepStore<AnnotationFact>>(store: S, id: SessionId, out: &mut impl Write) -> Result<(), CliError> {
    let chain = open(store, id)?;
    let removed = chain.discard()?;
    log::info!("cli:delete session={id} removed={removed}");
    writeln!(out, "deleted session {id}")?;
    Ok(())
}

/// Lista los kits de un catálogo JSON.
pub fn kits(path: &Path, out: &mut impl Write) -> Result<(), CliError> {
    let catalog = InMemoryKitCatalog::from_json_reader(std::fs::File::open(path)?)?;
    for kit in catalog.index_kits() {
        writeln!(out,
                 "index   {:>4}  {:<12} {} [{}] i7={} i5={}",
                 kit.kit_id,
                 kit.identifier,
                 kit.name,
                 kit.index_type.name(),
                 kit.barcodes(BarcodeRole::I7).len(),
                 kit.barcodes(BarcodeRole::I5).len())?;
    }
    for kit in catalog.feature_kits() {
        writeln!(out, "feature {:>4}  {:<12} {} features={}", kit.kit_id, kit.identifier, kit.name, kit.features.len())?;
    }
    Ok(())
}
