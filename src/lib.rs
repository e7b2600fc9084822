//! Seqflow
//!
//! Fachada del workspace:
//! - Reexporta los crates del workspace.
//! - `Seqflow` arma el store configurado con una `WorkflowCache` inyectada y
//!   abre, reanuda y cierra sesiones de anotación de librerías.
//! - `config` y `errors` cubren la configuración y los errores de la fachada.

pub mod config;
pub mod errors;

pub use seqflow_annotation;
pub use seqflow_core;
pub use seqflow_domain;
pub use seqflow_persistence;

pub use config::AppConfig;
pub use errors::AppError;

use seqflow_annotation::{AnnotationFact, LibraryAnnotation, SeqRequestInfo};
use seqflow_core::{CachedStepStore, CommittedIds, DomainCommitter, SessionId, StepStore, WorkflowCache};
use seqflow_domain::KitCatalog;
use seqflow_persistence::{open_archive, open_store};

/// Store de sesiones con su cache delante.
pub type SessionStore = CachedStepStore<AnnotationFact, Box<dyn StepStore<AnnotationFact>>>;

/// Sesión de anotación sobre el store configurado.
pub type AnnotationSession<'c, C> = LibraryAnnotation<'c, SessionStore, C>;

pub struct Seqflow {
    config: AppConfig,
    cache: WorkflowCache<AnnotationFact>,
}

impl Seqflow {
    pub fn new(config: AppConfig) -> Self {
        Self { config, cache: WorkflowCache::new() }
    }

    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self::new(AppConfig::from_env()?))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> &WorkflowCache<AnnotationFact> {
        &self.cache
    }

    fn store(&self) -> Result<SessionStore, AppError> {
        Ok(CachedStepStore::new(open_store(&self.config.store)?, self.cache.clone()))
    }

    /// Abre la sesión `id` o la crea para la solicitud dada.
    pub fn start<'c, C: KitCatalog + ?Sized>(&self,
                                             catalog: &'c C,
                                             id: SessionId,
                                             request: SeqRequestInfo)
                                             -> Result<AnnotationSession<'c, C>, AppError> {
        Ok(LibraryAnnotation::start(self.store()?, catalog, id, request)?)
    }

    /// Reanuda una sesión existente.
    pub fn resume<'c, C: KitCatalog + ?Sized>(&self, catalog: &'c C, id: SessionId) -> Result<AnnotationSession<'c, C>, AppError> {
        Ok(LibraryAnnotation::open(self.store()?, catalog, id)?)
    }

    /// Commit de la sesión completa y archivo del snapshot final en
    /// `{uploads}/archive`.
    pub fn finish<C, D>(&self, session: AnnotationSession<'_, C>, committer: &mut D) -> Result<CommittedIds, AppError>
        where C: KitCatalog + ?Sized,
              D: DomainCommitter<AnnotationFact>
    {
        let mut archive = open_archive(&self.config.store);
        Ok(session.finish(committer, Some(&mut archive))?)
    }
}
