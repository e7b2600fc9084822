//! seqflow-persistence
//!
//! Backends durables de `StepStore`:
//! - `file`: un snapshot JSON por sesión en `{root}/{workflow_kind}/{id}.msf`,
//!   reemplazado de forma atómica en cada write.
//! - `pg` (feature `postgres`): tabla `workflow_sessions` con el snapshot en
//!   JSONB, pool r2d2 y migraciones embebidas.
//! - `config`: carga de configuración desde `.env` / entorno.

pub mod config;
pub mod error;
pub mod file;
#[cfg(feature = "postgres")]
pub mod migrations;
#[cfg(feature = "postgres")]
pub mod pg;
#[cfg(feature = "postgres")]
pub mod schema;

use seqflow_core::{Fact, StepStore};

pub use config::{init_dotenv, DbConfig, SessionStoreConfig, StoreBackend};
pub use error::PersistenceError;
pub use file::FileStepStore;
#[cfg(feature = "postgres")]
pub use pg::{build_pool, build_pool_from_config, ConnectionProvider, PgPool, PgStepStore, PoolProvider};

/// Construye el store configurado.
pub fn open_store<F: Fact + 'static>(config: &SessionStoreConfig) -> Result<Box<dyn StepStore<F>>, PersistenceError> {
    match config.backend {
        StoreBackend::File => {
            log::debug!("open_store backend=file root={}", config.uploads_dir.display());
            Ok(Box::new(FileStepStore::new(&config.uploads_dir)))
        }
        #[cfg(feature = "postgres")]
        StoreBackend::Postgres => {
            let db = config.database
                           .as_ref()
                           .ok_or_else(|| PersistenceError::Config("DATABASE_URL is not set".into()))?;
            log::debug!("open_store backend=postgres");
            let pool = build_pool_from_config(db)?;
            Ok(Box::new(PgStepStore::new(PoolProvider { pool })))
        }
        #[cfg(not(feature = "postgres"))]
        StoreBackend::Postgres => Err(PersistenceError::Config("built without the 'postgres' feature".into())),
    }
}

/// Store de archivo para los snapshots finales de sesiones completadas.
pub fn open_archive(config: &SessionStoreConfig) -> FileStepStore {
    FileStepStore::new(config.archive_dir())
}
