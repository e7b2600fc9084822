//! Carga de configuración desde variables de entorno.
//!
//! - `SEQFLOW_UPLOADS_DIR`: raíz de los snapshots en disco (default `uploads`).
//! - `SEQFLOW_STORE_BACKEND`: `file` (default) o `postgres`.
//! - `DATABASE_URL`, `DATABASE_MIN_CONNECTIONS` (2),
//!   `DATABASE_MAX_CONNECTIONS` (16): sólo para el backend Postgres.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

use crate::error::PersistenceError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Fuerza la carga de `.env` (idempotente).
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    File,
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = PersistenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "" => Ok(StoreBackend::File),
            "postgres" | "pg" => Ok(StoreBackend::Postgres),
            other => Err(PersistenceError::Config(format!("unknown store backend '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, PersistenceError> {
        init_dotenv();
        Self::from_lookup(|k| env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PersistenceError> {
        let url = lookup("DATABASE_URL").ok_or_else(|| PersistenceError::Config("DATABASE_URL is not set".into()))?;
        let min_connections = lookup("DATABASE_MIN_CONNECTIONS").and_then(|v| v.parse().ok()).unwrap_or(2);
        let max_connections = lookup("DATABASE_MAX_CONNECTIONS").and_then(|v| v.parse().ok()).unwrap_or(16);
        Ok(Self { url, min_connections, max_connections })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStoreConfig {
    pub uploads_dir: PathBuf,
    pub backend: StoreBackend,
    pub database: Option<DbConfig>,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self { uploads_dir: PathBuf::from("uploads"),
               backend: StoreBackend::File,
               database: None }
    }
}

impl SessionStoreConfig {
    pub fn from_env() -> Result<Self, PersistenceError> {
        init_dotenv();
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Igual que `from_env` pero leyendo de `lookup` (tests, fuentes externas).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PersistenceError> {
        let uploads_dir = lookup("SEQFLOW_UPLOADS_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("uploads"));
        let backend = match lookup("SEQFLOW_STORE_BACKEND") {
            Some(v) => v.parse()?,
            None => StoreBackend::File,
        };
        let database = match backend {
            StoreBackend::Postgres => Some(DbConfig::from_lookup(&lookup)?),
            StoreBackend::File => DbConfig::from_lookup(&lookup).ok(),
        };
        Ok(Self { uploads_dir, backend, database })
    }

    /// Directorio de snapshots archivados al completar una sesión.
    pub fn archive_dir(&self) -> PathBuf {
        self.uploads_dir.join("archive")
    }
}
