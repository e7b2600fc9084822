//! Configuración central de la aplicación.
//! Agrupa la configuración de cada sección (por ahora sólo el store de
//! sesiones) y la carga desde `.env` / entorno.
use std::path::PathBuf;

use seqflow_persistence::{PersistenceError, SessionStoreConfig};

/// Configuración de la aplicación (extensible para más secciones).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// Store de sesiones: backend, directorio de uploads y base de datos.
    pub store: SessionStoreConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, PersistenceError> {
        Ok(Self { store: SessionStoreConfig::from_env()? })
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PersistenceError> {
        Ok(Self { store: SessionStoreConfig::from_lookup(lookup)? })
    }

    /// Configuración con store de archivos bajo `uploads_dir`.
    pub fn with_uploads_dir(uploads_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.store.uploads_dir = uploads_dir.into();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqflow_persistence::StoreBackend;

    #[test]
    fn uploads_dir_comes_from_the_environment() {
        let cfg = AppConfig::from_lookup(|k| (k == "SEQFLOW_UPLOADS_DIR").then(|| "/srv/seqflow".to_string())).unwrap();
        assert_eq!(cfg.store.uploads_dir, PathBuf::from("/srv/seqflow"));
        assert_eq!(cfg.store.backend, StoreBackend::File);
        assert_eq!(AppConfig::with_uploads_dir("/srv/seqflow"), cfg);
    }
}
