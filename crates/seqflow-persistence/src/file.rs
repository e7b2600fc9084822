//! `FileStepStore`: un archivo JSON por sesión.
//!
//! Ruta: `{root}/{workflow_kind}/{session_id}.msf`. Cada write serializa el
//! snapshot completo a un archivo temporal del mismo directorio y lo renombra
//! sobre el destino, así un lector nunca ve un snapshot a medio escribir.
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use seqflow_core::constants::SESSION_FILE_EXTENSION;
use seqflow_core::store::{decode_snapshot, encode_snapshot};
use seqflow_core::{Fact, SessionId, SessionSnapshot, StepStore, StoreError};
use tempfile::NamedTempFile;

#[derive(Debug, Clone)]
pub struct FileStepStore {
    root: PathBuf,
}

impl FileStepStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, workflow_kind: &str, id: SessionId) -> Result<PathBuf, StoreError> {
        Ok(self.kind_dir(workflow_kind)?.join(format!("{id}.{SESSION_FILE_EXTENSION}")))
    }

    fn kind_dir(&self, workflow_kind: &str) -> Result<PathBuf, StoreError> {
        let valid = !workflow_kind.is_empty()
                    && workflow_kind.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::Backend(format!("invalid workflow kind '{workflow_kind}'")));
        }
        Ok(self.root.join(workflow_kind))
    }
}

impl<F: Fact> StepStore<F> for FileStepStore {
    fn read(&self, workflow_kind: &str, id: SessionId) -> Result<Option<SessionSnapshot<F>>, StoreError> {
        let path = self.path_for(workflow_kind, id)?;
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        decode_snapshot(&raw).map(Some).inspect_err(|e| log::error!("file_store:read:corrupt path={} error={e}", path.display()))
    }

    fn write(&mut self, id: SessionId, snapshot: &SessionSnapshot<F>) -> Result<(), StoreError> {
        let dir = self.kind_dir(&snapshot.header.workflow_kind)?;
        let path = self.path_for(&snapshot.header.workflow_kind, id)?;
        let bytes = encode_snapshot(snapshot)?;
        fs::create_dir_all(&dir)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error.to_string()))?;
        log::debug!("file_store:write:done path={} bytes={}", path.display(), bytes.len());
        Ok(())
    }

    fn delete(&mut self, workflow_kind: &str, id: SessionId) -> Result<bool, StoreError> {
        let path = self.path_for(workflow_kind, id)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("file_store:delete:done path={}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, workflow_kind: &str) -> Result<Vec<SessionId>, StoreError> {
        let dir = self.kind_dir(workflow_kind)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids: Vec<SessionId> = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SESSION_FILE_EXTENSION) {
                continue;
            }
            // archivos con otro nombre se ignoran (temporales, copias manuales)
            if let Some(id) = path.file_stem().and_then(|s| s.to_str()).and_then(|s| s.parse().ok()) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_path_like_workflow_kinds() {
        let store = FileStepStore::new("/tmp/unused");
        let id = SessionId::new();
        assert!(store.path_for("../etc", id).is_err());
        assert!(store.path_for("", id).is_err());
        assert!(store.path_for("library_annotation", id).unwrap().ends_with(format!("library_annotation/{id}.msf")));
    }
}
