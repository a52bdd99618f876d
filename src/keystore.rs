//! Key-material storage collaborator.
//!
//! Two named byte-blob slots with plain get/put semantics and no versioning
//! beyond overwrite. The public slot may be read concurrently by any number
//! of encryptors and evaluators; the secret slot is written once at setup
//! and must only be reachable by the decryptor role, which is why callers
//! hold one store per role root rather than a single shared directory.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::debug;

use crate::errors::ContextError;

/// Slot name for the distributable public half.
pub const PUBLIC_CONTEXT_SLOT: &str = "public-context";

/// Slot name for the decryptor-only secret half.
pub const SECRET_CONTEXT_SLOT: &str = "secret-context";

/// Named byte-blob storage with overwrite semantics.
pub trait ContextStore {
    fn put(&self, slot: &str, bytes: &[u8]) -> Result<(), ContextError>;
    fn get(&self, slot: &str) -> Result<Vec<u8>, ContextError>;
}

/// Filesystem-backed store: one file per slot under a root directory.
#[derive(Debug, Clone)]
pub struct FsContextStore {
    root: PathBuf,
}

impl FsContextStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.root.join(format!("{slot}.bin"))
    }
}

impl ContextStore for FsContextStore {
    fn put(&self, slot: &str, bytes: &[u8]) -> Result<(), ContextError> {
        fs::create_dir_all(&self.root)
            .map_err(|err| ContextError::Storage(format!("create {}: {err}", self.root.display())))?;
        let path = self.slot_path(slot);
        fs::write(&path, bytes)
            .map_err(|err| ContextError::Storage(format!("write {}: {err}", path.display())))?;
        debug!(slot, bytes = bytes.len(), "stored context slot");
        Ok(())
    }

    fn get(&self, slot: &str) -> Result<Vec<u8>, ContextError> {
        let path = self.slot_path(slot);
        fs::read(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => {
                ContextError::Storage(format!("slot {slot} not found at {}", path.display()))
            }
            _ => ContextError::Storage(format!("read {}: {err}", path.display())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> FsContextStore {
        let dir = std::env::temp_dir().join(format!(
            "orion-keystore-{tag}-{}",
            std::process::id()
        ));
        FsContextStore::new(dir)
    }

    #[test]
    fn put_get_roundtrip_and_overwrite() {
        let store = temp_store("roundtrip");
        store.put(PUBLIC_CONTEXT_SLOT, b"first").unwrap();
        assert_eq!(store.get(PUBLIC_CONTEXT_SLOT).unwrap(), b"first");
        store.put(PUBLIC_CONTEXT_SLOT, b"second").unwrap();
        assert_eq!(store.get(PUBLIC_CONTEXT_SLOT).unwrap(), b"second");
    }

    #[test]
    fn missing_slot_is_a_storage_error() {
        let store = temp_store("missing");
        assert!(matches!(
            store.get(SECRET_CONTEXT_SLOT),
            Err(ContextError::Storage(_))
        ));
    }
}
