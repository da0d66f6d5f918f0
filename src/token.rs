//! Persisted authentication token slot.
//!
//! The token is written by the sign-in flow and read on every connect attempt.
//! Stores are synchronous: reads and writes are tiny and happen at most once
//! per connect.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::error::Result;

/// A single-slot token store.
pub trait TokenStore: Send + Sync + 'static {
    /// The stored token, if any.
    fn load(&self) -> Option<String>;

    /// Replace the stored token.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`](crate::error::SessionError::Io) if the
    /// backing storage could not be written.
    fn store(&self, token: &str) -> Result<()>;

    /// Forget the stored token.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`](crate::error::SessionError::Io) if the
    /// backing storage could not be updated.
    fn clear(&self) -> Result<()>;
}

// ── MemoryTokenStore ────────────────────────────────────────────────

/// Process-local token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, token: &str) -> Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_owned());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

// ── FileTokenStore ──────────────────────────────────────────────────

/// Token store backed by one file holding the raw token.
///
/// A missing or blank file means "no token".
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                (!token.is_empty()).then(|| token.to_owned())
            }
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    debug!(path = %self.path.display(), error = %e, "token file unreadable");
                }
                None
            }
        }
    }

    fn store(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, token)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.load(), None);
        store.store("abc").unwrap();
        assert_eq!(store.load().as_deref(), Some("abc"));
        store.clear().unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token"));
        assert_eq!(store.load(), None);
        store.clear().unwrap();
    }

    #[test]
    fn file_store_persists_and_trims() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token");
        let store = FileTokenStore::new(&path);

        store.store("jwt.value").unwrap();
        assert_eq!(FileTokenStore::new(&path).load().as_deref(), Some("jwt.value"));

        std::fs::write(&path, "  jwt.value\n").unwrap();
        assert_eq!(store.load().as_deref(), Some("jwt.value"));

        store.clear().unwrap();
        assert!(!path.exists());
        assert_eq!(store.load(), None);
    }

    #[test]
    fn file_store_blank_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "\n  \n").unwrap();
        assert_eq!(FileTokenStore::new(path).load(), None);
    }
}
