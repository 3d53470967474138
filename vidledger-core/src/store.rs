//! Load and save the catalog document.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use vidledger_model::Catalog;

use crate::error::PersistenceError;

/// What to do when the catalog file does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingCatalogPolicy {
    /// Start from an empty catalog. Used for the very first run.
    #[default]
    Bootstrap,
    /// Treat a missing file as fatal.
    Fail,
}

/// The on-disk catalog at a configured path.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted catalog.
    pub fn load(&self) -> Result<Catalog, PersistenceError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound {
                    path: self.path.clone(),
                });
            }
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let catalog: Catalog = toml::from_str(&contents).map_err(|source| {
            PersistenceError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;

        debug!(
            path = %self.path.display(),
            entries = catalog.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    /// Like [`load`](Self::load), but a missing file yields an empty catalog
    /// under [`MissingCatalogPolicy::Bootstrap`]. A malformed file is always
    /// an error so it never gets overwritten.
    pub fn load_or_bootstrap(
        &self,
        policy: MissingCatalogPolicy,
    ) -> Result<Catalog, PersistenceError> {
        match self.load() {
            Err(PersistenceError::NotFound { path })
                if policy == MissingCatalogPolicy::Bootstrap =>
            {
                warn!(
                    path = %path.display(),
                    "catalog file not found; starting from an empty catalog"
                );
                Ok(Catalog::new())
            }
            other => other,
        }
    }

    /// Replace the catalog file with `catalog`.
    ///
    /// Strategy:
    /// - Write the document to a temp file in the same directory
    /// - fsync the temp file
    /// - Rename it over the destination (atomic on POSIX filesystems)
    /// - Best-effort fsync the parent directory to persist the rename
    pub fn save(&self, catalog: &Catalog) -> Result<(), PersistenceError> {
        let rendered =
            toml::to_string_pretty(catalog).map_err(PersistenceError::Encode)?;

        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;

        let mut tmp =
            NamedTempFile::new_in(parent).map_err(|source| self.io_error(source))?;
        write_synced(&mut tmp, rendered.as_bytes())
            .map_err(|source| self.io_error(source))?;

        // Keep the permissions of the file being replaced.
        if let Ok(existing) = fs::metadata(&self.path) {
            let _ = tmp.as_file().set_permissions(existing.permissions());
        }

        tmp.persist(&self.path)
            .map_err(|source| PersistenceError::Persist {
                path: self.path.clone(),
                source,
            })?;

        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }

        debug!(
            path = %self.path.display(),
            entries = catalog.len(),
            "saved catalog"
        );
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

fn write_synced(tmp: &mut NamedTempFile, bytes: &[u8]) -> io::Result<()> {
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()
}
