//! JSON-file credential store.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use authwave_core::Result;
use authwave_core::error::StorageError;
use authwave_core::{AccessToken, CredentialPair, CredentialStore, RefreshToken};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Contents of the credential file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    /// When this pair was written.
    pub saved_at: DateTime<Utc>,
}

impl From<StoredCredentials> for CredentialPair {
    fn from(stored: StoredCredentials) -> Self {
        CredentialPair {
            access_token: stored.access_token,
            refresh_token: stored.refresh_token,
        }
    }
}

/// A [`CredentialStore`] persisted as a single JSON file.
///
/// The pair is written to a sibling temporary file and renamed into place,
/// so readers see either the old pair or the new one. Writers, including
/// other processes sharing the file, are serialized by an exclusive lock on
/// a sibling `.lock` file. Clearing removes the file. On Unix the file is
/// readable by the owner only.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the credential file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file including its metadata.
    pub fn load(&self) -> Result<Option<StoredCredentials>> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let stored = serde_json::from_str(&json).map_err(|e| StorageError::Corrupt {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(stored))
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling(".tmp")
    }

    fn lock_path(&self) -> PathBuf {
        self.sibling(".lock")
    }

    /// Run `f` while holding the exclusive write lock.
    fn locked<T>(&self, f: impl FnOnce() -> io::Result<T>) -> io::Result<T> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        lock_file.lock_exclusive()?;

        let result = f();

        lock_file.unlock()?;
        result
    }

    fn write_atomically(&self, contents: &[u8]) -> io::Result<()> {
        let temp = self.temp_path();
        let mut file = fs::File::create(&temp)?;

        #[cfg(unix)]
        {
            let mut perms = file.metadata()?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&temp, perms)?;
        }

        file.write_all(contents)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp, &self.path)
    }

    fn io_error(&self, source: io::Error) -> authwave_core::Error {
        StorageError::Io {
            path: self.path.display().to_string(),
            source,
        }
        .into()
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<Option<CredentialPair>> {
        Ok(self.load()?.map(CredentialPair::from))
    }

    #[instrument(skip(self, pair), fields(path = %self.path.display()))]
    fn set(&self, pair: &CredentialPair) -> Result<()> {
        let stored = StoredCredentials {
            access_token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
            saved_at: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&stored).map_err(|e| StorageError::Corrupt {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        self.locked(|| self.write_atomically(&json))
            .map_err(|e| self.io_error(e))?;

        debug!("Credentials saved");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn clear(&self) -> Result<()> {
        let removed = self
            .locked(|| match fs::remove_file(&self.path) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e),
            })
            .map_err(|e| self.io_error(e))?;

        if removed {
            debug!("Credentials removed");
        }
        Ok(())
    }
}
