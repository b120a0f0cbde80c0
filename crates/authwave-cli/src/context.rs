//! Shared setup for commands: session file location and client wiring.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use tracing::debug;

use authwave::AuthClient;
use authwave_core::BaseUrl;
use authwave_file::{FileCredentialStore, StoredCredentials};
use authwave_http::HttpTransport;

use crate::cli::Cli;

/// Everything a command needs, resolved from global flags and environment.
#[derive(Debug)]
pub struct AppContext {
    base_url: Option<String>,
    timeout: Duration,
    store: Arc<FileCredentialStore>,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let path = match &cli.session_file {
            Some(path) => path.clone(),
            None => default_session_path()?,
        };

        Ok(Self {
            base_url: cli.base_url.clone(),
            timeout: Duration::from_secs(cli.timeout_secs),
            store: Arc::new(FileCredentialStore::new(path)),
        })
    }

    pub fn store(&self) -> &FileCredentialStore {
        &self.store
    }

    /// Build a client that reads and writes the session file.
    pub fn client(&self) -> Result<AuthClient> {
        let raw = self
            .base_url
            .as_deref()
            .context("No backend configured. Pass --base-url or set AUTHWAVE_BASE_URL.")?;
        let base = BaseUrl::new(raw).context("Invalid base URL")?;
        debug!(base = %base, session_file = %self.store.path().display(), "Building client");

        let transport = HttpTransport::builder(base)
            .timeout(self.timeout)
            .user_agent(concat!("authwave-cli/", env!("AUTHWAVE_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(AuthClient::new(Arc::new(transport), self.store.clone()))
    }

    /// Load the stored session or explain how to create one.
    pub fn require_session(&self) -> Result<StoredCredentials> {
        self.store
            .load()
            .context("Failed to load session")?
            .context("No active session. Run 'authwave login' first.")
    }
}

fn default_session_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "authwave").context("Could not determine data directory")?;

    Ok(dirs.data_dir().join("credentials.json"))
}
