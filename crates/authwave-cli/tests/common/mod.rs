use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// An isolated home for one CLI test: its own session file and backend URL.
pub struct CliEnv {
    _dir: TempDir,
    session_file: PathBuf,
    base_url: Option<String>,
}

impl CliEnv {
    pub fn new(base_url: impl Into<String>) -> Self {
        let dir = TempDir::new().unwrap();
        let session_file = dir.path().join("session").join("credentials.json");
        Self {
            _dir: dir,
            session_file,
            base_url: Some(base_url.into()),
        }
    }

    /// Leave the backend URL unset.
    pub fn without_base_url(mut self) -> Self {
        self.base_url = None;
        self
    }

    pub fn session_file(&self) -> &Path {
        &self.session_file
    }

    /// Write a credential pair as a previous `login` would have.
    pub fn seed_session(&self, access: &str, refresh: &str) {
        std::fs::create_dir_all(self.session_file.parent().unwrap()).unwrap();
        let json = serde_json::json!({
            "access_token": access,
            "refresh_token": refresh,
            "saved_at": "2026-01-01T00:00:00Z",
        });
        std::fs::write(&self.session_file, json.to_string()).unwrap();
    }

    /// Read back the stored `(access, refresh)` tokens, if any.
    pub fn stored_tokens(&self) -> Option<(String, String)> {
        let json = std::fs::read_to_string(&self.session_file).ok()?;
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        Some((
            value["access_token"].as_str().unwrap().to_string(),
            value["refresh_token"].as_str().unwrap().to_string(),
        ))
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_authwave"));
        cmd.args(args);
        cmd.env("AUTHWAVE_SESSION_FILE", &self.session_file);
        match &self.base_url {
            Some(url) => cmd.env("AUTHWAVE_BASE_URL", url),
            None => cmd.env_remove("AUTHWAVE_BASE_URL"),
        };
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("RUST_LOG");
        cmd.env_remove("AUTHWAVE_PASSWORD");
        cmd
    }

    /// Run the CLI without blocking the runtime serving the mock backend.
    pub async fn run(&self, args: &[&str]) -> Output {
        let mut cmd = self.command(args);
        tokio::task::spawn_blocking(move || cmd.output().expect("Failed to execute CLI"))
            .await
            .unwrap()
    }

    /// Run the CLI and expect success.
    pub async fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args).await;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }
}
