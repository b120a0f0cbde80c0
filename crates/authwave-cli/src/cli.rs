//! CLI argument definitions.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Command;

/// Log in, inspect and use a bearer-token session.
#[derive(Parser, Debug)]
#[command(name = "authwave")]
#[command(author, version = env!("AUTHWAVE_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Backend base URL, e.g. https://api.example.com
    #[arg(long, env = "AUTHWAVE_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Where the credential pair is kept between runs
    #[arg(long, env = "AUTHWAVE_SESSION_FILE", global = true)]
    pub session_file: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30, global = true)]
    pub timeout_secs: u64,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "authwave",
            "request",
            "get",
            "/api/items/",
            "--base-url",
            "http://localhost:8000",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Request(_)));
    }
}
