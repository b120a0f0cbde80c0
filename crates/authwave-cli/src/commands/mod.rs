//! Subcommand implementations.

mod login;
mod logout;
mod refresh;
mod request;
mod whoami;

use anyhow::Result;
use clap::Subcommand;

use crate::context::AppContext;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Exchange email and password for a credential pair
    Login(login::LoginArgs),

    /// Forget the stored credential pair
    Logout(logout::LogoutArgs),

    /// Fetch the current identity, renewing the session if needed
    Whoami(whoami::WhoamiArgs),

    /// Renew the credential pair now
    Refresh(refresh::RefreshArgs),

    /// Send an authenticated request and print the response
    Request(request::RequestArgs),
}

pub async fn handle(ctx: &AppContext, command: Command) -> Result<()> {
    match command {
        Command::Login(args) => login::run(ctx, args).await,
        Command::Logout(args) => logout::run(ctx, args),
        Command::Whoami(args) => whoami::run(ctx, args).await,
        Command::Refresh(args) => refresh::run(ctx, args).await,
        Command::Request(args) => request::run(ctx, args).await,
    }
}

/// Human-readable timestamp of when the session file was last written.
fn saved_at(stored: &authwave_file::StoredCredentials) -> String {
    stored
        .saved_at
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S %Z")
        .to_string()
}
