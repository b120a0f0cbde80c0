//! Logout command implementation.

use anyhow::{Context, Result};
use clap::Args;

use authwave_core::CredentialStore;

use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub fn run(ctx: &AppContext, _args: LogoutArgs) -> Result<()> {
    let had_session = matches!(ctx.store().load(), Ok(Some(_)));

    ctx.store()
        .clear()
        .context("Failed to remove session file")?;

    if had_session {
        output::success("Logged out");
    } else {
        output::success("No active session");
    }

    Ok(())
}
