//! Refresh command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct RefreshArgs {}

pub async fn run(ctx: &AppContext, _args: RefreshArgs) -> Result<()> {
    ctx.require_session()?;
    let client = ctx.client()?;

    output::progress("Refreshing session...");

    client
        .coordinator()
        .renew_now()
        .await
        .context("Failed to refresh session")?;

    let stored = ctx.require_session()?;
    output::success("Session refreshed successfully");
    output::field("Saved", &super::saved_at(&stored));

    Ok(())
}
