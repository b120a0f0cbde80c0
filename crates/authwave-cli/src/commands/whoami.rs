//! Whoami command implementation.

use anyhow::{Context, Result};
use clap::Args;

use authwave::SessionController;

use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct WhoamiArgs {}

pub async fn run(ctx: &AppContext, _args: WhoamiArgs) -> Result<()> {
    ctx.require_session()?;

    let session = SessionController::new(ctx.client()?);
    let profile = session
        .fetch_profile()
        .await
        .context("Session is no longer valid. Run 'authwave login' again.")?;

    output::field("ID", &profile.id.to_string());
    output::field("Email", &profile.email);
    for (key, value) in &profile.extra {
        let value = match value.as_str() {
            Some(s) => s.to_string(),
            None => value.to_string(),
        };
        output::field(key, &value);
    }

    // The probe may have renewed the pair.
    if let Some(stored) = ctx.store().load()? {
        output::field("Saved", &super::saved_at(&stored));
    }

    Ok(())
}
