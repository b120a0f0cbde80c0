//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;

use authwave::SessionController;
use authwave_core::Credentials;

use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long, env = "AUTHWAVE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn run(ctx: &AppContext, args: LoginArgs) -> Result<()> {
    let session = SessionController::new(ctx.client()?);
    let credentials = Credentials::new(&args.email, &args.password);

    output::progress("Logging in...");

    session
        .login(&credentials)
        .await
        .context("Failed to login")?;

    output::success("Logged in successfully");
    println!();
    output::field("Email", &args.email);
    output::field("Session file", &ctx.store().path().display().to_string());

    Ok(())
}
