//! Request command implementation.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use authwave::AutoRefresh;
use authwave_core::{Error, Method, RequestDescriptor, Response};

use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    pub method: Method,

    /// Path relative to the base URL, or an absolute URL
    pub path: String,

    /// JSON request body
    #[arg(long)]
    pub data: Option<String>,

    /// Send without the stored token and never renew it
    #[arg(long)]
    pub no_refresh: bool,

    /// Print the response body as compact JSON
    #[arg(long)]
    pub compact: bool,
}

pub async fn run(ctx: &AppContext, args: RequestArgs) -> Result<()> {
    let mut request = RequestDescriptor::new(args.method, &args.path);
    if let Some(data) = &args.data {
        let body: Value = serde_json::from_str(data).context("--data is not valid JSON")?;
        request = request.body(body);
    }

    let auto_refresh = if args.no_refresh {
        AutoRefresh::Disabled
    } else {
        AutoRefresh::Enabled
    };

    let client = ctx.client()?;
    let failed = || format!("{} {} failed", args.method, args.path);

    let response = match client.send_with(request, auto_refresh).await {
        Ok(response) => response,
        Err(Error::RequestFailed(failure)) => {
            output::status(failure.status, failure.reason.as_deref());
            if let Some(data) = &failure.data {
                output::body(data, args.compact)?;
            }
            return Err(failure).with_context(failed);
        }
        Err(e) => return Err(e).with_context(failed),
    };

    print_response(&response, args.compact)
}

fn print_response(response: &Response, compact: bool) -> Result<()> {
    output::status(response.status(), response.reason());

    match response.json_value() {
        Some(value) => output::body(&value, compact),
        None => {
            let text = response.text();
            if !text.is_empty() {
                println!("{}", text);
            }
            Ok(())
        }
    }
}
