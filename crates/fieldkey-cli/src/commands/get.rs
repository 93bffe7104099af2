//! Get command implementation.

use anyhow::{Context as _, Result, bail};
use clap::Args;
use reqwest::{Method, Request};

use fieldkey_http::HttpSend;

use crate::context::Context;

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Absolute URL, or a path relative to the API URL
    pub url: String,
}

pub async fn run(args: GetArgs, ctx: &Context) -> Result<()> {
    let url = if args.url.starts_with('/') {
        ctx.config()?.api_base.endpoint(&args.url)
    } else {
        args.url
    };
    let url = url
        .parse::<reqwest::Url>()
        .with_context(|| format!("Invalid URL: {}", url))?;

    let transport = ctx.transport()?;
    let response = transport
        .send(Request::new(Method::GET, url))
        .await
        .context("Request failed")?;

    let status = response.status();
    eprintln!("{:?} {}", response.version(), status);
    let body = response.text().await.context("Failed to read response body")?;
    println!("{}", body);

    if !status.is_success() {
        bail!("Server answered {}", status);
    }
    Ok(())
}
