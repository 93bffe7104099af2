//! Refresh command implementation.

use anyhow::{Result, bail};
use clap::Args;

use crate::context::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct RefreshArgs {}

pub async fn run(_args: RefreshArgs, ctx: &Context) -> Result<()> {
    let manager = ctx.manager()?;

    output::progress("Refreshing session...");
    if !manager.refresh().await {
        if manager.status().await.has_refresh_token {
            bail!("Refresh failed; the session was kept. Try again later.");
        }
        bail!("No usable session. Run 'fieldkey login' first.");
    }

    output::success("Session refreshed");
    if let Some(expires_at) = manager.status().await.access_expires_at {
        output::field("Expires", &expires_at.to_rfc3339());
    }

    Ok(())
}
