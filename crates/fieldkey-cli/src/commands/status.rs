//! Status command implementation.

use anyhow::Result;
use chrono::Utc;
use clap::Args;

use crate::context::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the status as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: StatusArgs, ctx: &Context) -> Result<()> {
    let status = ctx.manager()?.status().await;

    if args.json {
        return output::json_pretty(&status);
    }

    output::field(
        "Authenticated",
        if status.authenticated { "yes" } else { "no" },
    );
    if let Some(expires_at) = status.access_expires_at {
        let remaining = expires_at - Utc::now();
        let note = if remaining.num_seconds() > 0 {
            format!("in {}m {}s", remaining.num_minutes(), remaining.num_seconds() % 60)
        } else {
            "expired".to_string()
        };
        output::field("Expires", &format!("{} ({})", expires_at.to_rfc3339(), note));
    }
    output::field(
        "Refresh token",
        if status.has_refresh_token { "present" } else { "none" },
    );
    if let Some(username) = status.user.and_then(|u| u.username) {
        output::field("User", &username);
    }

    Ok(())
}
