//! Login command implementation.

use anyhow::{Result, bail};
use clap::Args;

use crate::context::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account username
    #[arg(long)]
    pub username: String,

    /// Account password
    #[arg(long, env = "FIELDKEY_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn run(args: LoginArgs, ctx: &Context) -> Result<()> {
    let manager = ctx.manager()?;

    output::progress("Signing in...");
    if !manager.authenticate(&args.username, &args.password).await {
        bail!("Login failed. Check the username and password, or rerun with -v for details.");
    }

    output::success("Signed in");
    println!();
    if let Some(user) = manager.user().await {
        if let Some(name) = user.display_name.as_deref().or(user.username.as_deref()) {
            output::field("User", name);
        }
        if let Some(role) = user.role.as_deref() {
            output::field("Role", role);
        }
    }
    if let Some(expires_at) = manager.status().await.access_expires_at {
        output::field("Expires", &expires_at.to_rfc3339());
    }

    Ok(())
}
