//! Logout command implementation.

use anyhow::Result;
use clap::Args;

use crate::context::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub async fn run(_args: LogoutArgs, ctx: &Context) -> Result<()> {
    if ctx.manager()?.logout().await {
        output::success("Signed out");
    } else {
        output::warning("Signed out locally, but the server did not confirm revocation");
    }
    Ok(())
}
