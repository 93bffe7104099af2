//! Validate command implementation.

use anyhow::{Result, bail};
use clap::Args;

use crate::context::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct ValidateArgs {}

pub async fn run(_args: ValidateArgs, ctx: &Context) -> Result<()> {
    if !ctx.manager()?.validate().await {
        bail!("Session is not valid");
    }

    output::success("Session is valid");
    Ok(())
}
