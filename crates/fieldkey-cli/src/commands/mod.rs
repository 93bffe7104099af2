//! Subcommand implementations.

pub mod get;
pub mod login;
pub mod logout;
pub mod refresh;
pub mod status;
pub mod validate;

use anyhow::Result;

use crate::cli::Commands;
use crate::context::Context;

pub async fn handle(command: Commands, ctx: &Context) -> Result<()> {
    match command {
        Commands::Login(args) => login::run(args, ctx).await,
        Commands::Status(args) => status::run(args, ctx).await,
        Commands::Refresh(args) => refresh::run(args, ctx).await,
        Commands::Validate(args) => validate::run(args, ctx).await,
        Commands::Logout(args) => logout::run(args, ctx).await,
        Commands::Get(args) => get::run(args, ctx).await,
    }
}
