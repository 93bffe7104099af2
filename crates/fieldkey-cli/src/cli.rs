//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use fieldkey_core::ApiOrigin;

use crate::commands::{get, login, logout, refresh, status, validate};

/// Authenticated sessions for field-service APIs.
#[derive(Parser, Debug)]
#[command(name = "fieldkey")]
#[command(author, version = env!("FIELDKEY_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub session: SessionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the API lives and where the session is kept.
#[derive(Args, Debug)]
pub struct SessionArgs {
    /// API base URL; bearer tokens are only sent to this host
    #[arg(long, env = "FIELDKEY_API_URL", global = true)]
    pub api_url: Option<ApiOrigin>,

    /// Base URL of the login/refresh/validate/logout endpoints [default: API URL]
    #[arg(long, env = "FIELDKEY_IDENTITY_URL", global = true)]
    pub identity_url: Option<ApiOrigin>,

    /// Use stored tokens without checking their expiry (development only)
    #[arg(long, env = "FIELDKEY_DISABLE_EXPIRY", global = true)]
    pub disable_expiry: bool,

    /// Session file location [default: platform data directory]
    #[arg(long, env = "FIELDKEY_SESSION_FILE", global = true)]
    pub session_file: Option<PathBuf>,

    /// Keep the session in the OS keychain instead of a file (needs the `keyring` feature)
    #[arg(
        long,
        env = "FIELDKEY_USE_KEYRING",
        global = true,
        conflicts_with = "session_file"
    )]
    pub keyring: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with a username and password
    Login(login::LoginArgs),

    /// Show whether a session is active
    Status(status::StatusArgs),

    /// Exchange the refresh token for a new access token
    Refresh(refresh::RefreshArgs),

    /// Ask the backend whether the session is still accepted
    Validate(validate::ValidateArgs),

    /// Revoke the session and forget it locally
    Logout(logout::LogoutArgs),

    /// Send an authenticated GET request
    Get(get::GetArgs),
}
