//! Builds the session layer from command-line arguments.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use tracing::debug;

use fieldkey_core::SessionStore;
use fieldkey_http::{CredentialedTransport, SessionConfig, SessionManager};
use fieldkey_store::FileSessionStore;

use crate::cli::SessionArgs;

/// Everything a command needs: configuration plus one session manager
/// shared by every request in this run.
pub struct Context {
    config: Option<SessionConfig>,
    manager: Option<Arc<SessionManager>>,
}

impl Context {
    pub fn from_args(args: &SessionArgs) -> Result<Self> {
        let Some(api_url) = args.api_url.clone() else {
            return Ok(Self {
                config: None,
                manager: None,
            });
        };

        let mut config = SessionConfig::new(api_url).with_honor_expiry(!args.disable_expiry);
        config = config.with_user_agent(concat!("fieldkey-cli/", env!("FIELDKEY_VERSION")));
        if let Some(identity) = args.identity_url.clone() {
            config = config.with_identity_base(identity);
        }

        let store = open_store(args)?;
        let manager = SessionManager::new(&config, store).context("Failed to set up session")?;

        Ok(Self {
            config: Some(config),
            manager: Some(Arc::new(manager)),
        })
    }

    pub fn config(&self) -> Result<&SessionConfig> {
        self.config
            .as_ref()
            .context("No API URL. Pass --api-url or set FIELDKEY_API_URL.")
    }

    pub fn manager(&self) -> Result<&Arc<SessionManager>> {
        self.manager
            .as_ref()
            .context("No API URL. Pass --api-url or set FIELDKEY_API_URL.")
    }

    /// A reqwest-backed transport that carries the session's bearer token.
    pub fn transport(&self) -> Result<CredentialedTransport> {
        let config = self.config()?;
        let client = config.http_client().context("Failed to build HTTP client")?;
        Ok(CredentialedTransport::from_config(
            client,
            Arc::clone(self.manager()?),
            config,
        ))
    }
}

fn open_store(args: &SessionArgs) -> Result<Arc<dyn SessionStore>> {
    if args.keyring {
        #[cfg(feature = "keyring")]
        {
            debug!("Using OS keychain for session storage");
            return Ok(Arc::new(fieldkey_store::KeyringSessionStore::default()));
        }
        #[cfg(not(feature = "keyring"))]
        anyhow::bail!("This build has no keychain support; rebuild with --features keyring");
    }

    let path = match &args.session_file {
        Some(path) => path.clone(),
        None => default_session_path()?,
    };
    debug!(path = %path.display(), "Using session file");
    Ok(Arc::new(FileSessionStore::new(path)))
}

fn default_session_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "fieldkey").context("Could not determine data directory")?;

    let data_dir = dirs.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data directory")?;

    Ok(data_dir.join("session.json"))
}
