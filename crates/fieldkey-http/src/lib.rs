//! fieldkey-http - Authenticated sessions over HTTP.
//!
//! [`SessionManager`] acquires, caches, refreshes and persists bearer
//! credentials against the identity backend. [`CredentialedTransport`] sits in
//! front of any [`HttpSend`] and attaches the current token to requests bound
//! for the configured API host, refreshing and retrying once on 401.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use fieldkey_http::{CredentialedTransport, HttpSend, SessionConfig, SessionManager};
//! use fieldkey_store::MemorySessionStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::new("https://api.example.com".parse()?);
//! let manager = Arc::new(SessionManager::new(&config, Arc::new(MemorySessionStore::new()))?);
//!
//! if manager.authenticate("tech01", "hunter2").await {
//!     let transport = CredentialedTransport::from_config(config.http_client()?, manager, &config);
//!     let request = reqwest::Request::new(
//!         reqwest::Method::GET,
//!         "https://api.example.com/equipment".parse()?,
//!     );
//!     let response = transport.send(request).await?;
//!     println!("{}", response.status());
//! }
//! # Ok(())
//! # }
//! ```

mod buffered;
pub mod config;
pub mod identity;
pub mod manager;
pub mod send;
pub mod transport;

pub use config::SessionConfig;
pub use identity::IdentityClient;
pub use manager::SessionManager;
pub use send::HttpSend;
pub use transport::CredentialedTransport;
