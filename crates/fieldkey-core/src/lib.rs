//! fieldkey-core - Core types and traits for the authenticated-session layer.
//!
//! This crate holds everything the session manager, the credentialed
//! transport and the storage backends agree on: the error taxonomy, the
//! token newtypes, the in-memory [`Session`] model, the persisted key names
//! and the [`SessionStore`] / [`Clock`] seams.

pub mod credentials;
pub mod error;
pub mod session;
pub mod tokens;
pub mod traits;
pub mod types;

pub use credentials::Credentials;
pub use error::Error;
pub use session::{Session, SessionStatus, UserProfile, keys};
pub use tokens::{AccessToken, RefreshToken};
pub use traits::{Clock, ManualClock, SessionStore, SystemClock};
pub use types::ApiOrigin;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
