//! fieldkey-store - Session store backends.
//!
//! Every backend implements [`fieldkey_core::SessionStore`]:
//!
//! - [`MemorySessionStore`]: process-local, nothing survives a restart
//! - [`FileSessionStore`]: one JSON file readable only by the owner
//! - `KeyringSessionStore` (feature `keyring`): the OS credential store

mod file;
#[cfg(feature = "keyring")]
mod keychain;
mod memory;

pub use file::FileSessionStore;
#[cfg(feature = "keyring")]
pub use keychain::KeyringSessionStore;
pub use memory::MemorySessionStore;
