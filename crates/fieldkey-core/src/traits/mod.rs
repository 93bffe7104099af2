//! Seams through which the session layer reaches its collaborators.

mod clock;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::SessionStore;
