//! Validated value types.
//!
//! These types enforce their invariants at construction time.

mod api_origin;

pub use api_origin::ApiOrigin;
