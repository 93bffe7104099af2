//! Identity backend client.
//!
//! This module provides the HTTP client for the login, refresh, validate and
//! logout endpoints.

mod client;
mod endpoints;

pub use client::IdentityClient;
pub use endpoints::{LoginResponse, RefreshResponse};
