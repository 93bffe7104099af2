//! The request-sending seam.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Request, Response};

use fieldkey_core::error::TransportError;

/// Sends a fully built request and yields the response.
///
/// Implemented by [`reqwest::Client`] and by
/// [`CredentialedTransport`](crate::CredentialedTransport), which makes the
/// latter a drop-in replacement for the former.
#[async_trait]
pub trait HttpSend: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, TransportError>;
}

#[async_trait]
impl HttpSend for reqwest::Client {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        self.execute(request).await.map_err(TransportError::from)
    }
}

#[async_trait]
impl<T: HttpSend + ?Sized> HttpSend for Arc<T> {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        (**self).send(request).await
    }
}
