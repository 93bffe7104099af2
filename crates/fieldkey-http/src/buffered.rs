//! Replayable copy of an outgoing request.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::BodyExt;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Body, Method, Request, Version};
use url::Url;

use fieldkey_core::error::TransportError;

/// A request whose body has been read into memory so it can be sent more
/// than once. The original body stream is consumed exactly once, in
/// [`BufferedRequest::capture`].
#[derive(Debug)]
pub(crate) struct BufferedRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    timeout: Option<Duration>,
    version: Version,
}

impl BufferedRequest {
    pub(crate) async fn capture(mut request: Request) -> Result<Self, TransportError> {
        let body = match request.body_mut().take() {
            Some(body) => Some(read_body(body).await?),
            None => None,
        };

        Ok(Self {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
            body,
            timeout: request.timeout().copied(),
            version: request.version(),
        })
    }

    pub(crate) fn url(&self) -> &Url {
        &self.url
    }

    /// Build a fresh request, setting `Authorization` when a value is given.
    pub(crate) fn build(&self, authorization: Option<HeaderValue>) -> Request {
        let mut request = Request::new(self.method.clone(), self.url.clone());
        *request.headers_mut() = self.headers.clone();
        if let Some(value) = authorization {
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        if let Some(ref body) = self.body {
            *request.body_mut() = Some(Body::from(body.clone()));
        }
        *request.timeout_mut() = self.timeout;
        *request.version_mut() = self.version;
        request
    }
}

async fn read_body(body: Body) -> Result<Bytes, TransportError> {
    if let Some(bytes) = body.as_bytes() {
        return Ok(Bytes::copy_from_slice(bytes));
    }

    let collected = body.collect().await.map_err(|e| TransportError::Body {
        message: e.to_string(),
    })?;
    Ok(collected.to_bytes())
}
