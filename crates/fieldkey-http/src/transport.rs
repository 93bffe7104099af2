//! Bearer-token interceptor in front of an [`HttpSend`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::{Request, Response, ResponseBuilderExt, StatusCode};
use tracing::{debug, instrument, warn};
use url::Url;

use fieldkey_core::error::{InvalidInputError, TransportError};
use fieldkey_core::{AccessToken, ApiOrigin};

use crate::buffered::BufferedRequest;
use crate::config::SessionConfig;
use crate::manager::SessionManager;
use crate::send::HttpSend;

/// Wraps a transport so that requests to the API host carry the current
/// access token, and a 401 triggers one refresh followed by one retry.
///
/// Tokens are only attached when the request host equals the API host. If the
/// API host could not be resolved at construction, no request ever gets a
/// token.
///
/// The transport holds no locks of its own. Concurrent 401s all queue on the
/// session manager's refresh gate, which lets only one of them reach the
/// network; the rest retry with the token it produced.
pub struct CredentialedTransport<S = reqwest::Client> {
    inner: S,
    session: Arc<SessionManager>,
    api_origin: Option<ApiOrigin>,
}

impl<S: HttpSend> CredentialedTransport<S> {
    /// Wrap `inner`, attaching tokens only for `api_base`'s host.
    pub fn new(inner: S, session: Arc<SessionManager>, api_base: &str) -> Self {
        let api_origin = match ApiOrigin::new(api_base) {
            Ok(origin) => Some(origin),
            Err(e) => {
                warn!(error = %e, "API origin unusable; bearer tokens will never be attached");
                None
            }
        };

        Self {
            inner,
            session,
            api_origin,
        }
    }

    pub fn from_config(inner: S, session: Arc<SessionManager>, config: &SessionConfig) -> Self {
        Self {
            inner,
            session,
            api_origin: Some(config.api_base.clone()),
        }
    }

    /// Returns the host that receives tokens, if one was resolved.
    pub fn api_host(&self) -> Option<&str> {
        self.api_origin.as_ref().map(ApiOrigin::host)
    }

    /// Whether a request to `url` may carry the bearer token.
    fn may_attach(&self, url: &Url) -> bool {
        self.api_origin
            .as_ref()
            .is_some_and(|origin| origin.matches_host(url))
    }

    /// The token to present on a request to `url`, if any.
    async fn token_for(&self, url: &Url) -> Option<AccessToken> {
        if !self.may_attach(url) {
            return None;
        }
        self.session.get_valid_access_token().await
    }
}

#[async_trait]
impl<S: HttpSend> HttpSend for CredentialedTransport<S> {
    #[instrument(
        skip_all,
        fields(method = %request.method(), host = request.url().host_str().unwrap_or(""))
    )]
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let buffered = BufferedRequest::capture(request).await?;

        let sent = self.token_for(buffered.url()).await;
        let authorization = sent.as_ref().and_then(bearer_value);
        let response = self.inner.send(buffered.build(authorization)).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        drop(response);

        debug!("Request unauthorized; refreshing session before one retry");
        if !self.session.refresh_replacing(sent.as_ref()).await {
            return Ok(unauthorized(buffered.url()));
        }

        let Some(token) = self.session.get_valid_access_token().await else {
            return Ok(unauthorized(buffered.url()));
        };
        let authorization = if self.may_attach(buffered.url()) {
            bearer_value(&token)
        } else {
            None
        };

        match self.inner.send(buffered.build(authorization)).await {
            Ok(response) => Ok(response),
            Err(e) => {
                warn!(error = %e, "Retry after refresh failed to send");
                Ok(unauthorized(buffered.url()))
            }
        }
    }
}

fn bearer_value(token: &AccessToken) -> Option<HeaderValue> {
    match HeaderValue::from_str(&token.bearer()) {
        Ok(mut value) => {
            value.set_sensitive(true);
            Some(value)
        }
        Err(e) => {
            let error = InvalidInputError::HeaderValue {
                reason: e.to_string(),
            };
            warn!(%error, "Access token cannot be sent as a header");
            None
        }
    }
}

/// A locally produced 401 for requests that could not be re-authorized.
fn unauthorized(url: &Url) -> Response {
    let built = http::Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .url(url.clone())
        .body(Vec::<u8>::new());

    match built {
        Ok(response) => Response::from(response),
        Err(_) => {
            let mut response = http::Response::new(Vec::<u8>::new());
            *response.status_mut() = StatusCode::UNAUTHORIZED;
            Response::from(response)
        }
    }
}

impl<S> std::fmt::Debug for CredentialedTransport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialedTransport")
            .field("api_host", &self.api_origin.as_ref().map(ApiOrigin::host))
            .field("session", &self.session)
            .finish()
    }
}
