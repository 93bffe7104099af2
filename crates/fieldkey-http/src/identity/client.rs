//! HTTP client for the identity backend.

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, trace, warn};

use fieldkey_core::error::{Error, ProtocolError};
use fieldkey_core::{AccessToken, ApiOrigin, Credentials, RefreshToken};

use super::endpoints::{
    ErrorResponse, LOGIN, LOGOUT, LoginRequest, LoginResponse, LogoutRequest, REFRESH,
    RefreshRequest, RefreshResponse, VALIDATE, ValidateRequest,
};

/// Talks to the login, refresh, validate and logout endpoints.
///
/// These calls never carry a bearer header; the tokens travel in the JSON
/// bodies as the backend expects.
#[derive(Debug, Clone)]
pub struct IdentityClient {
    client: reqwest::Client,
    base: ApiOrigin,
}

impl IdentityClient {
    /// Create a client for the given identity base using an existing
    /// reqwest client (and its connection pool).
    pub fn new(client: reqwest::Client, base: ApiOrigin) -> Self {
        Self { client, base }
    }

    /// Returns the identity base this client is configured for.
    pub fn base(&self) -> &ApiOrigin {
        &self.base
    }

    /// Exchange credentials for a token pair.
    #[instrument(skip(self, credentials), fields(base = %self.base, username = %credentials.username()))]
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, Error> {
        let request = LoginRequest {
            username: credentials.username(),
            password: credentials.password(),
        };

        let response: LoginResponse = self.post(LOGIN, &request).await?;
        Self::ensure_token(&response.access_token)?;

        if let Some(token_type) = response.token_type.as_deref()
            && !token_type.eq_ignore_ascii_case("bearer")
        {
            warn!(token_type, "Unexpected token type; treating as bearer");
        }

        Ok(response)
    }

    /// Exchange a refresh token for a new access token.
    #[instrument(skip(self, refresh_token), fields(base = %self.base))]
    pub async fn refresh(&self, refresh_token: &RefreshToken) -> Result<RefreshResponse, Error> {
        let request = RefreshRequest {
            refresh_token: refresh_token.as_str(),
        };

        let response: RefreshResponse = self.post(REFRESH, &request).await?;
        Self::ensure_token(&response.access_token)?;
        Ok(response)
    }

    /// Ask the backend whether an access token is still accepted.
    #[instrument(skip(self, token), fields(base = %self.base))]
    pub async fn validate(&self, token: &AccessToken) -> Result<(), Error> {
        let request = ValidateRequest {
            token: token.as_str(),
        };
        self.post_no_response(VALIDATE, &request).await
    }

    /// Revoke a refresh token.
    #[instrument(skip(self, refresh_token), fields(base = %self.base))]
    pub async fn logout(&self, refresh_token: &RefreshToken) -> Result<(), Error> {
        let request = LogoutRequest {
            refresh_token: refresh_token.as_str(),
        };
        self.post_no_response(LOGOUT, &request).await
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, Error>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = self.base.endpoint(path);
        debug!(%url, "Identity request");

        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        trace!(status = %status, "Identity response");

        if status.is_success() {
            Ok(response.json::<R>().await?)
        } else {
            Err(Error::Protocol(Self::parse_error_response(response).await))
        }
    }

    async fn post_no_response<B: Serialize>(&self, path: &str, body: &B) -> Result<(), Error> {
        let url = self.base.endpoint(path);
        debug!(%url, "Identity request (no response body)");

        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        trace!(status = %status, "Identity response");

        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Protocol(Self::parse_error_response(response).await))
        }
    }

    async fn parse_error_response(response: reqwest::Response) -> ProtocolError {
        let status = response.status().as_u16();

        match response.json::<ErrorResponse>().await {
            Ok(body) => ProtocolError::new(status, body.message.or(body.error)),
            Err(_) => ProtocolError::new(status, None),
        }
    }

    fn ensure_token(token: &str) -> Result<(), Error> {
        if token.trim().is_empty() {
            let message = "response carried an empty access token".to_string();
            return Err(ProtocolError::new(200, Some(message)).into());
        }
        Ok(())
    }
}
