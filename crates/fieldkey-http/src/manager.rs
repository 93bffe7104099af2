//! Session management for authenticated API access.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, instrument, warn};

use fieldkey_core::error::{AuthError, ProtocolError};
use fieldkey_core::session::{expiry_after, format_expiry, parse_expiry};
use fieldkey_core::{
    AccessToken, Clock, Credentials, Error, RefreshToken, Session, SessionStatus, SessionStore,
    SystemClock, UserProfile, keys,
};

use crate::config::SessionConfig;
use crate::identity::IdentityClient;

/// Owns the signed-in session for the lifetime of the process.
///
/// The manager hydrates itself from its [`SessionStore`] on first use; every
/// public operation waits for that load before touching the session, so an
/// early caller can never observe an empty session that a slower load later
/// overwrites.
///
/// At most one refresh call is in flight at a time. Callers that queue behind
/// it see the token it produced instead of issuing their own refresh.
///
/// # Cancellation
///
/// Dropping any returned future cancels the operation at its current await
/// point, including while waiting for the refresh gate.
pub struct SessionManager {
    identity: IdentityClient,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    honor_expiry: bool,
    expiry_margin: Duration,
    state: RwLock<Session>,
    /// Serializes refresh and every other writer.
    gate: Mutex<()>,
    hydrated: OnceCell<()>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshOutcome {
    Refreshed,
    /// Another caller refreshed while this one waited for the gate.
    AlreadyFresh,
}

impl SessionManager {
    /// Build a manager that talks to the configured identity backend and
    /// reads the wall clock.
    pub fn new(config: &SessionConfig, store: Arc<dyn SessionStore>) -> Result<Self, Error> {
        let identity = IdentityClient::new(config.http_client()?, config.identity_base().clone());
        Ok(Self::with_parts(config, identity, store, Arc::new(SystemClock)))
    }

    /// Build a manager from explicit collaborators.
    pub fn with_parts(
        config: &SessionConfig,
        identity: IdentityClient,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        if !config.honor_expiry {
            warn!("Token expiry checks are disabled; expired sessions will not be refreshed");
        }

        Self {
            identity,
            store,
            clock,
            honor_expiry: config.honor_expiry,
            expiry_margin: config.expiry_margin(),
            state: RwLock::new(Session::default()),
            gate: Mutex::new(()),
            hydrated: OnceCell::new(),
        }
    }

    /// Sign in with a username and password.
    ///
    /// Blank credentials are rejected without a network call. On any failure
    /// the previous session is left untouched.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> bool {
        self.hydrate().await;

        let credentials = Credentials::new(username, password);
        if credentials.is_blank() {
            warn!(error = %AuthError::BlankCredentials, "Login rejected");
            return false;
        }

        let response = match self.identity.login(&credentials).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Login failed");
                return false;
            }
        };

        let _gate = self.gate.lock().await;
        let expires_at = match self.expiry_for(response.expires_in) {
            Ok(expires_at) => expires_at,
            Err(e) => {
                warn!(error = %e, "Login response rejected");
                return false;
            }
        };
        {
            let mut state = self.write();
            state.set_access(AccessToken::new(response.access_token), expires_at);
            state.set_refresh_token(Some(RefreshToken::new(response.refresh_token)));
            state.set_user(response.user);
        }
        self.persist().await;

        info!(%expires_at, "Signed in");
        true
    }

    /// Returns an access token that stays valid beyond the safety margin,
    /// refreshing first when needed.
    ///
    /// With expiry checks disabled the stored token is returned as is.
    pub async fn get_valid_access_token(&self) -> Option<AccessToken> {
        self.hydrate().await;

        if !self.honor_expiry {
            return self.read().access_token().cloned();
        }

        let (current, stale) = {
            let state = self.read();
            (
                state
                    .valid_access_token(self.clock.now(), self.expiry_margin)
                    .cloned(),
                state.access_token().cloned(),
            )
        };
        if current.is_some() {
            return current;
        }

        debug!("Access token missing or near expiry; refreshing");
        if self.refresh_replacing(stale.as_ref()).await {
            self.read().access_token().cloned()
        } else {
            None
        }
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Concurrent callers are serialized; whoever waited while another caller
    /// refreshed gets `true` without a second network call. A 401 from the
    /// backend ends the session; any other failure leaves it as it was.
    pub async fn refresh(&self) -> bool {
        self.hydrate().await;
        let observed = self.read().access_token().cloned();
        self.refresh_replacing(observed.as_ref()).await
    }

    /// Refresh unless the access token has already moved on from `rejected`,
    /// the token the caller last used.
    #[instrument(skip_all)]
    pub(crate) async fn refresh_replacing(&self, rejected: Option<&AccessToken>) -> bool {
        self.hydrate().await;
        let _gate = self.gate.lock().await;

        match self.refresh_locked(rejected).await {
            Ok(RefreshOutcome::Refreshed) => true,
            Ok(RefreshOutcome::AlreadyFresh) => {
                debug!("Session was refreshed by another caller");
                true
            }
            Err(Error::Auth(AuthError::RefreshTokenInvalid)) => {
                warn!("Refresh token rejected; clearing session");
                self.clear_locked().await;
                false
            }
            Err(Error::Auth(AuthError::NoRefreshToken)) => {
                debug!("No refresh token available");
                false
            }
            Err(e) => {
                warn!(error = %e, "Refresh failed; keeping session for a later attempt");
                false
            }
        }
    }

    /// Ask the backend whether the session is still accepted, refreshing once
    /// if it answers 401.
    #[instrument(skip(self))]
    pub async fn validate(&self) -> bool {
        let Some(token) = self.get_valid_access_token().await else {
            return false;
        };

        match self.identity.validate(&token).await {
            Ok(()) => true,
            Err(e) if e.is_unauthorized() => {
                debug!("Access token rejected by backend; refreshing once");
                self.refresh_replacing(Some(&token)).await
            }
            Err(e) => {
                warn!(error = %e, "Validation failed");
                false
            }
        }
    }

    /// Revoke the refresh token remotely and clear the local session.
    ///
    /// Local state is always cleared. The result only says whether the remote
    /// revocation succeeded; with no refresh token there is nothing to revoke
    /// and the result is `true`.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> bool {
        self.hydrate().await;
        let _gate = self.gate.lock().await;

        let refresh_token = self.read().refresh_token().cloned();
        let Some(refresh_token) = refresh_token else {
            self.clear_locked().await;
            return true;
        };

        let revoked = match self.identity.logout(&refresh_token).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Remote logout failed; clearing local session anyway");
                false
            }
        };

        self.clear_locked().await;
        info!(revoked, "Signed out");
        revoked
    }

    /// Forget the session in memory and in the store.
    pub async fn clear(&self) {
        self.hydrate().await;
        let _gate = self.gate.lock().await;
        self.clear_locked().await;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.hydrate().await;
        self.read()
            .is_authenticated(self.clock.now(), self.honor_expiry)
    }

    /// Display-safe summary of the session.
    pub async fn status(&self) -> SessionStatus {
        self.hydrate().await;
        self.read().status(self.clock.now(), self.honor_expiry)
    }

    /// Profile from the last login in this process.
    pub async fn user(&self) -> Option<UserProfile> {
        self.hydrate().await;
        self.read().user().cloned()
    }

    async fn refresh_locked(
        &self,
        observed: Option<&AccessToken>,
    ) -> Result<RefreshOutcome, Error> {
        let in_memory = self.read().refresh_token().cloned();
        let refresh_token = match in_memory {
            Some(token) => token,
            None => self
                .recover_refresh_token()
                .await
                .ok_or(AuthError::NoRefreshToken)?,
        };

        if let Some(current) = self.current_valid_token()
            && Some(&current) != observed
        {
            return Ok(RefreshOutcome::AlreadyFresh);
        }

        let response = self.identity.refresh(&refresh_token).await.map_err(|e| {
            if e.is_unauthorized() {
                Error::Auth(AuthError::RefreshTokenInvalid)
            } else {
                e
            }
        })?;

        let expires_at = self.expiry_for(response.expires_in)?;
        {
            let mut state = self.write();
            state.set_access(AccessToken::new(response.access_token), expires_at);
            let rotated = response.refresh_token.map(RefreshToken::new);
            state.set_refresh_token(Some(rotated.unwrap_or(refresh_token)));
        }
        self.persist().await;

        info!(%expires_at, "Session refreshed");
        Ok(RefreshOutcome::Refreshed)
    }

    /// Look for a refresh token that reached the store after hydration.
    async fn recover_refresh_token(&self) -> Option<RefreshToken> {
        match self.store.get(keys::REFRESH_TOKEN).await {
            Ok(Some(raw)) if !raw.trim().is_empty() => {
                let token = RefreshToken::new(raw);
                self.write().set_refresh_token(Some(token.clone()));
                Some(token)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read refresh token from store");
                None
            }
        }
    }

    /// Absolute expiry for a freshly issued token.
    fn expiry_for(&self, expires_in: i64) -> Result<DateTime<Utc>, Error> {
        expiry_after(self.clock.now(), expires_in).ok_or_else(|| {
            let message = format!("expiresIn {} is out of range", expires_in);
            ProtocolError::new(200, Some(message)).into()
        })
    }

    fn current_valid_token(&self) -> Option<AccessToken> {
        self.read()
            .valid_access_token(self.clock.now(), self.expiry_margin)
            .cloned()
    }

    async fn hydrate(&self) {
        self.hydrated.get_or_init(|| self.load_from_store()).await;
    }

    async fn load_from_store(&self) {
        let access_token = self.load_key(keys::ACCESS_TOKEN).await.map(AccessToken::new);
        let refresh_token = self.load_key(keys::REFRESH_TOKEN).await.map(RefreshToken::new);
        let expires_at = match self.load_key(keys::ACCESS_EXPIRES_AT_UTC).await {
            Some(raw) => {
                let parsed = parse_expiry(&raw);
                if parsed.is_none() {
                    warn!("Stored access expiry is not a valid timestamp; ignoring it");
                }
                parsed
            }
            None => None,
        };

        let session = Session::from_persisted(access_token, refresh_token, expires_at);
        debug!(
            has_access_token = session.access_token().is_some(),
            has_refresh_token = session.refresh_token().is_some(),
            "Session hydrated from store"
        );
        *self.write() = session;
    }

    async fn load_key(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(e) => {
                warn!(key, error = %e, "Failed to read session store");
                None
            }
        }
    }

    /// Write the current session to the store. Failures are logged only.
    async fn persist(&self) {
        let (access_token, refresh_token, expires_at) = {
            let state = self.read();
            (
                state.access_token().map(|t| t.as_str().to_string()),
                state.refresh_token().map(|t| t.as_str().to_string()),
                state.access_expires_at().map(format_expiry),
            )
        };

        self.persist_key(keys::ACCESS_TOKEN, access_token).await;
        self.persist_key(keys::REFRESH_TOKEN, refresh_token).await;
        self.persist_key(keys::ACCESS_EXPIRES_AT_UTC, expires_at).await;
    }

    async fn persist_key(&self, key: &str, value: Option<String>) {
        let result = match value {
            Some(ref value) => self.store.set(key, value).await,
            None => self.store.remove(key).await,
        };
        if let Err(e) = result {
            warn!(key, error = %e, "Failed to persist session");
        }
    }

    async fn clear_locked(&self) {
        self.write().clear();

        for key in keys::ALL {
            if let Err(e) = self.store.remove(key).await {
                warn!(key, error = %e, "Failed to remove session key from store");
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("identity", &self.identity.base())
            .field("honor_expiry", &self.honor_expiry)
            .field("tokens", &"[REDACTED]")
            .finish()
    }
}
