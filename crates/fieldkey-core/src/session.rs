//! In-memory session model and persisted key names.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::tokens::{AccessToken, RefreshToken};

/// Keys under which the session facts are persisted in a
/// [`SessionStore`](crate::SessionStore).
pub mod keys {
    /// The current access token.
    pub const ACCESS_TOKEN: &str = "auth.access_token";
    /// The current refresh token.
    pub const REFRESH_TOKEN: &str = "auth.refresh_token";
    /// Access token expiry, RFC 3339 in UTC.
    pub const ACCESS_EXPIRES_AT_UTC: &str = "auth.access_expires_at_utc";

    /// Every key owned by the session layer.
    pub const ALL: [&str; 3] = [ACCESS_TOKEN, REFRESH_TOKEN, ACCESS_EXPIRES_AT_UTC];
}

/// Profile of the signed-in user as returned by the login endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// The session facts held by the session manager.
///
/// The access token and its expiry only change together through
/// [`Session::set_access`]. Whether the session counts as authenticated is
/// always derived from them, never stored.
#[derive(Debug, Clone, Default)]
pub struct Session {
    access_token: Option<AccessToken>,
    refresh_token: Option<RefreshToken>,
    access_expires_at: Option<DateTime<Utc>>,
    user: Option<UserProfile>,
}

impl Session {
    /// Rebuild a session from persisted values.
    pub fn from_persisted(
        access_token: Option<AccessToken>,
        refresh_token: Option<RefreshToken>,
        access_expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            access_expires_at,
            user: None,
        }
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    pub fn refresh_token(&self) -> Option<&RefreshToken> {
        self.refresh_token.as_ref()
    }

    pub fn access_expires_at(&self) -> Option<DateTime<Utc>> {
        self.access_expires_at
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    /// True if there is nothing worth persisting or presenting.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }

    /// Replace the access token and its expiry in one step.
    pub fn set_access(&mut self, token: AccessToken, expires_at: DateTime<Utc>) {
        self.access_token = Some(token);
        self.access_expires_at = Some(expires_at);
    }

    pub fn set_refresh_token(&mut self, token: Option<RefreshToken>) {
        self.refresh_token = token;
    }

    pub fn set_user(&mut self, user: Option<UserProfile>) {
        self.user = user;
    }

    /// Forget every fact.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whether the session counts as signed in at `now`.
    ///
    /// With `honor_expiry` off, a present token is enough even when its
    /// expiry is unknown.
    pub fn is_authenticated(&self, now: DateTime<Utc>, honor_expiry: bool) -> bool {
        match (&self.access_token, self.access_expires_at) {
            (None, _) => false,
            (Some(_), _) if !honor_expiry => true,
            (Some(_), Some(expires_at)) => expires_at > now,
            (Some(_), None) => false,
        }
    }

    /// Returns the access token if it stays valid for more than `margin`.
    pub fn valid_access_token(&self, now: DateTime<Utc>, margin: Duration) -> Option<&AccessToken> {
        match (&self.access_token, self.access_expires_at) {
            (Some(token), Some(expires_at)) if expires_at - now > margin => Some(token),
            _ => None,
        }
    }

    /// Snapshot safe to show to a user: no token values.
    pub fn status(&self, now: DateTime<Utc>, honor_expiry: bool) -> SessionStatus {
        SessionStatus {
            authenticated: self.is_authenticated(now, honor_expiry),
            access_expires_at: self.access_expires_at,
            has_refresh_token: self.refresh_token.is_some(),
            user: self.user.clone(),
        }
    }
}

/// Display-safe summary of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub authenticated: bool,
    pub access_expires_at: Option<DateTime<Utc>>,
    pub has_refresh_token: bool,
    pub user: Option<UserProfile>,
}

/// Format an expiry for the store.
pub fn format_expiry(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a persisted expiry. Any ISO-8601 offset is accepted and converted
/// to UTC.
pub fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

/// Absolute expiry for a token issued at `now` that lives `lifetime_secs`.
///
/// Returns `None` for a negative lifetime or one that leaves chrono's range.
pub fn expiry_after(now: DateTime<Utc>, lifetime_secs: i64) -> Option<DateTime<Utc>> {
    if lifetime_secs < 0 {
        return None;
    }
    now.checked_add_signed(Duration::try_seconds(lifetime_secs)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn authenticated_requires_future_expiry() {
        let mut session = Session::default();
        assert!(!session.is_authenticated(at(0), true));

        session.set_access(AccessToken::new("a"), at(60));
        assert!(session.is_authenticated(at(0), true));
        assert!(!session.is_authenticated(at(60), true));
        assert!(!session.is_authenticated(at(61), true));
    }

    #[test]
    fn dev_override_accepts_unknown_expiry() {
        let session = Session::from_persisted(Some(AccessToken::new("a")), None, None);
        assert!(!session.is_authenticated(at(0), true));
        assert!(session.is_authenticated(at(0), false));
    }

    #[test]
    fn valid_token_needs_more_than_margin() {
        let mut session = Session::default();
        session.set_access(AccessToken::new("a"), at(20));
        assert!(session.valid_access_token(at(0), Duration::seconds(15)).is_some());
        assert!(session.valid_access_token(at(5), Duration::seconds(15)).is_none());
        assert!(session.valid_access_token(at(10), Duration::seconds(15)).is_none());
    }

    #[test]
    fn clear_forgets_everything() {
        let mut session = Session::default();
        session.set_access(AccessToken::new("a"), at(20));
        session.set_refresh_token(Some(RefreshToken::new("r")));
        session.set_user(Some(UserProfile::default()));
        session.clear();
        assert!(session.is_empty());
        assert!(session.access_expires_at().is_none());
        assert!(session.user().is_none());
    }

    #[test]
    fn expiry_format_parses_back() {
        let when = at(3600);
        assert_eq!(parse_expiry(&format_expiry(when)), Some(when));
        assert_eq!(
            parse_expiry("2024-05-01T10:00:00+02:00"),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap())
        );
        assert_eq!(parse_expiry("not a date"), None);
    }

    #[test]
    fn status_never_carries_tokens() {
        let mut session = Session::default();
        session.set_access(AccessToken::new("secret-access"), at(60));
        session.set_refresh_token(Some(RefreshToken::new("secret-refresh")));
        let status = session.status(at(0), true);
        assert!(status.authenticated);
        assert!(status.has_refresh_token);
        let json = serde_json::to_string(&status).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn expiry_after_rejects_out_of_range_lifetimes() {
        assert_eq!(expiry_after(at(0), 3600), Some(at(3600)));
        assert_eq!(expiry_after(at(0), 0), Some(at(0)));
        assert_eq!(expiry_after(at(0), -1), None);
        assert_eq!(expiry_after(at(0), 10_000_000_000_000), None);
        assert_eq!(expiry_after(at(0), i64::MAX), None);
    }
}
