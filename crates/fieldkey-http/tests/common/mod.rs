#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fieldkey_core::error::StoreError;
use fieldkey_core::session::format_expiry;
use fieldkey_core::{ApiOrigin, ManualClock, SessionStore, keys};
use fieldkey_http::{IdentityClient, SessionConfig, SessionManager};
use fieldkey_store::MemorySessionStore;

/// Origin pointing at a mock server.
pub fn mock_origin(server: &MockServer) -> ApiOrigin {
    ApiOrigin::new(format!("http://127.0.0.1:{}", server.address().port())).unwrap()
}

pub fn config(server: &MockServer) -> SessionConfig {
    SessionConfig::new(mock_origin(server))
}

/// Everything a manager test needs to poke at.
pub struct Harness {
    pub manager: Arc<SessionManager>,
    pub store: Arc<MemorySessionStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn now(&self) -> DateTime<Utc> {
        use fieldkey_core::Clock;
        self.clock.now()
    }

    pub async fn stored(&self, key: &str) -> Option<String> {
        self.store.get(key).await.unwrap()
    }
}

pub fn harness(server: &MockServer, store: MemorySessionStore) -> Harness {
    harness_with_config(&config(server), store)
}

pub fn harness_with_config(config: &SessionConfig, store: MemorySessionStore) -> Harness {
    let store = Arc::new(store);
    let clock = Arc::new(ManualClock::default());
    let identity = IdentityClient::new(reqwest::Client::new(), config.identity_base().clone());
    let manager = Arc::new(SessionManager::with_parts(
        config,
        identity,
        store.clone(),
        clock.clone(),
    ));
    Harness {
        manager,
        store,
        clock,
    }
}

/// A store already holding a session that expires `expires_in` from now.
pub fn seeded_store(access: &str, refresh: Option<&str>, expires_in: Duration) -> MemorySessionStore {
    let mut entries = vec![
        (keys::ACCESS_TOKEN, access.to_string()),
        (
            keys::ACCESS_EXPIRES_AT_UTC,
            format_expiry(Utc::now() + expires_in),
        ),
    ];
    if let Some(refresh) = refresh {
        entries.push((keys::REFRESH_TOKEN, refresh.to_string()));
    }
    MemorySessionStore::with_entries(entries)
}

pub async fn mount_login(server: &MockServer, access: &str, refresh: &str, expires_in: i64) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": access,
            "refreshToken": refresh,
            "expiresIn": expires_in,
            "tokenType": "Bearer",
            "user": { "username": "tech01", "displayName": "Field Tech" }
        })))
        .mount(server)
        .await;
}

/// Mount a refresh endpoint for `refresh_token` that must be hit exactly
/// `times` times.
pub async fn mount_refresh(
    server: &MockServer,
    refresh_token: &str,
    new_access: &str,
    times: u64,
) {
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .and(body_json(json!({ "refreshToken": refresh_token })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "accessToken": new_access, "expiresIn": 3600 }))
                .set_delay(StdDuration::from_millis(100)),
        )
        .expect(times)
        .mount(server)
        .await;
}

pub async fn mount_refresh_status(server: &MockServer, status: u16, times: u64) {
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(status))
        .expect(times)
        .mount(server)
        .await;
}

/// Number of requests the server saw on `route`.
pub async fn hits(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}

/// A store whose every operation fails.
#[derive(Debug, Default)]
pub struct BrokenStore;

#[async_trait]
impl SessionStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Backend {
            message: "keychain locked".into(),
        })
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Backend {
            message: "keychain locked".into(),
        })
    }

    async fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Backend {
            message: "keychain locked".into(),
        })
    }

    async fn clear(&self) -> Result<(), StoreError> {
        Err(StoreError::Backend {
            message: "keychain locked".into(),
        })
    }
}

/// A store that answers reads slowly, to widen the hydration window.
#[derive(Debug)]
pub struct SlowStore {
    pub inner: MemorySessionStore,
    pub delay: StdDuration,
}

#[async_trait]
impl SessionStore for SlowStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.inner.clear().await
    }
}
