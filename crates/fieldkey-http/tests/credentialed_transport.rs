//! Credentialed transport against mock API and identity servers.

mod common;

use std::sync::Arc;

use chrono::Duration;
use reqwest::{Method, Request, StatusCode};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;
use fieldkey_core::keys;
use fieldkey_http::{CredentialedTransport, HttpSend};
use fieldkey_store::MemorySessionStore;

fn get(url: String) -> Request {
    Request::new(Method::GET, url.parse().unwrap())
}

fn transport(server: &MockServer, h: &Harness) -> CredentialedTransport {
    CredentialedTransport::from_config(
        reqwest::Client::new(),
        Arc::clone(&h.manager),
        &config(server),
    )
}

fn live_session() -> MemorySessionStore {
    seeded_store("access-1", Some("refresh-1"), Duration::hours(1))
}

async fn mount_equipment(server: &MockServer, token: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path("/equipment"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn attaches_bearer_for_the_api_host() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/equipment"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 7 }])))
        .expect(1)
        .mount(&server)
        .await;
    let h = harness(&server, live_session());
    let transport = transport(&server, &h);

    let response = transport
        .send(get(format!("{}/equipment", server.uri())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body[0]["id"], 7);
}

#[tokio::test]
async fn never_attaches_bearer_to_other_hosts() {
    let api = MockServer::start().await;
    let elsewhere = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tiles"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&elsewhere)
        .await;
    let h = harness(&api, live_session());
    let transport = transport(&api, &h);

    let url = format!("http://localhost:{}/tiles", elsewhere.address().port());
    let response = transport.send(get(url)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let received = elsewhere.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn unusable_api_base_never_attaches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/equipment"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let h = harness(&server, live_session());
    let transport =
        CredentialedTransport::new(reqwest::Client::new(), Arc::clone(&h.manager), "not a url");
    assert_eq!(transport.api_host(), None);

    let response = transport
        .send(get(format!("{}/equipment", server.uri())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn non_401_responses_pass_through_untouched() {
    let server = MockServer::start().await;
    mount_equipment(&server, "access-1", 404).await;
    mount_refresh_status(&server, 200, 0).await;
    let h = harness(&server, live_session());

    let response = transport(&server, &h)
        .send(get(format!("{}/equipment", server.uri())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(hits(&server, "/equipment").await, 1);
}

#[tokio::test]
async fn retries_once_with_the_refreshed_token() {
    let server = MockServer::start().await;
    mount_equipment(&server, "access-1", 401).await;
    mount_equipment(&server, "access-2", 200).await;
    mount_refresh(&server, "refresh-1", "access-2", 1).await;
    let h = harness(&server, live_session());

    let response = transport(&server, &h)
        .send(get(format!("{}/equipment", server.uri())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(hits(&server, "/equipment").await, 2);
    assert_eq!(h.stored(keys::ACCESS_TOKEN).await.as_deref(), Some("access-2"));
}

#[tokio::test]
async fn second_401_is_returned_to_the_caller() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/equipment"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    mount_refresh(&server, "refresh-1", "access-2", 1).await;
    let h = harness(&server, live_session());

    let response = transport(&server, &h)
        .send(get(format!("{}/equipment", server.uri())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(hits(&server, "/equipment").await, 2);
}

#[tokio::test]
async fn failed_refresh_yields_401_without_retry() {
    let server = MockServer::start().await;
    mount_equipment(&server, "access-1", 401).await;
    mount_refresh_status(&server, 401, 1).await;
    let h = harness(&server, live_session());

    let url = format!("{}/equipment", server.uri());
    let response = transport(&server, &h).send(get(url.clone())).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.url().as_str(), url);
    assert_eq!(hits(&server, "/equipment").await, 1);
    assert!(!h.manager.is_authenticated().await);
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn anonymous_401_without_refresh_token_is_final() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/equipment"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    mount_refresh_status(&server, 200, 0).await;
    let h = harness(&server, MemorySessionStore::new());

    let response = transport(&server, &h)
        .send(get(format!("{}/equipment", server.uri())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(hits(&server, "/equipment").await, 1);
}

#[tokio::test]
async fn request_body_is_replayed_on_retry() {
    let server = MockServer::start().await;
    let order = json!({ "asset": "pump-4", "priority": "high" });
    Mock::given(method("POST"))
        .and(path("/work-orders"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/work-orders"))
        .and(header("authorization", "Bearer access-2"))
        .and(body_json(order.clone()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "refresh-1", "access-2", 1).await;
    let h = harness(&server, live_session());

    let request = reqwest::Client::new()
        .post(format!("{}/work-orders", server.uri()))
        .json(&order)
        .build()
        .unwrap();
    let response = transport(&server, &h).send(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let received = server.received_requests().await.unwrap();
    let bodies: Vec<_> = received
        .iter()
        .filter(|r| r.url.path() == "/work-orders")
        .map(|r| serde_json::from_slice::<serde_json::Value>(&r.body).unwrap())
        .collect();
    assert_eq!(bodies, vec![order.clone(), order]);
}

#[tokio::test]
async fn concurrent_401s_trigger_a_single_refresh() {
    let server = MockServer::start().await;
    mount_equipment(&server, "access-1", 401).await;
    mount_equipment(&server, "access-2", 200).await;
    mount_refresh(&server, "refresh-1", "access-2", 1).await;
    let h = harness(&server, live_session());
    let transport = Arc::new(transport(&server, &h));

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let transport = Arc::clone(&transport);
            let url = format!("{}/equipment", server.uri());
            tokio::spawn(async move { transport.send(get(url)).await })
        })
        .collect();

    for task in tasks {
        let response = task.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(hits(&server, "/refresh").await, 1);
}

#[tokio::test]
async fn works_through_an_arc_inner_transport() {
    let server = MockServer::start().await;
    mount_equipment(&server, "access-1", 200).await;
    let h = harness(&server, live_session());
    let inner: Arc<reqwest::Client> = Arc::new(reqwest::Client::new());
    let transport =
        CredentialedTransport::from_config(inner, Arc::clone(&h.manager), &config(&server));

    let response = transport
        .send(get(format!("{}/equipment", server.uri())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
