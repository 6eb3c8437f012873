//! End to end: Firebase sign-in through the session manager, then an API
//! call whose bearer header comes from the session's token handle.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use httpmock::prelude::*;
use rollcall_auth::providers::{FirebaseConfig, FirebaseProvider};
use rollcall_auth::{FileStore, HttpClientBuilderExt, SessionConfig, SessionManager, TOKEN_KEY};
use rollcall_auth::KeyValueStore;
use rollcall_http::{HttpClientBuilder, HttpClientConfig};
use rollcall_utils::SecretString;
use serde_json::json;
use url::Url;

fn firebase(server: &MockServer) -> Arc<FirebaseProvider> {
    let config = FirebaseConfig {
        api_key: SecretString::new("web-key"),
        identity_url: Url::parse(&server.url("/v1")).unwrap(),
        token_url: Url::parse(&server.url("/v1")).unwrap(),
        http_config: HttpClientConfig::for_testing(),
    };
    Arc::new(FirebaseProvider::new(config).unwrap())
}

#[tokio::test]
async fn signed_in_session_authorizes_api_calls() {
    let idp = MockServer::start();
    idp.mock(|when, then| {
        when.method(POST).path("/v1/accounts:signInWithPassword");
        then.status(200).json_body(json!({
            "localId": "uid-7",
            "email": "coordinator@example.com",
            "idToken": "session-token",
            "refreshToken": "r",
            "expiresIn": "3600"
        }));
    });
    idp.mock(|when, then| {
        when.method(POST).path("/v1/accounts:lookup");
        then.status(200)
            .json_body(json!({"users": [{"emailVerified": false}]}));
    });

    let api = MockServer::start();
    let authorized = api.mock(|when, then| {
        when.method(GET)
            .path("/api.php")
            .query_param("param", "people")
            .header("authorization", "Bearer session-token");
        then.status(200).json_body(json!([]));
    });

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path()));
    let manager = SessionManager::new(firebase(&idp), store.clone(), SessionConfig::default());
    manager.start().await;
    manager
        .sign_in("coordinator@example.com", &SecretString::new("secret"))
        .await
        .unwrap();

    let client = HttpClientBuilder::new()
        .allow_insecure_http()
        .with_bearer_auth(manager.token_handle())
        .build()
        .unwrap();
    let resp = client
        .get(&format!("{}?param=people", api.url("/api.php")))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), http::StatusCode::OK);
    authorized.assert_calls(1);
    assert_eq!(
        store.get(TOKEN_KEY).await.unwrap().as_deref(),
        Some("session-token")
    );
}

#[tokio::test]
async fn signed_out_session_sends_no_header() {
    let idp = MockServer::start();
    let api = MockServer::start();
    let with_header = api.mock(|when, then| {
        when.method(GET).path("/api.php").header_exists("authorization");
        then.status(401);
    });
    let without_header = api.mock(|when, then| {
        when.method(GET).path("/api.php");
        then.status(200).json_body(json!([]));
    });

    let dir = tempfile::tempdir().unwrap();
    let manager = SessionManager::new(
        firebase(&idp),
        Arc::new(FileStore::new(dir.path())),
        SessionConfig::default(),
    );
    manager.start().await;

    let client = HttpClientBuilder::new()
        .allow_insecure_http()
        .with_bearer_auth(manager.token_handle())
        .build()
        .unwrap();
    let resp = client.get(&api.url("/api.php")).send().await.unwrap();

    assert_eq!(resp.status(), http::StatusCode::OK);
    with_header.assert_calls(0);
    without_header.assert_calls(1);
}
