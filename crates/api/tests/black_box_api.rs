use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use warden_api::app::{AppServices, build_app};
use warden_auth::{AuthorizationGate, HashingParams, PasswordHasher, TokenIssuer};
use warden_infra::InMemoryStore;

const JWT_SECRET: &str = "black-box-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over in-memory storage, bound to an ephemeral port.
        let hasher = PasswordHasher::new(HashingParams {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        })
        .expect("hasher");
        let issuer = Arc::new(TokenIssuer::new(JWT_SECRET).expect("issuer"));
        let services = AppServices::from_store(
            Arc::new(InMemoryStore::new()),
            Arc::new(hasher),
            issuer.clone(),
            Duration::from_secs(5),
        );
        let app = build_app(Arc::new(services), AuthorizationGate::new(issuer));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn register(client: &reqwest::Client, srv: &TestServer, body: Value) -> reqwest::Response {
    client.post(srv.url("/credentials")).json(&body).send().await.unwrap()
}

async fn login(client: &reqwest::Client, srv: &TestServer, body: Value) -> reqwest::Response {
    client.post(srv.url("/auth")).json(&body).send().await.unwrap()
}

/// Register alice and return (credentials id, bearer token).
async fn alice_session(client: &reqwest::Client, srv: &TestServer) -> (i64, String) {
    let res = register(
        client,
        srv,
        json!({ "username": "alice", "email": "alice@example.com", "password": "correct horse" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let id = res.json::<Value>().await.unwrap()["id"].as_i64().unwrap();

    let res = login(client, srv, json!({ "username": "alice", "password": "correct horse" })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let token = res.json::<Value>().await.unwrap()["token"].as_str().unwrap().to_string();
    (id, token)
}

fn mint_jwt(alg: Algorithm, sub: i64, expires_in: ChronoDuration) -> String {
    let now = Utc::now();
    let claims = json!({
        "sub": sub.to_string(),
        "authorized": true,
        "iat": now.timestamp(),
        "exp": (now + expires_in).timestamp(),
        "jti": uuid::Uuid::now_v7(),
    });
    jsonwebtoken::encode(
        &Header::new(alg),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn health_is_public_and_tagged_with_request_id() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.json::<Value>().await.unwrap(), json!({ "status": "ok" }));
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/roles/1", "/actions/1", "/credentials/1"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{path}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "unauthorized");
    }

    let res = client
        .post(srv.url("/roles"))
        .bearer_auth("not-a-token")
        .json(&json!({ "name": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_login_and_fetch_credentials() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (id, token) = alice_session(&client, &srv).await;

    let res = client
        .get(srv.url(&format!("/credentials/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["username"], "alice");
    assert!(body.get("password_hash").is_none());
    assert!(body.get("password").is_none());

    let res = login(&client, &srv, json!({ "email": "Alice@Example.com", "password": "correct horse" })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert!(body["expires_at"].is_string());
}

#[tokio::test]
async fn bad_password_and_unknown_user_look_the_same() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    alice_session(&client, &srv).await;

    let wrong = login(&client, &srv, json!({ "username": "alice", "password": "nope" })).await;
    let unknown = login(&client, &srv, json!({ "username": "mallory", "password": "nope" })).await;

    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json::<Value>().await.unwrap(), unknown.json::<Value>().await.unwrap());
}

#[tokio::test]
async fn registration_rejects_bad_input_and_duplicates() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    alice_session(&client, &srv).await;

    let res = register(&client, &srv, json!({ "password": "pw" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await.unwrap()["error"], "validation_error");

    let res = register(&client, &srv, json!({ "username": "bob" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = register(&client, &srv, json!({ "username": "alice", "password": "another" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await.unwrap()["error"], "conflict");

    let res = client
        .post(srv.url("/credentials"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn role_and_action_lifecycle() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (cred_id, token) = alice_session(&client, &srv).await;

    let res = client
        .post(srv.url("/roles"))
        .bearer_auth(&token)
        .json(&json!({ "name": "editor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let role_id = res.json::<Value>().await.unwrap()["id"].as_i64().unwrap();

    let role: Value = client
        .get(srv.url(&format!("/roles/{role_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(role["name"], "editor");
    assert_eq!(role["enabled"], false);
    assert_eq!(role["actions"], json!([]));

    let res = client
        .post(srv.url("/actions"))
        .bearer_auth(&token)
        .json(&json!({ "action": "write", "entity": "post" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let action_id = res.json::<Value>().await.unwrap()["id"].as_i64().unwrap();

    for _ in 0..2 {
        let res = client
            .post(srv.url(&format!("/roles/{role_id}/actions")))
            .bearer_auth(&token)
            .json(&json!({ "action_id": action_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = client
        .patch(srv.url(&format!("/roles/{role_id}")))
        .bearer_auth(&token)
        .json(&json!({ "enabled": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let role: Value = client
        .get(srv.url(&format!("/roles/{role_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(role["name"], "editor");
    assert_eq!(role["enabled"], true);
    assert_eq!(role["actions"].as_array().unwrap().len(), 1);
    assert_eq!(role["actions"][0]["entity"], "post");

    let res = client
        .post(srv.url(&format!("/credentials/{cred_id}/roles")))
        .bearer_auth(&token)
        .json(&json!({ "role_id": role_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    for _ in 0..2 {
        let res = client
            .delete(srv.url(&format!("/roles/{role_id}/actions")))
            .bearer_auth(&token)
            .json(&json!({ "action_id": action_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = client
        .delete(srv.url(&format!("/roles/{role_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(res.json::<Value>().await.unwrap()["error"], "not_implemented");
}

#[tokio::test]
async fn action_partial_update_keeps_other_fields() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, token) = alice_session(&client, &srv).await;

    let action_id = client
        .post(srv.url("/actions"))
        .bearer_auth(&token)
        .json(&json!({ "action": "read", "entity": "invoice" }))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let res = client
        .patch(srv.url(&format!("/actions/{action_id}")))
        .bearer_auth(&token)
        .json(&json!({ "entity": "receipt" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let action: Value = client
        .get(srv.url(&format!("/actions/{action_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(action["action"], "read");
    assert_eq!(action["entity"], "receipt");
    assert_eq!(action["enabled"], false);

    let res = client
        .patch(srv.url(&format!("/actions/{action_id}")))
        .bearer_auth(&token)
        .json(&json!({ "action": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ids_are_validated_and_missing_rows_are_404() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, token) = alice_session(&client, &srv).await;

    let res = client.get(srv.url("/roles/abc")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client.get(srv.url("/roles/999")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>().await.unwrap()["error"], "not_found");

    let res = client
        .patch(srv.url("/actions/999"))
        .bearer_auth(&token)
        .json(&json!({ "enabled": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(srv.url("/credentials/999/roles"))
        .bearer_auth(&token)
        .json(&json!({ "role_id": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn foreign_algorithm_and_expired_tokens_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (id, _) = alice_session(&client, &srv).await;

    // Same secret, weaker algorithm.
    let hs256 = mint_jwt(Algorithm::HS256, id, ChronoDuration::minutes(10));
    let res = client
        .get(srv.url(&format!("/credentials/{id}")))
        .bearer_auth(hs256)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let expired = mint_jwt(Algorithm::HS512, id, ChronoDuration::minutes(-1));
    let res = client
        .get(srv.url(&format!("/credentials/{id}")))
        .bearer_auth(expired)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let fresh = mint_jwt(Algorithm::HS512, id, ChronoDuration::minutes(5));
    let res = client
        .get(srv.url(&format!("/credentials/{id}")))
        .bearer_auth(fresh)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
