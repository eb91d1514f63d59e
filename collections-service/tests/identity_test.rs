//! Identity Toolkit client against a mocked REST endpoint.

use collections_service::services::identity::{IdentityError, IdentityProvider};
use collections_service::services::{IdentityConfig, IdentityToolkitClient};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> IdentityToolkitClient {
    IdentityToolkitClient::new(IdentityConfig {
        api_key: Some("web-key".to_string()),
        api_base: server.uri(),
    })
    .unwrap()
}

#[tokio::test]
async fn sign_in_returns_uid_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:signInWithPassword"))
        .and(query_param("key", "web-key"))
        .and(body_partial_json(json!({ "email": "jane@example.com", "returnSecureToken": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "localId": "uid-42",
            "email": "jane@example.com",
            "idToken": "id-token",
            "displayName": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    let signed_in = client(&server).sign_in("jane@example.com", "secret").await.unwrap();

    assert_eq!(signed_in.uid, "uid-42");
    assert_eq!(signed_in.id_token, "id-token");
    assert_eq!(signed_in.display_name, None);
}

#[tokio::test]
async fn bad_password_maps_to_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "INVALID_LOGIN_CREDENTIALS" }
        })))
        .mount(&server)
        .await;

    let result = client(&server).sign_in("jane@example.com", "wrong").await;

    assert!(matches!(result, Err(IdentityError::InvalidCredentials)));
}

#[tokio::test]
async fn provisioning_signs_up_with_a_temporary_password() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:signUp"))
        .and(body_partial_json(json!({ "email": "new@example.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "localId": "uid-new" })))
        .expect(1)
        .mount(&server)
        .await;

    let uid = client(&server).create_account("new@example.com").await.unwrap();
    assert_eq!(uid, "uid-new");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["password"].as_str().unwrap().len(), 24);
}

#[tokio::test]
async fn existing_email_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:signUp"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "EMAIL_EXISTS" }
        })))
        .mount(&server)
        .await;

    let result = client(&server).create_account("taken@example.com").await;

    assert!(matches!(result, Err(IdentityError::EmailExists)));
}

#[tokio::test]
async fn password_reset_sends_oob_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:sendOobCode"))
        .and(body_partial_json(json!({ "requestType": "PASSWORD_RESET", "email": "jane@example.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "email": "jane@example.com" })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).send_password_reset("jane@example.com").await.unwrap();
}

#[tokio::test]
async fn missing_key_is_not_configured() {
    let client = IdentityToolkitClient::new(IdentityConfig {
        api_key: None,
        api_base: "http://127.0.0.1:9".to_string(),
    })
    .unwrap();

    let result = client.sign_in("jane@example.com", "secret").await;

    assert!(matches!(result, Err(IdentityError::NotConfigured)));
}
