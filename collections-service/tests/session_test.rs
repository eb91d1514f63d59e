//! Login, logout and password reset.

mod common;

use axum::http::StatusCode;
use collections_service::services::memory::FailPoint;
use collections_service::services::{DataStore, MockExtractor};
use common::{test_config, StubIdentity, TestApp, ACCOUNTS_UID, COLLECTOR_UID};
use serde_json::json;
use std::sync::Arc;

async fn app_with_accounts() -> TestApp {
    let identity = StubIdentity::default()
        .with_account("accounts-1@distrifin.test", ACCOUNTS_UID, "s3cret")
        .with_account("stranger@example.com", "uid-unknown", "pw");
    TestApp::spawn_with(test_config(), Arc::new(MockExtractor::default()), identity).await
}

#[tokio::test]
async fn login_returns_profile_pages_and_token() {
    let app = app_with_accounts().await;

    let (status, body) = app
        .post_json(
            "",
            "/auth/login",
            json!({ "email": "accounts-1@distrifin.test", "password": "s3cret" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["user"]["role"], "ACCOUNTS");
    assert_eq!(body["pages"], json!(["CHEQUES", "RECONCILIATION", "LEDGER", "REPORTS"]));
    assert_eq!(body["id_token"], format!("token-{}", ACCOUNTS_UID));

    let audit = app.store.list_audit_logs().await.unwrap();
    assert_eq!(audit[0].action.as_str(), "LOGIN");
    assert_eq!(audit[0].performed_by, ACCOUNTS_UID);
}

#[tokio::test]
async fn unknown_profile_falls_back_to_collector() {
    let app = app_with_accounts().await;

    let (status, body) = app
        .post_json("", "/auth/login", json!({ "email": "stranger@example.com", "password": "pw" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "stranger");
    assert_eq!(body["user"]["role"], "COLLECTOR");
    assert_eq!(body["pages"], json!(["DASHBOARD", "COLLECTIONS", "CUSTOMERS"]));
}

#[tokio::test]
async fn fallback_profile_is_usable_after_login() {
    let app = app_with_accounts().await;

    let (status, body) = app
        .post_json("", "/auth/login", json!({ "email": "stranger@example.com", "password": "pw" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let uid = body["user"]["uid"].as_str().unwrap().to_string();

    let (collections, _) = app.get(&uid, "/collections").await;
    let (me, profile) = app.get(&uid, "/me").await;
    let (ledger, _) = app.get(&uid, "/ledger").await;

    assert_eq!(collections, StatusCode::OK);
    assert_eq!(me, StatusCode::OK);
    assert_eq!(profile["user"]["role"], "COLLECTOR");
    assert_eq!(ledger, StatusCode::FORBIDDEN);
    let stored = app.store.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(stored.email, "stranger@example.com");
}

#[tokio::test]
async fn unsaved_fallback_profile_is_reported() {
    let app = app_with_accounts().await;
    app.store.fail_on(FailPoint::SaveUser);

    let (status, body) = app
        .post_json("", "/auth/login", json!({ "email": "stranger@example.com", "password": "pw" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["warnings"][0].as_str().unwrap().contains("stranger@example.com"));
    assert!(app.store.get_user("uid-unknown").await.unwrap().is_none());
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = app_with_accounts().await;

    let (status, _) = app
        .post_json(
            "",
            "/auth/login",
            json!({ "email": "accounts-1@distrifin.test", "password": "nope" }),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(app.store.list_audit_logs().await.unwrap().is_empty());
}

#[tokio::test]
async fn password_reset_sends_email_and_audits() {
    let app = app_with_accounts().await;

    let (status, _) = app
        .post_json("", "/auth/password-reset", json!({ "email": "Accounts-1@distrifin.test" }))
        .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(
        app.identity.resets_sent.lock().unwrap().as_slice(),
        ["accounts-1@distrifin.test".to_string()]
    );
    let audit = app.store.list_audit_logs().await.unwrap();
    assert_eq!(audit[0].action.as_str(), "PASSWORD_RESET");
    assert_eq!(audit[0].performed_by, ACCOUNTS_UID);
}

#[tokio::test]
async fn logout_is_audited() {
    let app = app_with_accounts().await;

    let (status, _) = app.post_json(COLLECTOR_UID, "/auth/logout", json!({})).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    let audit = app.store.list_audit_logs().await.unwrap();
    assert_eq!(audit[0].details, "User logged out");
}

#[tokio::test]
async fn me_requires_a_known_user() {
    let app = app_with_accounts().await;

    let (missing, _) = app.get("", "/me").await;
    let (known, body) = app.get(COLLECTOR_UID, "/me").await;

    assert_eq!(missing, StatusCode::UNAUTHORIZED);
    assert_eq!(known, StatusCode::OK);
    assert_eq!(body["user"]["uid"], COLLECTOR_UID);
}
