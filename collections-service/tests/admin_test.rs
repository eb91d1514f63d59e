//! Customers, routes, users, settings and ledger maintenance.

mod common;

use axum::http::StatusCode;
use collections_service::services::memory::FailPoint;
use collections_service::services::DataStore;
use common::{TestApp, ACCOUNTS_UID, ADMIN_UID, COLLECTOR_UID};
use serde_json::json;

#[tokio::test]
async fn create_customer_uses_settings_defaults() {
    let app = TestApp::spawn().await;
    app.put_json(
        ADMIN_UID,
        "/settings",
        json!({ "default_credit_limit": "25000", "default_credit_period": 14 }),
    )
    .await;

    let (status, customer) = app
        .post_json(
            COLLECTOR_UID,
            "/customers",
            json!({ "business_name": "Lanka Traders", "phone_number": "0711111111" }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{}", customer);
    assert_eq!(customer["customer_name"], "Lanka Traders");
    assert_eq!(customer["credit_limit"], "25000");
    assert_eq!(customer["credit_period_days"], 14);
    assert_eq!(customer["created_by"], COLLECTOR_UID);
}

#[tokio::test]
async fn customer_requires_business_name_and_phone() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post_json(COLLECTOR_UID, "/customers", json!({ "business_name": "", "phone_number": "" }))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);
    assert!(app.store.list_customers().await.unwrap().is_empty());
}

#[tokio::test]
async fn update_and_soft_delete_customer() {
    let app = TestApp::spawn().await;
    app.seed_customer("C1", "Acme Store", "").await;

    let (status, updated) = app
        .put_json(
            COLLECTOR_UID,
            "/customers/C1",
            json!({ "business_name": "Acme Stores", "phone_number": "0770000000", "route_id": "R1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["business_name"], "Acme Stores");
    assert_eq!(updated["credit_limit"], "100000");

    let (status, _) = app.delete(COLLECTOR_UID, "/customers/C1").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, listed) = app.get(COLLECTOR_UID, "/customers").await;
    assert!(listed.as_array().unwrap().is_empty());
    assert!(app.store.get_customer("C1").await.unwrap().unwrap().deleted);

    let (status, _) = app.delete(COLLECTOR_UID, "/customers/C1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn import_resolves_routes_and_skips_incomplete_rows() {
    let app = TestApp::spawn().await;
    app.seed_route("R-7", "Kandy North").await;

    let csv = "Business Name;Customer Name;Route;Phone Number;Credit Limit\n\
               Acme Store;Jane Doe;kandy north;0771234567;\n\
               No Phone Ltd;;R-7;;1000\n\
               Beta Mart;;R-7;0719999999;5000\n";
    let (status, summary) = app.post_text(COLLECTOR_UID, "/customers/import", csv).await;

    assert_eq!(status, StatusCode::CREATED, "{}", summary);
    assert_eq!(summary["imported"], 2);
    assert_eq!(summary["skipped_rows"], json!([2]));

    let customers = app.store.list_customers().await.unwrap();
    assert_eq!(customers.len(), 2);
    assert!(customers.iter().all(|c| c.route_id == "R-7"));
    let acme = customers.iter().find(|c| c.business_name == "Acme Store").unwrap();
    assert_eq!(acme.credit_limit.to_string(), "50000");

    let audit = app.store.list_audit_logs().await.unwrap();
    assert_eq!(audit.iter().filter(|l| l.action.as_str() == "IMPORT_CUSTOMERS").count(), 1);
}

#[tokio::test]
async fn positional_import_keeps_blank_route() {
    let app = TestApp::spawn().await;

    let csv = "a,b,c,d,e,f,g,h,i,j\nAcme Store,Jane Doe,,0771234567,,,,,,'\n";
    let (status, _) = app.post_text(COLLECTOR_UID, "/customers/import", csv).await;

    assert_eq!(status, StatusCode::CREATED);
    let customers = app.store.list_customers().await.unwrap();
    assert_eq!(customers[0].business_name, "Acme Store");
    assert_eq!(customers[0].customer_name, "Jane Doe");
    assert_eq!(customers[0].route_id, "");
}

#[tokio::test]
async fn stray_quote_only_skips_its_own_row() {
    let app = TestApp::spawn().await;

    let csv = "Business Name,Customer Name,Address,Phone\n\
               \"Acme Store,Jane,,0771111111\n\
               Shop B,Bob,,0772222222\n\
               Shop C,Cara,,0773333333\n";
    let (status, summary) = app.post_text(COLLECTOR_UID, "/customers/import", csv).await;

    assert_eq!(status, StatusCode::CREATED, "{}", summary);
    assert_eq!(summary["imported"], 2);
    assert_eq!(summary["skipped_rows"], json!([1]));
    let mut names: Vec<String> = app
        .store
        .list_customers()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.business_name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["Shop B", "Shop C"]);
}

#[tokio::test]
async fn import_without_valid_rows_writes_nothing() {
    let app = TestApp::spawn().await;

    let (only_header, _) = app.post_text(COLLECTOR_UID, "/customers/import", "Business Name,Phone\n").await;
    let (no_valid, _) = app
        .post_text(COLLECTOR_UID, "/customers/import", "Business Name,Phone\n,0771\nShop,\n")
        .await;

    assert_eq!(only_header, StatusCode::BAD_REQUEST);
    assert_eq!(no_valid, StatusCode::BAD_REQUEST);
    assert!(app.store.list_customers().await.unwrap().is_empty());
    assert!(app.store.list_audit_logs().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_bulk_insert_writes_nothing() {
    let app = TestApp::spawn().await;
    app.store.fail_on(FailPoint::InsertCustomers);

    let (status, _) = app
        .post_text(COLLECTOR_UID, "/customers/import", "Business Name,Phone\nShop,0771\n")
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.store.list_customers().await.unwrap().is_empty());
}

#[tokio::test]
async fn routes_are_created_and_listed() {
    let app = TestApp::spawn().await;

    let (status, route) = app
        .post_json(COLLECTOR_UID, "/routes", json!({ "route_name": "Galle Road" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(route["route_id"].as_str().unwrap().starts_with("R-"));

    let (_, routes) = app.get(COLLECTOR_UID, "/routes").await;
    assert_eq!(routes[0]["route_name"], "Galle Road");
}

#[tokio::test]
async fn admin_creates_user_and_sends_setup_email() {
    let app = TestApp::spawn().await;

    let (status, created) = app
        .post_json(
            ADMIN_UID,
            "/users",
            json!({ "name": "Nimal", "email": "Nimal@Example.com", "role": "ACCOUNTS", "permissions": ["LEDGER"] }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["setup_email_sent"], true);
    assert_eq!(created["user"]["email"], "nimal@example.com");
    assert_eq!(
        app.identity.resets_sent.lock().unwrap().as_slice(),
        ["nimal@example.com".to_string()]
    );

    let uid = created["user"]["uid"].as_str().unwrap();
    assert!(app.store.get_user(uid).await.unwrap().is_some());
    let audit = app.store.list_audit_logs().await.unwrap();
    assert!(audit.iter().any(|l| l.details == "Created user Nimal. Setup email sent."));
}

#[tokio::test]
async fn failed_setup_email_keeps_user() {
    let app = TestApp::spawn().await;
    *app.identity.fail_resets.lock().unwrap() = true;

    let (status, created) = app
        .post_json(ADMIN_UID, "/users", json!({ "name": "Sunil", "email": "sunil@example.com" }))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["setup_email_sent"], false);
    assert_eq!(created["user"]["role"], "COLLECTOR");
    let audit = app.store.list_audit_logs().await.unwrap();
    assert!(audit.iter().any(|l| l.details.ends_with("Setup email failed.")));
}

#[tokio::test]
async fn user_permissions_must_name_pages() {
    let app = TestApp::spawn().await;

    let (status, _) = app
        .post_json(
            ADMIN_UID,
            "/users",
            json!({ "name": "X", "email": "x@example.com", "permissions": ["BILLING"] }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.identity.accounts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn update_and_delete_users() {
    let app = TestApp::spawn().await;

    let (status, updated) = app
        .put_json(
            ADMIN_UID,
            &format!("/users/{}", COLLECTOR_UID),
            json!({ "name": "Cole C.", "email": "cole@example.com", "role": "COLLECTOR", "permissions": ["DASHBOARD", "REPORTS"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Cole C.");

    let (_, me) = app.get(COLLECTOR_UID, "/me").await;
    assert_eq!(me["pages"], json!(["DASHBOARD", "REPORTS"]));

    let (self_delete, _) = app.delete(ADMIN_UID, &format!("/users/{}", ADMIN_UID)).await;
    assert_eq!(self_delete, StatusCode::CONFLICT);

    let (status, _) = app.delete(ADMIN_UID, &format!("/users/{}", COLLECTOR_UID)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (missing, _) = app.delete(ADMIN_UID, &format!("/users/{}", COLLECTOR_UID)).await;
    assert_eq!(missing, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn settings_round_trip_and_gating() {
    let app = TestApp::spawn().await;

    let (_, defaults) = app.get(COLLECTOR_UID, "/settings").await;
    assert_eq!(defaults["currency_code"], "LKR");
    assert_eq!(defaults["enable_cheque_camera"], true);

    let (forbidden, _) = app
        .put_json(COLLECTOR_UID, "/settings", json!({ "enable_cheque_camera": false }))
        .await;
    assert_eq!(forbidden, StatusCode::FORBIDDEN);

    let (status, saved) = app
        .put_json(ADMIN_UID, "/settings", json!({ "enable_cheque_camera": false }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["enable_cheque_camera"], false);
    assert_eq!(saved["default_credit_period"], 30);
}

#[tokio::test]
async fn ledger_bulk_delete_requires_admin() {
    let app = TestApp::spawn().await;
    app.seed_customer("C1", "Acme Store", "").await;
    app.post_json(
        COLLECTOR_UID,
        "/collections",
        json!({ "customer_id": "C1", "payment_type": "Cash", "amount": "10" }),
    )
    .await;
    let (_, ledger) = app.get(ACCOUNTS_UID, "/ledger").await;
    let entry_id = ledger[0]["entry_id"].as_str().unwrap().to_string();

    let (forbidden, _) = app
        .post_json(ACCOUNTS_UID, "/ledger/bulk-delete", json!({ "entry_ids": [entry_id] }))
        .await;
    assert_eq!(forbidden, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post_json(ADMIN_UID, "/ledger/bulk-delete", json!({ "entry_ids": [entry_id] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 1);

    let (_, report) = app.get(ADMIN_UID, "/ledger/verify").await;
    assert_eq!(report["violations"][0]["violation"], "missing_collection_posting");

    let (_, audit) = app.get(ADMIN_UID, "/audit-logs").await;
    assert_eq!(audit[0]["action"], "DELETE_LEDGER_ENTRIES");
}

#[tokio::test]
async fn audit_log_is_admin_only_by_default() {
    let app = TestApp::spawn().await;

    let (collector, _) = app.get(COLLECTOR_UID, "/audit-logs").await;
    let (accounts, _) = app.get(ACCOUNTS_UID, "/audit-logs").await;
    let (admin, _) = app.get(ADMIN_UID, "/audit-logs").await;

    assert_eq!(collector, StatusCode::FORBIDDEN);
    assert_eq!(accounts, StatusCode::FORBIDDEN);
    assert_eq!(admin, StatusCode::OK);
}

#[tokio::test]
async fn audit_failures_are_reported_on_admin_writes() {
    let app = TestApp::spawn().await;
    app.seed_customer("C1", "Acme Store", "").await;
    app.store.fail_on(FailPoint::InsertAuditLog);

    let (created, route) = app
        .post_json(COLLECTOR_UID, "/routes", json!({ "route_name": "North" }))
        .await;
    let (deleted, body) = app.delete(COLLECTOR_UID, "/customers/C1").await;
    let (saved, settings) = app
        .put_json(ADMIN_UID, "/settings", json!({ "currency_code": "USD" }))
        .await;

    assert_eq!(created, StatusCode::CREATED);
    assert_eq!(route["route_name"], "North");
    assert_eq!(route["warnings"].as_array().unwrap().len(), 1);
    assert_eq!(deleted, StatusCode::OK);
    assert!(body["warnings"][0].as_str().unwrap().contains("DELETE_CUSTOMER"));
    assert!(app.store.get_customer("C1").await.unwrap().unwrap().deleted);
    assert_eq!(saved, StatusCode::OK);
    assert_eq!(settings["currency_code"], "USD");
    assert_eq!(settings["warnings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn clean_writes_carry_no_warnings() {
    let app = TestApp::spawn().await;

    let (_, route) = app
        .post_json(COLLECTOR_UID, "/routes", json!({ "route_name": "South" }))
        .await;

    assert!(route.get("warnings").is_none());
}
