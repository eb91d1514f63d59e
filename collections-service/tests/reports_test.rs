//! Report, dashboard and cheque register views.

mod common;

use axum::http::StatusCode;
use collections_service::services::DataStore;
use common::{TestApp, ACCOUNTS_UID, ADMIN_UID, COLLECTOR_UID};
use serde_json::{json, Value};

async fn record(app: &TestApp, customer: &str, payment_type: &str, amount: &str, cheque: Option<(&str, &str)>) -> Value {
    let mut body = json!({ "customer_id": customer, "payment_type": payment_type, "amount": amount });
    if let Some((number, realize_date)) = cheque {
        body["cheque"] = json!({ "cheque_number": number, "bank": "BOC", "realize_date": realize_date });
    }
    let (status, created) = app.post_json(COLLECTOR_UID, "/collections", body).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    created["collection"].clone()
}

async fn seeded() -> TestApp {
    let app = TestApp::spawn().await;
    app.seed_route("R1", "Colombo").await;
    app.seed_route("R2", "Kandy").await;
    app.seed_customer("C1", "Zeta Stores", "R1").await;
    app.seed_customer("C2", "Alpha Mart", "R1").await;
    app.seed_customer("C3", "Kandy Hardware", "R2").await;
    app
}

#[tokio::test]
async fn daily_report_sorts_by_customer_name() {
    let app = seeded().await;
    record(&app, "C1", "Cash", "100", None).await;
    record(&app, "C2", "QR", "300", None).await;

    let (status, rows) = app.get(ACCOUNTS_UID, "/reports/daily?sort=customer&direction=asc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows[0]["business_name"], "Alpha Mart");
    assert_eq!(rows[1]["business_name"], "Zeta Stores");

    let (_, desc) = app.get(ACCOUNTS_UID, "/reports/daily?sort=amount&direction=desc").await;
    assert_eq!(desc[0]["amount"], "300");
}

#[tokio::test]
async fn daily_report_downloads_as_csv() {
    let app = seeded().await;
    record(&app, "C1", "Cheque", "5000", Some(("001", "2026-03-01"))).await;

    let (status, body) = app.get(ACCOUNTS_UID, "/reports/daily?format=csv").await;

    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("collection_id,collection_date"));
    let row = lines.next().unwrap();
    assert!(row.contains("Zeta Stores,Cheque,Pending,001,5000"), "{}", row);
}

#[tokio::test]
async fn cheque_reports_filter_by_status() {
    let app = seeded().await;
    let pending = record(&app, "C1", "Cheque", "100", Some(("010", "2026-03-01"))).await;
    let returned = record(&app, "C2", "Cheque", "200", Some(("011", "2026-03-02"))).await;
    record(&app, "C3", "Cash", "50", None).await;
    app.post_json(
        ACCOUNTS_UID,
        "/reconciliation/confirm",
        json!({
            "statement": [{ "cheque_number": "011", "amount": "200", "status": "RETURNED" }],
            "matches": [{ "collection_id": returned["collection_id"], "bank_status": "RETURNED" }]
        }),
    )
    .await;

    let (_, pending_rows) = app.get(ACCOUNTS_UID, "/reports/cheques").await;
    let (_, returned_rows) = app.get(ACCOUNTS_UID, "/reports/cheques?status=Returned").await;
    let (bad, _) = app.get(ACCOUNTS_UID, "/reports/cheques?status=Received").await;

    assert_eq!(pending_rows.as_array().unwrap().len(), 1);
    assert_eq!(pending_rows[0]["collection_id"], pending["collection_id"]);
    assert_eq!(returned_rows[0]["collection_id"], returned["collection_id"]);
    assert_eq!(bad, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn route_summary_counts_customers_and_totals() {
    let app = seeded().await;
    record(&app, "C1", "Cash", "100", None).await;
    record(&app, "C2", "Card", "250", None).await;
    record(&app, "C3", "Cash", "75", None).await;

    let (status, first) = app.get(ACCOUNTS_UID, "/reports/routes?sort=total&direction=desc").await;
    let (_, second) = app.get(ACCOUNTS_UID, "/reports/routes?sort=total&direction=desc").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(first[0]["route_name"], "Colombo");
    assert_eq!(first[0]["customer_count"], 2);
    assert_eq!(first[0]["total"], "350");
    assert_eq!(first[1]["total"], "75");
}

#[tokio::test]
async fn cheque_register_defaults_to_latest_realize_date() {
    let app = seeded().await;
    record(&app, "C1", "Cheque", "100", Some(("020", "2026-03-01"))).await;
    record(&app, "C2", "Cheque", "200", Some(("021", "2026-04-01"))).await;

    let (status, register) = app.get(ACCOUNTS_UID, "/cheques").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(register[0]["cheque"]["cheque_number"], "021");

    let (_, by_number) = app.get(ACCOUNTS_UID, "/cheques?sort=cheque_number").await;
    assert_eq!(by_number[0]["cheque"]["cheque_number"], "020");

    let (_, ready) = app.get(ACCOUNTS_UID, "/cheques?deposit_ready=true").await;
    assert_eq!(ready.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn dashboard_summarises_today() {
    let app = seeded().await;
    record(&app, "C1", "Cash", "100", None).await;
    record(&app, "C1", "Cash", "50", None).await;
    record(&app, "C2", "Cheque", "400", Some(("030", "2026-05-01"))).await;

    let (status, summary) = app.get(COLLECTOR_UID, "/dashboard").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["today_total"], "550");
    assert_eq!(summary["today_count"], 3);
    assert_eq!(summary["pending_cheque_count"], 1);
    let cash = summary["today_by_type"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["payment_type"] == "Cash")
        .unwrap();
    assert_eq!(cash["total"], "150");
    assert_eq!(cash["count"], 2);
}

#[tokio::test]
async fn page_gating_follows_roles() {
    let app = seeded().await;

    let (collector_reports, _) = app.get(COLLECTOR_UID, "/reports/daily").await;
    let (accounts_dashboard, _) = app.get(ACCOUNTS_UID, "/dashboard").await;
    let (admin_reports, _) = app.get(ADMIN_UID, "/reports/daily").await;

    assert_eq!(collector_reports, StatusCode::FORBIDDEN);
    assert_eq!(accounts_dashboard, StatusCode::FORBIDDEN);
    assert_eq!(admin_reports, StatusCode::OK);
}

#[tokio::test]
async fn permission_list_overrides_role_default() {
    let app = seeded().await;
    let mut collector = app.store.get_user(COLLECTOR_UID).await.unwrap().unwrap();
    collector.permissions = Some(vec!["REPORTS".to_string(), "NOT_A_PAGE".to_string()]);
    app.store.save_user(&collector).await.unwrap();

    let (reports, _) = app.get(COLLECTOR_UID, "/reports/daily").await;
    let (dashboard, _) = app.get(COLLECTOR_UID, "/dashboard").await;

    assert_eq!(reports, StatusCode::OK);
    assert_eq!(dashboard, StatusCode::FORBIDDEN);
}
