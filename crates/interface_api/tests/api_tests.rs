//! Router tests
//!
//! Requests go through the full middleware stack against an in-memory
//! ledger store.

use std::str::FromStr;

use axum::{
    body::{to_bytes, Body},
    http::{header::AUTHORIZATION, Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use infra_db::InMemoryLedgerStore;
use interface_api::auth::{create_token, permissions};
use interface_api::config::ApiConfig;
use interface_api::{create_router, AppState};

const SECRET: &str = "router-test-secret";

struct TestApp {
    router: Router,
    token: String,
}

impl TestApp {
    fn new() -> Self {
        Self::with_roles(vec!["admin".to_string()])
    }

    fn with_roles(roles: Vec<String>) -> Self {
        Self::with_config(roles, ApiConfig::default())
    }

    fn requiring_entry_approval() -> Self {
        let config = ApiConfig {
            require_entry_approval: true,
            ..ApiConfig::default()
        };
        Self::with_config(vec!["admin".to_string()], config)
    }

    fn with_config(roles: Vec<String>, config: ApiConfig) -> Self {
        let config = ApiConfig {
            jwt_secret: SECRET.to_string(),
            ..config
        };
        let router = create_router(AppState::new(InMemoryLedgerStore::new(), config));
        let token = create_token("alice", roles, SECRET, 300).unwrap();
        Self { router, token }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = self.send_raw(method, uri, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn send_raw(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {}", self.token));
        let body = match body {
            Some(value) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn get_text(&self, uri: &str) -> (StatusCode, String) {
        let (status, bytes) = self.send_raw(Method::GET, uri, None).await;
        (status, String::from_utf8(bytes).unwrap())
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    async fn create_account(&self, category: &str, code: &str, name: &str) -> String {
        let (status, body) = self
            .post(
                "/api/v1/accounts",
                json!({ "category": category, "code": code, "name": name }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_january(&self) -> String {
        let (status, body) = self
            .post(
                "/api/v1/periods",
                json!({
                    "name": "January 2024",
                    "start_date": "2024-01-01",
                    "end_date": "2024-01-31",
                    "fiscal_year": 2024,
                    "period_type": "Monthly"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_entry(&self, reference: &str, debit: (&str, &str), credit: (&str, &str)) -> String {
        let (status, body) = self
            .post(
                "/api/v1/journal-entries",
                json!({
                    "date": "2024-01-15",
                    "reference_number": reference,
                    "description": "Cash sale",
                    "lines": [
                        { "account_id": debit.0, "debit": debit.1 },
                        { "account_id": credit.0, "credit": credit.1, "classification": "sales" }
                    ]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}

// ============================================================================
// Health and authentication
// ============================================================================

mod access {
    use super::*;

    #[tokio::test]
    async fn test_health_is_public() {
        let app = TestApp::new();
        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_readiness_reports_store() {
        let app = TestApp::new();
        let (status, body) = app.get("/health/ready").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
        assert_eq!(body["store"]["status"], "healthy");
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let app = TestApp::new();
        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri("/api/v1/accounts").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_unauthorized() {
        let app = TestApp::new();
        let token = create_token("mallory", vec!["admin".to_string()], "other-secret", 300).unwrap();
        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/accounts")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_permission_is_forbidden() {
        let app = TestApp::with_roles(vec![permissions::ACCOUNT_READ.to_string()]);

        let (status, _) = app.get("/api/v1/accounts").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app
            .post(
                "/api/v1/accounts",
                json!({ "category": "Asset", "code": "1000", "name": "Cash" }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
    }
}

// ============================================================================
// Chart of accounts and periods
// ============================================================================

mod setup {
    use super::*;

    #[tokio::test]
    async fn test_accounts_listed_by_code() {
        let app = TestApp::new();
        app.create_account("Revenue", "4000", "Sales").await;
        app.create_account("Asset", "1000", "Cash").await;

        let (status, body) = app.get("/api/v1/accounts").await;

        assert_eq!(status, StatusCode::OK);
        let codes: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["code"].as_str().unwrap())
            .collect();
        assert_eq!(codes, vec!["1000", "4000"]);
    }

    #[tokio::test]
    async fn test_request_validation_lists_fields() {
        let app = TestApp::new();
        let (status, body) = app
            .post(
                "/api/v1/accounts",
                json!({ "category": "Asset", "code": "", "name": "" }),
            )
            .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["details"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_category_rejected() {
        let app = TestApp::new();
        let (status, body) = app
            .post(
                "/api/v1/accounts",
                json!({ "category": "Goodwill", "code": "1500", "name": "Goodwill" }),
            )
            .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["message"].as_str().unwrap().to_lowercase().contains("goodwill"));
    }

    #[tokio::test]
    async fn test_duplicate_code_conflicts() {
        let app = TestApp::new();
        app.create_account("Asset", "1000", "Cash").await;

        let (status, _) = app
            .post(
                "/api/v1/accounts",
                json!({ "category": "Asset", "code": "1000", "name": "Petty cash" }),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_unknown_account_not_found() {
        let app = TestApp::new();
        let (status, body) = app
            .get(&format!("/api/v1/accounts/{}", uuid::Uuid::new_v4()))
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_period_close_and_reopen() {
        let app = TestApp::new();
        let period = app.create_january().await;

        let (status, body) = app.post(&format!("/api/v1/periods/{period}/close"), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_closed"], true);

        let (status, body) = app.post(&format!("/api/v1/periods/{period}/reopen"), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_closed"], false);
    }
}

// ============================================================================
// Journal entries
// ============================================================================

mod journal {
    use super::*;

    #[tokio::test]
    async fn test_post_entry_moves_balances() {
        let app = TestApp::new();
        app.create_january().await;
        let cash = app.create_account("Asset", "1000", "Cash").await;
        let sales = app.create_account("Revenue", "4000", "Sales").await;
        let entry = app.create_entry("JE-1", (&cash, "100.00"), (&sales, "100.00")).await;

        let (status, body) = app
            .post(&format!("/api/v1/journal-entries/{entry}/post"), json!({}))
            .await;

        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["entry"]["is_posted"], true);
        assert_eq!(body["ledger_rows"].as_array().unwrap().len(), 2);

        let (_, cash_body) = app.get(&format!("/api/v1/accounts/{cash}")).await;
        let (_, sales_body) = app.get(&format!("/api/v1/accounts/{sales}")).await;
        assert_eq!(decimal(&cash_body["balance"]), dec!(100.00));
        assert_eq!(decimal(&sales_body["balance"]), dec!(100.00));

        let (_, trial) = app.get("/api/v1/ledger/trial-balance").await;
        assert_eq!(trial["is_balanced"], true);
        assert_eq!(decimal(&trial["total_debits"]), dec!(100.00));

        let (status, metrics) = app.get_text("/api/v1/ledger/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(metrics.contains("# TYPE ledger_entries_posted_total counter"));
        assert!(metrics.lines().any(|line| line == "ledger_entries_posted_total 1"), "{metrics}");
        assert!(metrics.lines().any(|line| line == "ledger_posting_failures_total 0"), "{metrics}");
    }

    #[tokio::test]
    async fn test_unbalanced_entry_is_invariant_violation() {
        let app = TestApp::new();
        app.create_january().await;
        let cash = app.create_account("Asset", "1000", "Cash").await;
        let sales = app.create_account("Revenue", "4000", "Sales").await;
        let entry = app.create_entry("JE-2", (&cash, "100.00"), (&sales, "90.00")).await;

        let (status, body) = app
            .post(&format!("/api/v1/journal-entries/{entry}/post"), json!({}))
            .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "invariant_violation");

        let (_, rows) = app.get(&format!("/api/v1/accounts/{cash}/ledger")).await;
        assert!(rows.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_posting_twice_conflicts() {
        let app = TestApp::new();
        app.create_january().await;
        let cash = app.create_account("Asset", "1000", "Cash").await;
        let sales = app.create_account("Revenue", "4000", "Sales").await;
        let entry = app.create_entry("JE-3", (&cash, "10"), (&sales, "10")).await;
        let uri = format!("/api/v1/journal-entries/{entry}/post");

        assert_eq!(app.post(&uri, json!({})).await.0, StatusCode::OK);
        assert_eq!(app.post(&uri, json!({})).await.0, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_closed_period_refuses_new_entries() {
        let app = TestApp::new();
        let period = app.create_january().await;
        let cash = app.create_account("Asset", "1000", "Cash").await;
        let sales = app.create_account("Revenue", "4000", "Sales").await;
        app.post(&format!("/api/v1/periods/{period}/close"), json!({})).await;

        let (status, _) = app
            .post(
                "/api/v1/journal-entries",
                json!({
                    "date": "2024-01-20",
                    "reference_number": "JE-4",
                    "lines": [
                        { "account_id": cash, "debit": "5" },
                        { "account_id": sales, "credit": "5" }
                    ]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_entry_approval_gates_posting() {
        let app = TestApp::requiring_entry_approval();
        app.create_january().await;
        let cash = app.create_account("Asset", "1000", "Cash").await;
        let sales = app.create_account("Revenue", "4000", "Sales").await;
        let entry = app.create_entry("JE-9", (&cash, "40"), (&sales, "40")).await;
        let post_uri = format!("/api/v1/journal-entries/{entry}/post");

        let (status, body) = app.post(&post_uri, json!({})).await;
        assert_eq!(status, StatusCode::CONFLICT, "{body}");

        let (status, rejected) = app
            .post(&format!("/api/v1/journal-entries/{entry}/reject"), json!({}))
            .await;
        assert_eq!(status, StatusCode::OK, "{rejected}");
        assert_eq!(rejected["approval_status"], "Rejected");
        assert_eq!(app.post(&post_uri, json!({})).await.0, StatusCode::CONFLICT);

        let (status, approved) = app
            .post(&format!("/api/v1/journal-entries/{entry}/approve"), json!({}))
            .await;
        assert_eq!(status, StatusCode::OK, "{approved}");
        assert_eq!(approved["approval_status"], "Approved");
        assert_eq!(approved["approval"]["actor"], "alice");

        let (status, posted) = app.post(&post_uri, json!({})).await;
        assert_eq!(status, StatusCode::OK, "{posted}");
        assert_eq!(posted["entry"]["is_posted"], true);
    }

    #[tokio::test]
    async fn test_approval_needs_permission() {
        let app = TestApp::with_roles(vec![
            permissions::ACCOUNT_WRITE.to_string(),
            permissions::JOURNAL_WRITE.to_string(),
        ]);
        let cash = app.create_account("Asset", "1000", "Cash").await;
        let sales = app.create_account("Revenue", "4000", "Sales").await;
        let entry = app.create_entry("JE-10", (&cash, "1"), (&sales, "1")).await;

        let (status, _) = app
            .post(&format!("/api/v1/journal-entries/{entry}/approve"), json!({}))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_update_with_null_period_detaches() {
        let app = TestApp::new();
        let period = app.create_january().await;
        let cash = app.create_account("Asset", "1000", "Cash").await;
        let sales = app.create_account("Revenue", "4000", "Sales").await;
        let entry = app.create_entry("JE-11", (&cash, "3"), (&sales, "3")).await;
        let uri = format!("/api/v1/journal-entries/{entry}");

        let (status, body) = app
            .send(Method::PUT, &uri, Some(json!({ "period_id": period })))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["period_id"], period.as_str());

        let (_, body) = app
            .send(Method::PUT, &uri, Some(json!({ "description": "Still assigned" })))
            .await;
        assert_eq!(body["period_id"], period.as_str());

        let (status, body) = app
            .send(Method::PUT, &uri, Some(json!({ "period_id": null })))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert!(body["period_id"].is_null());
    }

    #[tokio::test]
    async fn test_reversal_and_annotation() {
        let app = TestApp::new();
        app.create_january().await;
        let cash = app.create_account("Asset", "1000", "Cash").await;
        let sales = app.create_account("Revenue", "4000", "Sales").await;
        let entry = app.create_entry("JE-5", (&cash, "40"), (&sales, "40")).await;
        app.post(&format!("/api/v1/journal-entries/{entry}/post"), json!({})).await;

        let (status, body) = app
            .post(
                &format!("/api/v1/journal-entries/{entry}/reverse"),
                json!({ "reversal_date": "2024-01-20", "reason": "keyed twice" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_reversed"], true);
        assert_eq!(body["reversal"]["reason"], "keyed twice");

        // The marker alone leaves balances untouched
        let (_, cash_body) = app.get(&format!("/api/v1/accounts/{cash}")).await;
        assert_eq!(decimal(&cash_body["balance"]), dec!(40));

        let (_, rows) = app.get(&format!("/api/v1/journal-entries/{entry}/ledger")).await;
        let row_id = rows[0]["id"].as_str().unwrap().to_string();
        let (status, row) = app
            .send(
                Method::PUT,
                &format!("/api/v1/ledger/rows/{row_id}"),
                Some(json!({ "memo": "see JE-6" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(row["memo"], "see JE-6");
        assert_eq!(decimal(&row["debit"]) + decimal(&row["credit"]), dec!(40));
    }
}

// ============================================================================
// Posting batches
// ============================================================================

mod batches {
    use super::*;

    #[tokio::test]
    async fn test_batch_requires_approval_before_posting() {
        let app = TestApp::new();
        app.create_january().await;
        let cash = app.create_account("Asset", "1000", "Cash").await;
        let sales = app.create_account("Revenue", "4000", "Sales").await;
        let entry = app.create_entry("JE-7", (&cash, "75"), (&sales, "75")).await;

        let (status, batch) = app
            .post(
                "/api/v1/batches",
                json!({ "batch_number": "B-2024-01", "batch_date": "2024-01-31" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let batch_id = batch["id"].as_str().unwrap().to_string();

        let (status, batch) = app
            .post(
                &format!("/api/v1/batches/{batch_id}/entries"),
                json!({ "entry_id": entry }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(batch["entry_count"], 1);

        let post_uri = format!("/api/v1/batches/{batch_id}/post");
        assert_eq!(app.post(&post_uri, json!({})).await.0, StatusCode::CONFLICT);

        let (status, approved) = app
            .post(&format!("/api/v1/batches/{batch_id}/approve"), json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(approved["approval"]["actor"], "alice");

        let (status, posted) = app.post(&post_uri, json!({})).await;
        assert_eq!(status, StatusCode::OK, "{posted}");
        assert_eq!(posted["batch"]["posted_by"], "alice");
        assert_eq!(posted["ledger_rows"].as_array().unwrap().len(), 2);

        let (_, cash_body) = app.get(&format!("/api/v1/accounts/{cash}")).await;
        assert_eq!(decimal(&cash_body["balance"]), dec!(75));
    }

    #[tokio::test]
    async fn test_batch_entry_refuses_direct_posting() {
        let app = TestApp::new();
        app.create_january().await;
        let cash = app.create_account("Asset", "1000", "Cash").await;
        let sales = app.create_account("Revenue", "4000", "Sales").await;
        let entry = app.create_entry("JE-8", (&cash, "5"), (&sales, "5")).await;
        let (_, batch) = app
            .post(
                "/api/v1/batches",
                json!({ "batch_number": "B-2024-02", "batch_date": "2024-01-31" }),
            )
            .await;
        let batch_id = batch["id"].as_str().unwrap();
        app.post(&format!("/api/v1/batches/{batch_id}/entries"), json!({ "entry_id": entry }))
            .await;

        let (status, _) = app
            .post(&format!("/api/v1/journal-entries/{entry}/post"), json!({}))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
