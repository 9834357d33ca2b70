#![cfg(feature = "server")]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use futures::future::BoxFuture;
use serde_json::{json, Value};
use statement_ledger::http::{router, AppState, UploadResponse, MAX_UPLOAD_BYTES};
use statement_ledger::*;
use tower::ServiceExt;

const BOUNDARY: &str = "statement-ledger-test-boundary";

struct StubParser {
    fail: bool,
}

impl StatementParser for StubParser {
    fn parse<'a>(
        &'a self,
        bank_name: &'a str,
        _document: &'a [u8],
    ) -> BoxFuture<'a, std::result::Result<Vec<Transaction>, ParserError>> {
        Box::pin(async move {
            if self.fail {
                return Err(ParserError::UnexpectedBehavior("model returned prose".to_string()));
            }
            Ok(vec![
                Transaction {
                    bank_name: bank_name.to_string(),
                    date: NaiveDate::from_ymd_opt(2025, 9, 2).unwrap(),
                    description: "Coffee".to_string(),
                    amount_in: 0.0,
                    amount_out: 3.5,
                    balance: 96.5,
                },
                Transaction {
                    bank_name: bank_name.to_string(),
                    date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
                    description: "Salary".to_string(),
                    amount_in: 100.0,
                    amount_out: 0.0,
                    balance: 100.0,
                },
            ])
        })
    }
}

fn app(root: &std::path::Path, fail: bool) -> Router {
    let storage = Arc::new(LocalStorage::new(root));
    router(AppState::new(storage, Arc::new(StubParser { fail })))
}

fn multipart_body(field: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"test.pdf\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(uri: &str, field: &str, content: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(field, content)))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn seed(root: &std::path::Path) {
    let storage = LocalStorage::new(root);
    storage
        .store_batch(
            &PeriodKey::new("barclays", 2025, 1).unwrap(),
            &[
                Transaction {
                    bank_name: "Barclays".to_string(),
                    date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                    description: "Salary".to_string(),
                    amount_in: 2500.0,
                    amount_out: 0.0,
                    balance: 4424.8,
                },
                Transaction {
                    bank_name: "Barclays".to_string(),
                    date: NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(),
                    description: "Grocery Store".to_string(),
                    amount_in: 0.0,
                    amount_out: 75.2,
                    balance: 1924.8,
                },
            ],
        )
        .unwrap();
}

#[tokio::test]
async fn test_health_check() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path(), false).oneshot(get_request("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "status": "running" }));
}

#[tokio::test]
async fn test_upload_statement_stores_raw_and_transactions() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path(), false)
        .oneshot(upload_request(
            "/statements/test_bank/2025/9",
            "statement",
            b"%PDF-1.4 fake content",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let uploaded: UploadResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(uploaded.bank_name, "test_bank");
    assert_eq!(uploaded.year, 2025);
    assert_eq!(uploaded.month, 9);
    assert_eq!(uploaded.transaction_count, 2);

    let bucket = dir.path().join("test_bank").join("2025").join("09");
    assert_eq!(
        std::fs::read(bucket.join("statement.pdf")).unwrap(),
        b"%PDF-1.4 fake content"
    );
    assert!(bucket.join("transactions.json").is_file());
}

#[tokio::test]
async fn test_upload_then_query_returns_sorted_transactions() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path(), false)
        .oneshot(upload_request("/statements/Monzo/2025/9", "statement", b"pdf"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(dir.path(), false)
        .oneshot(get_request("/transactions?bank_name=Monzo&year=2025&month=9"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let descriptions: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["description"].as_str().unwrap())
        .collect();
    // a single bucket comes back in stored order
    assert_eq!(descriptions, vec!["Coffee", "Salary"]);

    let response = app(dir.path(), false)
        .oneshot(get_request("/transactions?year=2025"))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body[0]["description"], "Salary");
    assert_eq!(body[1]["description"], "Coffee");
}

#[tokio::test]
async fn test_upload_accepts_statement_larger_than_axum_default_limit() {
    let dir = tempfile::tempdir().unwrap();
    let document = vec![b'x'; 3 * 1024 * 1024];

    let response = app(dir.path(), false)
        .oneshot(upload_request("/statements/Lloyds/2025/1", "statement", &document))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        std::fs::read(dir.path().join("Lloyds/2025/01/statement.pdf")).unwrap().len(),
        document.len()
    );
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected_before_storing() {
    let dir = tempfile::tempdir().unwrap();
    let document = vec![b'x'; MAX_UPLOAD_BYTES + 1];

    let response = app(dir.path(), false)
        .oneshot(upload_request("/statements/Lloyds/2025/1", "statement", &document))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    assert!(!dir.path().join("Lloyds").exists());
}

#[tokio::test]
async fn test_upload_without_statement_field_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path(), false)
        .oneshot(upload_request("/statements/Monzo/2025/9", "attachment", b"pdf"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!dir.path().join("Monzo").exists());
}

#[tokio::test]
async fn test_upload_with_invalid_month_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path(), false)
        .oneshot(upload_request("/statements/Monzo/2025/13", "statement", b"pdf"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_parse_failure_is_bad_gateway_and_keeps_raw() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path(), true)
        .oneshot(upload_request("/statements/Lloyds/2025/1", "statement", b"pdf"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["detail"], "Statement could not be parsed");

    let bucket = dir.path().join("Lloyds/2025/01");
    assert!(bucket.join("statement.pdf").is_file());
    assert!(!bucket.join("transactions.json").exists());
}

#[tokio::test]
async fn test_get_transactions_filters() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    let response = app(dir.path(), false)
        .oneshot(get_request("/transactions?bank_name=Barclays"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["date"], "2025-01-03");

    let response = app(dir.path(), false)
        .oneshot(get_request("/transactions"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_get_transactions_missing_bucket_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    let response = app(dir.path(), false)
        .oneshot(get_request("/transactions?bank_name=Barclays&year=2025&month=2"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await,
        json!({ "detail": "Cannot find requested file" })
    );
}

#[tokio::test]
async fn test_get_transactions_month_without_year_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    let response = app(dir.path(), false)
        .oneshot(get_request("/transactions?month=1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_corrupt_batch_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let bucket = dir.path().join("Monzo/2025/03");
    std::fs::create_dir_all(&bucket).unwrap();
    std::fs::write(bucket.join("transactions.json"), "{}").unwrap();

    let response = app(dir.path(), false)
        .oneshot(get_request("/transactions"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_download_raw_statement() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path(), false)
        .oneshot(upload_request("/statements/Monzo/2025/9", "statement", b"%PDF raw bytes"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(dir.path(), false)
        .oneshot(get_request("/statements/monzo/2025/9"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"%PDF raw bytes");

    let response = app(dir.path(), false)
        .oneshot(get_request("/statements/Monzo/2025/10"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
