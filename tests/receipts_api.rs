use std::{sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::NaiveDate;
use expense_policy::{
    domain::models::{ExpenseType, ExtractedReceipt},
    infrastructure::ocr::MockReceiptExtractor,
};


use test_harness::{build_app, build_app_with_extractor, send, test_config};

fn upload(content_type: &str, body: Vec<u8>) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri("/api/receipts/extract")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))?)
}

#[tokio::test]
async fn extracts_receipt_fields() -> Result<()> {
    let app = build_app(test_config());

    let (status, payload) = send(&app, upload("image/png", b"\x89PNG\r\n".to_vec())?).await?;

    assert_eq!(status, StatusCode::OK);
    let receipt = &payload["receipt"];
    assert_eq!(receipt["merchantName"], "Marriott Downtown");
    assert_eq!(receipt["type"], "hotel");
    assert_eq!(receipt["amountCents"], 28_950);
    assert_eq!(receipt["zipCode"], "10001");
    Ok(())
}

#[tokio::test]
async fn configured_extractor_serves_its_record() -> Result<()> {
    let receipt = ExtractedReceipt {
        merchant_name: "Blue Bottle Coffee".to_string(),
        amount_cents: 1_275,
        date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        expense_type: ExpenseType::Meals,
        zip_code: None,
        confidence: 0.5,
    };
    let extractor = Arc::new(MockReceiptExtractor::with_template(Duration::ZERO, receipt));
    let app = build_app_with_extractor(test_config(), extractor);

    let (status, payload) = send(&app, upload("application/pdf", b"%PDF-1.7".to_vec())?).await?;

    assert_eq!(status, StatusCode::OK);
    let receipt = &payload["receipt"];
    assert_eq!(receipt["merchantName"], "Blue Bottle Coffee");
    assert_eq!(receipt["type"], "meals");
    assert_eq!(receipt["amountCents"], 1_275);
    assert_eq!(receipt["date"], "2024-06-03");
    assert!(receipt.get("zipCode").is_none());
    Ok(())
}

#[tokio::test]
async fn rejects_unsupported_content_type() -> Result<()> {
    let app = build_app(test_config());

    let (status, payload) = send(&app, upload("text/csv", b"a,b,c".to_vec())?).await?;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(payload["error"], "unsupported media: text/csv");
    Ok(())
}

#[tokio::test]
async fn rejects_empty_upload() -> Result<()> {
    let app = build_app(test_config());

    let (status, _) = send(&app, upload("image/jpeg", Vec::new())?).await?;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn rejects_uploads_over_the_size_limit() -> Result<()> {
    let mut config = test_config();
    config.receipts.max_bytes = 16;
    let app = build_app(config);

    let (status, _) = send(&app, upload("image/jpeg", vec![0u8; 64])?).await?;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    Ok(())
}
