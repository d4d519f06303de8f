use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use std::{sync::Arc, time::Duration};
use tracing::debug;

use crate::{
    domain::models::{ExpenseType, ExtractedReceipt},
    infrastructure::config::ReceiptsConfig,
};

/// Reads the key fields off an uploaded receipt. The policy validator never
/// depends on this; extracted values only prefill the expense form.
#[async_trait]
pub trait ReceiptExtractor: Send + Sync {
    async fn extract(&self, data: Bytes, content_type: &str) -> anyhow::Result<ExtractedReceipt>;
}

pub fn build_extractor(config: &ReceiptsConfig) -> anyhow::Result<Arc<dyn ReceiptExtractor>> {
    match config.provider.as_str() {
        "mock" => Ok(Arc::new(MockReceiptExtractor::new(config.delay()))),
        other => anyhow::bail!("unsupported receipt extractor: {other}"),
    }
}

pub fn is_supported_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("image/") || mime == "application/pdf"
}

/// Simulated recognition: waits like a real service would, then returns the
/// same record for every upload.
pub struct MockReceiptExtractor {
    delay: Duration,
    template: ExtractedReceipt,
}

impl MockReceiptExtractor {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            template: ExtractedReceipt {
                merchant_name: "Marriott Downtown".to_string(),
                amount_cents: 28_950,
                date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap_or_default(),
                expense_type: ExpenseType::Hotel,
                zip_code: Some("10001".to_string()),
                confidence: 0.92,
            },
        }
    }

    pub fn with_template(delay: Duration, template: ExtractedReceipt) -> Self {
        Self { delay, template }
    }
}

#[async_trait]
impl ReceiptExtractor for MockReceiptExtractor {
    async fn extract(&self, data: Bytes, content_type: &str) -> anyhow::Result<ExtractedReceipt> {
        if data.is_empty() {
            anyhow::bail!("receipt upload is empty");
        }
        if !is_supported_content_type(content_type) {
            anyhow::bail!("unsupported receipt content type: {content_type}");
        }
        debug!(bytes = data.len(), content_type, "mock receipt extraction");
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.template.clone())
    }
}
