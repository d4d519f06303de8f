use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use crate::{
    domain::models::ExtractedReceipt,
    infrastructure::{ocr::is_supported_content_type, state::AppState},
};

use super::errors::ServiceError;

pub struct ReceiptService {
    pub state: Arc<AppState>,
}

impl ReceiptService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Prefill data for the expense form read from an uploaded receipt.
    pub async fn extract(
        &self,
        data: Bytes,
        content_type: &str,
    ) -> Result<ExtractedReceipt, ServiceError> {
        if data.is_empty() {
            return Err(ServiceError::Validation("receipt upload is empty".into()));
        }
        if !is_supported_content_type(content_type) {
            return Err(ServiceError::Unsupported(content_type.to_string()));
        }
        let size = data.len();
        let receipt = self
            .state
            .extractor
            .extract(data, content_type)
            .await
            .map_err(|err| {
                warn!(error = ?err, "receipt extraction failed");
                ServiceError::Internal(err.to_string())
            })?;
        info!(
            bytes = size,
            expense_type = %receipt.expense_type,
            confidence = receipt.confidence,
            "receipt extracted"
        );
        Ok(receipt)
    }
}
