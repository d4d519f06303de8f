use std::sync::Arc;

use crate::infrastructure::{
    config::Config,
    ocr::{build_extractor, ReceiptExtractor},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub extractor: Arc<dyn ReceiptExtractor>,
}

impl AppState {
    pub fn new(config: Arc<Config>, extractor: Arc<dyn ReceiptExtractor>) -> Self {
        Self { config, extractor }
    }

    /// Builds the state with the extractor selected in `receipts.provider`.
    pub fn from_config(config: Arc<Config>) -> anyhow::Result<Self> {
        let extractor = build_extractor(&config.receipts)?;
        Ok(Self::new(config, extractor))
    }
}
