use std::sync::Arc;

use futures::future::BoxFuture;
use log::{info, warn};
use thiserror::Error;

use crate::error::{LedgerError, Result};
use crate::schema::{PeriodKey, Transaction};
use crate::storage::StorageBackend;

/// The ways an extraction call can fail. Callers of the pipeline never see
/// these; they are folded into [`LedgerError::ParseFailed`].
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Usage limit exceeded: {0}")]
    UsageLimitExceeded(String),

    #[error("Unexpected model behavior: {0}")]
    UnexpectedBehavior(String),

    #[error("Agent run error: {0}")]
    RunFailed(String),
}

/// Turns a raw statement into transactions.
///
/// Implementations stamp `bank_name` onto every transaction they return. The
/// pipeline awaits the call to completion; timeouts belong to the implementation
/// or to whoever drives the pipeline.
pub trait StatementParser: Send + Sync {
    fn parse<'a>(
        &'a self,
        bank_name: &'a str,
        document: &'a [u8],
    ) -> BoxFuture<'a, std::result::Result<Vec<Transaction>, ParserError>>;
}

/// Store-raw, parse, store-batch for one statement upload.
#[derive(Clone)]
pub struct IngestionPipeline {
    storage: Arc<dyn StorageBackend>,
    parser: Arc<dyn StatementParser>,
}

impl IngestionPipeline {
    pub fn new(storage: Arc<dyn StorageBackend>, parser: Arc<dyn StatementParser>) -> Self {
        Self { storage, parser }
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    /// Runs one ingestion and returns how many transactions were stored.
    ///
    /// The raw document is written before the parser is called and stays in
    /// place whatever the parser does. On a parse failure the existing batch
    /// for `key`, if any, is left untouched and `ParseFailed` is returned. No
    /// retries are attempted.
    pub async fn ingest(&self, key: &PeriodKey, document: &[u8]) -> Result<usize> {
        info!("Ingesting statement for {}", key);
        self.storage.store_raw_document(key, document)?;

        let transactions = match self.parser.parse(key.bank_name(), document).await {
            Ok(transactions) => transactions,
            Err(e) => {
                warn!("Statement parser failed for {}: {}", key, e);
                return Err(LedgerError::ParseFailed(format!(
                    "could not extract transactions for {}",
                    key
                )));
            }
        };

        self.storage.store_batch(key, &transactions)?;
        info!("Ingested {} transactions for {}", transactions.len(), key);
        Ok(transactions.len())
    }
}
