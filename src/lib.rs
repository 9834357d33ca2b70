//! # Statement Ledger
//!
//! Stores uploaded bank statements and the transactions extracted from them in a
//! per-bank, per-year, per-month directory hierarchy, and answers filtered
//! queries across that hierarchy.
//!
//! ## Core Concepts
//!
//! - **Period Key**: `(bank_name, year, month)`, the address of one storage bucket
//! - **Raw Document**: the original statement bytes, stored before any parsing happens
//! - **Stored Batch**: every transaction of one bucket, replaced as a whole on re-ingestion
//! - **Ingestion Pipeline**: store raw, call the statement parser, store the batch
//! - **Query Resolver**: maps an optional bank/year/month filter to one storage read
//!
//! ## Example
//!
//! ```rust,ignore
//! use statement_ledger::*;
//! use std::sync::Arc;
//!
//! let storage = Arc::new(LocalStorage::new("/var/lib/statements"));
//! let pipeline = IngestionPipeline::new(storage.clone(), Arc::new(my_parser));
//!
//! let key = PeriodKey::new("Barclays", 2025, 1)?;
//! pipeline.ingest(&key, &pdf_bytes).await?;
//!
//! let filter = TransactionFilter::new(Some("Barclays".to_string()), Some(2025), None);
//! let january_onwards = QueryResolver::new(storage.as_ref()).resolve(&filter)?;
//! ```

pub mod error;
pub mod ingestion;
pub mod query;
pub mod schema;
pub mod settings;
pub mod storage;
pub mod utils;

#[cfg(feature = "gemini")]
pub mod llm;

#[cfg(feature = "server")]
pub mod http;

pub use error::{LedgerError, Result};
pub use ingestion::{IngestionPipeline, ParserError, StatementParser};
pub use query::{QueryPlan, QueryResolver, TransactionFilter};
pub use schema::{ParsedStatement, ParsedTransaction, PeriodKey, StoredBatch, Transaction};
pub use settings::Settings;
pub use storage::{LocalStorage, StorageBackend, BATCH_FILE, RAW_DOCUMENT_FILE};
