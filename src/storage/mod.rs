//! Durable mapping from a [`PeriodKey`] to its raw statement and stored batch.
//!
//! [`StorageBackend`] is the seam a different store (object storage, say) would
//! implement; [`LocalStorage`] keeps everything in a directory tree.

pub mod local;

pub use local::LocalStorage;

use crate::error::Result;
use crate::schema::{PeriodKey, Transaction};

/// File name of the raw statement inside a month bucket.
pub const RAW_DOCUMENT_FILE: &str = "statement.pdf";

/// File name of the stored batch inside a month bucket.
pub const BATCH_FILE: &str = "transactions.json";

/// Storage operations used by ingestion and queries.
///
/// Failures distinguish absence from damage: a missing bucket or file is
/// [`LedgerError::NotFound`](crate::LedgerError::NotFound), a file that exists
/// but does not hold a valid batch is
/// [`LedgerError::Corrupt`](crate::LedgerError::Corrupt). Every read spanning
/// more than one bucket returns transactions sorted ascending by date.
pub trait StorageBackend: Send + Sync {
    /// Writes (or overwrites) the raw statement for `key`.
    fn store_raw_document(&self, key: &PeriodKey, bytes: &[u8]) -> Result<()>;

    fn get_raw_document(&self, key: &PeriodKey) -> Result<Vec<u8>>;

    /// Replaces the whole batch for `key`. Never merges with a previous batch.
    fn store_batch(&self, key: &PeriodKey, transactions: &[Transaction]) -> Result<()>;

    /// Returns the batch for `key` in stored order.
    fn get_batch(&self, key: &PeriodKey) -> Result<Vec<Transaction>>;

    /// Every bucket of one bank. Fails with `NotFound` if the bank is unknown.
    fn get_batches_for_bank(&self, bank_name: &str) -> Result<Vec<Transaction>>;

    /// One month across all banks. Banks without that bucket contribute nothing.
    fn get_batches_for_date(&self, year: i32, month: u32) -> Result<Vec<Transaction>>;

    /// Every month of one bank's year. Empty, not an error, when nothing is stored.
    fn get_batches_for_bank_for_year(&self, bank_name: &str, year: i32)
        -> Result<Vec<Transaction>>;

    /// One year across all banks.
    fn get_batches_for_year(&self, year: i32) -> Result<Vec<Transaction>>;

    /// Everything.
    fn get_all_batches(&self) -> Result<Vec<Transaction>>;
}
