use serde::Deserialize;

use crate::error::{LedgerError, Result};
use crate::schema::{validate_month, PeriodKey, Transaction};
use crate::storage::StorageBackend;

/// Optional bank/year/month narrowing of a transaction query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TransactionFilter {
    pub bank_name: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// The single storage read a filter resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    All,
    Bank(String),
    BankYear(String, i32),
    Bucket(PeriodKey),
    Year(i32),
    Date(i32, u32),
}

impl TransactionFilter {
    pub fn new(bank_name: Option<String>, year: Option<i32>, month: Option<u32>) -> Self {
        Self {
            bank_name,
            year,
            month,
        }
    }

    /// Chooses the storage read for this filter. A month without a year is rejected.
    pub fn plan(&self) -> Result<QueryPlan> {
        if let Some(month) = self.month {
            validate_month(month)
                .map_err(|_| LedgerError::InvalidFilter(format!("month {} is out of range", month)))?;
        }

        match (&self.bank_name, self.year, self.month) {
            (None, None, None) => Ok(QueryPlan::All),
            (Some(bank), None, None) => Ok(QueryPlan::Bank(bank.clone())),
            (Some(bank), Some(year), None) => Ok(QueryPlan::BankYear(bank.clone(), year)),
            (Some(bank), Some(year), Some(month)) => {
                Ok(QueryPlan::Bucket(PeriodKey::new(bank.clone(), year, month)?))
            }
            (None, Some(year), None) => Ok(QueryPlan::Year(year)),
            (None, Some(year), Some(month)) => Ok(QueryPlan::Date(year, month)),
            (_, None, Some(_)) => Err(LedgerError::InvalidFilter(
                "month requires year".to_string(),
            )),
        }
    }
}

/// Answers filtered transaction queries from a storage backend.
pub struct QueryResolver<'a> {
    storage: &'a dyn StorageBackend,
}

impl<'a> QueryResolver<'a> {
    pub fn new(storage: &'a dyn StorageBackend) -> Self {
        Self { storage }
    }

    pub fn resolve(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        match filter.plan()? {
            QueryPlan::All => self.storage.get_all_batches(),
            QueryPlan::Bank(bank) => self.storage.get_batches_for_bank(&bank),
            QueryPlan::BankYear(bank, year) => {
                self.storage.get_batches_for_bank_for_year(&bank, year)
            }
            QueryPlan::Bucket(key) => self.storage.get_batch(&key),
            QueryPlan::Year(year) => self.storage.get_batches_for_year(year),
            QueryPlan::Date(year, month) => self.storage.get_batches_for_date(year, month),
        }
    }
}
