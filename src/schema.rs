use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::utils::{month_segment, validate_bank_name};

/// One line of a bank statement as persisted in a stored batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transaction {
    pub bank_name: String,
    pub date: NaiveDate,
    pub description: String,
    /// Money received. Normally zero when `amount_out` is set.
    pub amount_in: f64,
    /// Money spent. Normally zero when `amount_in` is set.
    pub amount_out: f64,
    /// Running balance as printed on the statement, never recomputed.
    pub balance: f64,
}

impl Transaction {
    pub fn from_parsed(bank_name: impl Into<String>, parsed: ParsedTransaction) -> Self {
        Self {
            bank_name: bank_name.into(),
            date: parsed.date,
            description: parsed.description,
            amount_in: parsed.amount_in,
            amount_out: parsed.amount_out,
            balance: parsed.balance,
        }
    }
}

/// A transaction as returned by the extraction model, before the bank is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParsedTransaction {
    #[schemars(description = "Date the transaction was made, in YYYY-MM-DD format")]
    pub date: NaiveDate,

    #[schemars(description = "The transaction description exactly as printed on the statement")]
    pub description: String,

    #[schemars(
        description = "Money paid into the account. Non-negative. Use 0 when the transaction is a payment out."
    )]
    pub amount_in: f64,

    #[schemars(
        description = "Money paid out of the account. Non-negative. Use 0 when the transaction is a payment in."
    )]
    pub amount_out: f64,

    #[schemars(description = "The running balance printed next to the transaction")]
    pub balance: f64,
}

/// Top-level object the extraction model must return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParsedStatement {
    #[schemars(
        description = "Every transaction on the statement, in the order it appears. Exclude opening/closing balance lines and subtotals."
    )]
    pub transactions: Vec<ParsedTransaction>,
}

impl ParsedStatement {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ParsedStatement)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }

    pub fn into_transactions(self, bank_name: &str) -> Vec<Transaction> {
        self.transactions
            .into_iter()
            .map(|parsed| Transaction::from_parsed(bank_name, parsed))
            .collect()
    }
}

/// On-disk shape of a stored batch: `{ "transactions": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoredBatch {
    pub transactions: Vec<Transaction>,
}

/// Address of one storage bucket: a bank's statement for one calendar month.
///
/// Construct through [`PeriodKey::new`], which guarantees the bank name is a
/// single safe path segment and the month is in `1..=12`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PeriodKey {
    bank_name: String,
    year: i32,
    month: u32,
}

impl PeriodKey {
    pub fn new(bank_name: impl Into<String>, year: i32, month: u32) -> Result<Self> {
        let bank_name = bank_name.into();
        validate_bank_name(&bank_name)?;
        validate_year(year)?;
        validate_month(month)?;
        Ok(Self {
            bank_name,
            year,
            month,
        })
    }

    pub fn bank_name(&self) -> &str {
        &self.bank_name
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The zero-padded month directory name, e.g. `"01"`.
    pub fn month_segment(&self) -> String {
        month_segment(self.month)
    }
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{:02}", self.bank_name, self.year, self.month)
    }
}

pub fn validate_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(LedgerError::InvalidPeriod(format!(
            "month {} must be between 1 and 12",
            month
        )));
    }
    Ok(())
}

pub fn validate_year(year: i32) -> Result<()> {
    if !(0..=9999).contains(&year) {
        return Err(LedgerError::InvalidPeriod(format!(
            "year {} must be between 0 and 9999",
            year
        )));
    }
    Ok(())
}
