use crate::error::{LedgerError, Result};
use crate::schema::Transaction;

/// Directory name for a month: always two digits.
pub fn month_segment(month: u32) -> String {
    format!("{:02}", month)
}

/// Parses a year directory name. Only the canonical spelling `year.to_string()`
/// produces is accepted, so `02025` is not a year.
pub fn parse_year_segment(name: &str) -> Option<i32> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if name.len() > 1 && name.starts_with('0') {
        return None;
    }
    name.parse().ok().filter(|year| (0..=9999).contains(year))
}

/// Parses a month directory name. Exactly two digits, `01` through `12`.
pub fn parse_month_segment(name: &str) -> Option<u32> {
    if name.len() != 2 || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok().filter(|m| (1..=12).contains(m))
}

/// A bank name becomes a directory under the storage root, so it must be a
/// single path segment.
pub fn validate_bank_name(bank_name: &str) -> Result<()> {
    if bank_name.trim().is_empty() {
        return Err(LedgerError::InvalidPeriod(
            "bank name must not be empty".to_string(),
        ));
    }
    if bank_name == "." || bank_name == ".." {
        return Err(LedgerError::InvalidPeriod(format!(
            "bank name '{}' is not a valid directory name",
            bank_name
        )));
    }
    if bank_name.contains(['/', '\\', '\0']) {
        return Err(LedgerError::InvalidPeriod(format!(
            "bank name '{}' must not contain path separators",
            bank_name
        )));
    }
    Ok(())
}

/// Stable ascending sort on `date`; equal dates keep their incoming order.
pub fn sort_by_date(transactions: &mut [Transaction]) {
    transactions.sort_by_key(|t| t.date);
}
