//! Domain models for Cadence

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A financial transaction
///
/// Owned by the transaction store. The engine treats it as a read-only
/// value: ingestion upserts by `trans_id`, everything downstream only reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    /// External transaction identifier (unique, upsert key)
    pub trans_id: String,
    pub user_id: String,
    /// Raw merchant label as supplied by the source
    pub name: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A validated transaction ready for storage (before DB insertion)
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub trans_id: String,
    pub user_id: String,
    pub name: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
}

/// A raw transaction as received at the system boundary
///
/// The date arrives as a string and is validated per item so one malformed
/// transaction does not reject the rest of its batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransaction {
    pub trans_id: String,
    pub user_id: String,
    pub name: String,
    pub amount: f64,
    pub date: String,
}

impl RawTransaction {
    /// Validate this raw transaction into a storable one
    ///
    /// Rejects blank identifiers, non-finite amounts, and unparseable dates.
    pub fn validate(&self) -> Result<NewTransaction> {
        if self.trans_id.trim().is_empty() {
            return Err(Error::Validation("missing trans_id".to_string()));
        }
        if self.user_id.trim().is_empty() {
            return Err(Error::Validation("missing user_id".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(Error::Validation("missing name".to_string()));
        }
        if !self.amount.is_finite() {
            return Err(Error::Validation(format!(
                "amount is not a finite number: {}",
                self.amount
            )));
        }
        let date = parse_instant(&self.date)
            .ok_or_else(|| Error::Validation(format!("unparseable date: {:?}", self.date)))?;

        Ok(NewTransaction {
            trans_id: self.trans_id.clone(),
            user_id: self.user_id.clone(),
            name: self.name.clone(),
            amount: self.amount,
            date,
        })
    }
}

/// A group of transactions sharing a canonical merchant name and owner
///
/// Identity is (`name`, `user_id`). Membership and the forecast fields are
/// fully recomputed on every grouping/classification pass; `members` holds
/// owned copies of the assigned transactions, never live references into
/// the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionGroup {
    pub id: i64,
    /// Canonical merchant name (digits stripped, whitespace trimmed)
    pub name: String,
    pub user_id: String,
    pub recurring: bool,
    /// Predicted amount of the next occurrence (group average)
    pub next_amount: f64,
    /// Predicted date of the next occurrence (latest date + base interval)
    pub next_date: DateTime<Utc>,
    pub members: Vec<Transaction>,
    pub created_at: DateTime<Utc>,
}

/// Parse an instant from the formats accepted at the boundary
///
/// Tries RFC 3339 first, then a bare datetime, then a bare date (midnight UTC).
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}
