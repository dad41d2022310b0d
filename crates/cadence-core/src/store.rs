//! Repository capabilities consumed by the engine
//!
//! The engine never talks to SQLite directly; it is handed a
//! [`TransactionStore`] and a [`GroupStore`] so the grouping and
//! classification algorithms can be exercised against the in-memory
//! [`MemoryStore`] in tests and against [`crate::db::Database`] in
//! production.

use std::sync::Mutex;

use chrono::Utc;

use crate::error::Result;
use crate::models::{NewTransaction, Transaction, TransactionGroup};

/// Result of a batched transaction upsert
///
/// `created > 0` is the signal that a grouping pass is needed; batches that
/// only touch already-known transactions skip re-grouping.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchUpsertReport {
    /// Transactions newly created by this batch
    pub created: usize,
    /// Transactions that already existed and were updated in place
    pub updated: usize,
}

/// Storage capability for transactions
pub trait TransactionStore {
    /// All stored transactions
    fn find_all(&self) -> Result<Vec<Transaction>>;

    /// Upsert a batch keyed by external `trans_id`, reporting which rows
    /// were newly created
    fn upsert_batch(&self, batch: &[NewTransaction]) -> Result<BatchUpsertReport>;
}

/// Storage capability for transaction groups
pub trait GroupStore {
    /// All groups, members included
    fn find_all_groups(&self) -> Result<Vec<TransactionGroup>>;

    /// Groups currently flagged recurring, sorted by canonical name
    fn find_recurring(&self) -> Result<Vec<TransactionGroup>>;

    /// Look up the group for (canonical name, user), creating it if absent
    ///
    /// On creation the forecast fields are seeded from the seeding
    /// transaction: `recurring = false`, `next_amount = seed.amount`,
    /// `next_date = seed.date`.
    fn find_or_create(&self, name: &str, user_id: &str, seed: &Transaction)
        -> Result<TransactionGroup>;

    /// Persist a group's fields and membership
    fn save_group(&self, group: &TransactionGroup) -> Result<()>;

    /// Detach every transaction from its group, leaving the groups in place
    ///
    /// Runs at the start of each grouping pass so membership is rebuilt from
    /// scratch rather than accumulated across passes.
    fn clear_members(&self) -> Result<()>;
}

#[derive(Default)]
struct MemoryInner {
    transactions: Vec<Transaction>,
    groups: Vec<TransactionGroup>,
    next_tx_id: i64,
    next_group_id: i64,
}

/// In-memory store for tests and embedded use
///
/// Backs both capabilities with mutex-guarded vectors. Returned values are
/// owned copies, mirroring the SQLite implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionStore for MemoryStore {
    fn find_all(&self) -> Result<Vec<Transaction>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.transactions.clone())
    }

    fn upsert_batch(&self, batch: &[NewTransaction]) -> Result<BatchUpsertReport> {
        let mut inner = self.inner.lock().unwrap();
        let mut report = BatchUpsertReport::default();

        for tx in batch {
            if let Some(existing) = inner
                .transactions
                .iter_mut()
                .find(|t| t.trans_id == tx.trans_id)
            {
                existing.user_id = tx.user_id.clone();
                existing.name = tx.name.clone();
                existing.amount = tx.amount;
                existing.date = tx.date;
                report.updated += 1;
            } else {
                inner.next_tx_id += 1;
                let id = inner.next_tx_id;
                inner.transactions.push(Transaction {
                    id,
                    trans_id: tx.trans_id.clone(),
                    user_id: tx.user_id.clone(),
                    name: tx.name.clone(),
                    amount: tx.amount,
                    date: tx.date,
                    created_at: Utc::now(),
                });
                report.created += 1;
            }
        }

        Ok(report)
    }
}

impl GroupStore for MemoryStore {
    fn find_all_groups(&self) -> Result<Vec<TransactionGroup>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.groups.clone())
    }

    fn find_recurring(&self) -> Result<Vec<TransactionGroup>> {
        let inner = self.inner.lock().unwrap();
        let mut recurring: Vec<TransactionGroup> = inner
            .groups
            .iter()
            .filter(|g| g.recurring)
            .cloned()
            .collect();
        recurring.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(recurring)
    }

    fn find_or_create(
        &self,
        name: &str,
        user_id: &str,
        seed: &Transaction,
    ) -> Result<TransactionGroup> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(group) = inner
            .groups
            .iter()
            .find(|g| g.name == name && g.user_id == user_id)
        {
            return Ok(group.clone());
        }

        inner.next_group_id += 1;
        let group = TransactionGroup {
            id: inner.next_group_id,
            name: name.to_string(),
            user_id: user_id.to_string(),
            recurring: false,
            next_amount: seed.amount,
            next_date: seed.date,
            members: Vec::new(),
            created_at: Utc::now(),
        };
        inner.groups.push(group.clone());
        Ok(group)
    }

    fn save_group(&self, group: &TransactionGroup) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.groups.iter_mut().find(|g| g.id == group.id) {
            *existing = group.clone();
        } else {
            inner.groups.push(group.clone());
        }
        Ok(())
    }

    fn clear_members(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        for group in &mut inner.groups {
            group.members.clear();
        }
        Ok(())
    }
}
