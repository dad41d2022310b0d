//! Transaction operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_stored_datetime, Database};
use crate::error::Result;
use crate::models::{NewTransaction, Transaction};
use crate::store::{BatchUpsertReport, TransactionStore};

impl Database {
    /// Upsert a batch of transactions keyed by external trans_id
    ///
    /// Reports how many rows were newly created versus updated in place;
    /// the caller uses `created > 0` to decide whether a grouping pass is
    /// needed.
    pub fn upsert_transactions(&self, batch: &[NewTransaction]) -> Result<BatchUpsertReport> {
        let conn = self.conn()?;
        let mut report = BatchUpsertReport::default();

        for tx in batch {
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT id FROM transactions WHERE trans_id = ?",
                    params![tx.trans_id],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(id) = existing {
                conn.execute(
                    "UPDATE transactions SET user_id = ?, name = ?, amount = ?, date = ? WHERE id = ?",
                    params![tx.user_id, tx.name, tx.amount, tx.date.to_rfc3339(), id],
                )?;
                report.updated += 1;
            } else {
                conn.execute(
                    r#"
                    INSERT INTO transactions (trans_id, user_id, name, amount, date)
                    VALUES (?, ?, ?, ?, ?)
                    "#,
                    params![
                        tx.trans_id,
                        tx.user_id,
                        tx.name,
                        tx.amount,
                        tx.date.to_rfc3339()
                    ],
                )?;
                report.created += 1;
            }
        }

        Ok(report)
    }

    /// List all transactions, oldest first
    pub fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, trans_id, user_id, name, amount, date, created_at
            FROM transactions
            ORDER BY date, id
            "#,
        )?;

        let transactions = stmt
            .query_map([], Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    pub(crate) fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
        let date_str: String = row.get(5)?;
        let created_at_str: String = row.get(6)?;

        Ok(Transaction {
            id: row.get(0)?,
            trans_id: row.get(1)?,
            user_id: row.get(2)?,
            name: row.get(3)?,
            amount: row.get(4)?,
            date: parse_stored_datetime(&date_str),
            created_at: parse_stored_datetime(&created_at_str),
        })
    }
}

impl TransactionStore for Database {
    fn find_all(&self) -> Result<Vec<Transaction>> {
        self.list_transactions()
    }

    fn upsert_batch(&self, batch: &[NewTransaction]) -> Result<BatchUpsertReport> {
        self.upsert_transactions(batch)
    }
}
