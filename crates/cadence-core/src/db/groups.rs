//! Transaction group operations
//!
//! Membership lives on the transactions table (`group_id`); saving a group
//! writes its scalar fields and relinks its members in one pass.

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_stored_datetime, Database};
use crate::error::Result;
use crate::models::{Transaction, TransactionGroup};
use crate::store::GroupStore;

impl Database {
    /// Look up a group by identity, creating it if absent
    ///
    /// New groups are seeded from the given transaction: not recurring,
    /// forecast pointing at the seed's own amount and date.
    pub fn find_or_create_group(
        &self,
        name: &str,
        user_id: &str,
        seed: &Transaction,
    ) -> Result<TransactionGroup> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM transaction_groups WHERE name = ? AND user_id = ?",
                params![name, user_id],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => id,
            None => {
                conn.execute(
                    r#"
                    INSERT INTO transaction_groups (name, user_id, recurring, next_amount, next_date)
                    VALUES (?, ?, 0, ?, ?)
                    "#,
                    params![name, user_id, seed.amount, seed.date.to_rfc3339()],
                )?;
                conn.last_insert_rowid()
            }
        };

        drop(conn);
        self.get_group(id)
    }

    /// Load a single group with its members
    pub fn get_group(&self, id: i64) -> Result<TransactionGroup> {
        let conn = self.conn()?;

        let mut group = conn.query_row(
            r#"
            SELECT id, name, user_id, recurring, next_amount, next_date, created_at
            FROM transaction_groups
            WHERE id = ?
            "#,
            params![id],
            Self::row_to_group,
        )?;

        group.members = self.group_members(&conn, id)?;
        Ok(group)
    }

    /// Persist a group's fields and relink its members
    pub fn save_group_row(&self, group: &TransactionGroup) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            UPDATE transaction_groups
            SET recurring = ?, next_amount = ?, next_date = ?
            WHERE id = ?
            "#,
            params![
                group.recurring,
                group.next_amount,
                group.next_date.to_rfc3339(),
                group.id
            ],
        )?;

        for member in &group.members {
            conn.execute(
                "UPDATE transactions SET group_id = ? WHERE id = ?",
                params![group.id, member.id],
            )?;
        }

        Ok(())
    }

    /// Detach every transaction from its group
    pub fn clear_group_members(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("UPDATE transactions SET group_id = NULL", [])?;
        Ok(())
    }

    /// List all groups with their members
    pub fn list_groups(&self) -> Result<Vec<TransactionGroup>> {
        self.query_groups("")
    }

    /// List recurring groups sorted by canonical name
    pub fn list_recurring_groups(&self) -> Result<Vec<TransactionGroup>> {
        self.query_groups("WHERE recurring = 1")
    }

    fn query_groups(&self, where_clause: &str) -> Result<Vec<TransactionGroup>> {
        let conn = self.conn()?;

        let sql = format!(
            r#"
            SELECT id, name, user_id, recurring, next_amount, next_date, created_at
            FROM transaction_groups
            {}
            ORDER BY name, user_id
            "#,
            where_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let mut groups = stmt
            .query_map([], Self::row_to_group)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for group in &mut groups {
            group.members = self.group_members(&conn, group.id)?;
        }

        Ok(groups)
    }

    fn group_members(
        &self,
        conn: &super::DbConn,
        group_id: i64,
    ) -> Result<Vec<Transaction>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, trans_id, user_id, name, amount, date, created_at
            FROM transactions
            WHERE group_id = ?
            ORDER BY date, id
            "#,
        )?;

        let members = stmt
            .query_map(params![group_id], Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(members)
    }

    fn row_to_group(row: &Row<'_>) -> rusqlite::Result<TransactionGroup> {
        let next_date_str: String = row.get(5)?;
        let created_at_str: String = row.get(6)?;

        Ok(TransactionGroup {
            id: row.get(0)?,
            name: row.get(1)?,
            user_id: row.get(2)?,
            recurring: row.get(3)?,
            next_amount: row.get(4)?,
            next_date: parse_stored_datetime(&next_date_str),
            members: Vec::new(),
            created_at: parse_stored_datetime(&created_at_str),
        })
    }
}

impl GroupStore for Database {
    fn find_all_groups(&self) -> Result<Vec<TransactionGroup>> {
        self.list_groups()
    }

    fn find_recurring(&self) -> Result<Vec<TransactionGroup>> {
        self.list_recurring_groups()
    }

    fn find_or_create(
        &self,
        name: &str,
        user_id: &str,
        seed: &Transaction,
    ) -> Result<TransactionGroup> {
        self.find_or_create_group(name, user_id, seed)
    }

    fn save_group(&self, group: &TransactionGroup) -> Result<()> {
        self.save_group_row(group)
    }

    fn clear_members(&self) -> Result<()> {
        self.clear_group_members()
    }
}
