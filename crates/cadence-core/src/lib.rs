//! Cadence Core Library
//!
//! Shared functionality for the Cadence recurring-payment detector:
//! - Merchant name normalization (the grouping key)
//! - Group assignment: partitioning transactions by (canonical name, user)
//! - Recurrence classification: tolerance-window interval matching and
//!   next-occurrence forecasting
//! - Repository abstractions with SQLite and in-memory implementations

pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod normalize;
pub mod store;

pub use db::Database;
pub use engine::{ClassifierConfig, IngestOutcome, RecurrenceEngine, RejectedTransaction};
pub use error::{Error, Result};
pub use models::{NewTransaction, RawTransaction, Transaction, TransactionGroup};
pub use normalize::canonical_name;
pub use store::{BatchUpsertReport, GroupStore, MemoryStore, TransactionStore};
