//! Command implementations

use std::path::Path;

use anyhow::{Context, Result};
use cadence_core::{
    ClassifierConfig, Database, RawTransaction, RecurrenceEngine, TransactionGroup,
};

/// Open the database, creating it (and the schema) if needed
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("Initializing database at {}...", db_path.display());

    open_db(db_path)?;

    println!("Database initialized.");
    println!();
    println!("Next steps:");
    println!("  1. Ingest transactions: cadence ingest --file batch.json");
    println!("  2. List recurring payments: cadence recurring");

    Ok(())
}

pub fn cmd_ingest(db: &Database, file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let batch: Vec<RawTransaction> =
        serde_json::from_str(&contents).context("Expected a JSON array of transactions")?;

    println!("Ingesting {} transactions...", batch.len());

    let engine = RecurrenceEngine::new(db, db);
    let outcome = engine.ingest(&batch)?;

    println!("   Created: {}", outcome.created);
    println!("   Updated: {}", outcome.updated);
    if !outcome.rejected.is_empty() {
        println!("   Rejected: {}", outcome.rejected.len());
        for item in &outcome.rejected {
            println!("     - {}: {}", item.trans_id, item.reason);
        }
    }

    println!();
    print_recurring(&outcome.recurring);

    Ok(())
}

pub fn cmd_recurring(db: &Database) -> Result<()> {
    let engine = RecurrenceEngine::with_config(db, db, ClassifierConfig::default());
    let groups = engine.list_recurring()?;
    print_recurring(&groups);
    Ok(())
}

fn print_recurring(groups: &[TransactionGroup]) {
    if groups.is_empty() {
        println!("No recurring payments found.");
        return;
    }

    println!("Recurring payments ({}):", groups.len());
    for group in groups {
        println!(
            "   {} (user {}): {} charges, next ~{:.2} on {}",
            group.name,
            group.user_id,
            group.members.len(),
            group.next_amount,
            group.next_date.format("%Y-%m-%d")
        );
    }
}

pub async fn cmd_serve(db_path: &Path, host: &str, port: u16) -> Result<()> {
    let db = open_db(db_path)?;
    cadence_server::serve(db, host, port, ClassifierConfig::default()).await
}
