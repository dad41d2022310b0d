//! Database tests

use super::*;
use crate::models::NewTransaction;
use crate::store::{GroupStore, TransactionStore};
use chrono::TimeZone;

fn new_tx(trans_id: &str, user_id: &str, name: &str, amount: f64, ymd: (i32, u32, u32)) -> NewTransaction {
    NewTransaction {
        trans_id: trans_id.to_string(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        amount,
        date: Utc
            .with_ymd_and_hms(ymd.0, ymd.1, ymd.2, 0, 0, 0)
            .unwrap(),
    }
}

#[test]
fn test_in_memory_db() {
    let db = Database::in_memory().unwrap();
    assert!(db.list_transactions().unwrap().is_empty());
    assert!(db.list_groups().unwrap().is_empty());
}

#[test]
fn test_upsert_batch_dedupes_by_trans_id() {
    let db = Database::in_memory().unwrap();

    let report = db
        .upsert_transactions(&[
            new_tx("t1", "u1", "Netflix 1", 15.99, (2024, 1, 1)),
            new_tx("t2", "u1", "Netflix 2", 15.99, (2024, 2, 1)),
        ])
        .unwrap();
    assert_eq!(report.created, 2);
    assert_eq!(report.updated, 0);

    // Same external ids: updated in place, nothing new
    let report = db
        .upsert_transactions(&[new_tx("t1", "u1", "Netflix 1", 16.99, (2024, 1, 1))])
        .unwrap();
    assert_eq!(report.created, 0);
    assert_eq!(report.updated, 1);

    let all = db.list_transactions().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].trans_id, "t1");
    assert_eq!(all[0].amount, 16.99);
}

#[test]
fn test_transaction_round_trip_preserves_date() {
    let db = Database::in_memory().unwrap();
    db.upsert_transactions(&[new_tx("t1", "u1", "Rent", 1200.0, (2024, 3, 15))])
        .unwrap();

    let tx = &db.list_transactions().unwrap()[0];
    assert_eq!(tx.date, Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap());
}

#[test]
fn test_find_or_create_group_seeds_forecast() {
    let db = Database::in_memory().unwrap();
    db.upsert_transactions(&[new_tx("t1", "u1", "Netflix 1", 15.99, (2024, 1, 1))])
        .unwrap();
    let seed = db.list_transactions().unwrap().remove(0);

    let group = db.find_or_create_group("Netflix", "u1", &seed).unwrap();
    assert_eq!(group.name, "Netflix");
    assert!(!group.recurring);
    assert_eq!(group.next_amount, 15.99);
    assert_eq!(group.next_date, seed.date);
    assert!(group.members.is_empty());

    // Same identity returns the same row
    let again = db.find_or_create_group("Netflix", "u1", &seed).unwrap();
    assert_eq!(again.id, group.id);

    // Different user is a different group
    let other = db.find_or_create_group("Netflix", "u2", &seed).unwrap();
    assert_ne!(other.id, group.id);
}

#[test]
fn test_save_group_relinks_members() {
    let db = Database::in_memory().unwrap();
    db.upsert_transactions(&[
        new_tx("t1", "u1", "Gym 1", 30.0, (2024, 1, 1)),
        new_tx("t2", "u1", "Gym 2", 30.0, (2024, 2, 1)),
    ])
    .unwrap();
    let members = db.list_transactions().unwrap();

    let mut group = db.find_or_create_group("Gym", "u1", &members[0]).unwrap();
    group.members = members;
    db.save_group_row(&group).unwrap();

    let loaded = db.get_group(group.id).unwrap();
    assert_eq!(loaded.members.len(), 2);

    // clear_members detaches transactions but keeps the group row
    db.clear_group_members().unwrap();
    let loaded = db.get_group(group.id).unwrap();
    assert!(loaded.members.is_empty());
    assert_eq!(db.list_groups().unwrap().len(), 1);
}

#[test]
fn test_recurring_listing_is_sorted_by_name() {
    let db = Database::in_memory().unwrap();
    db.upsert_transactions(&[new_tx("t1", "u1", "Seed", 1.0, (2024, 1, 1))])
        .unwrap();
    let seed = db.list_transactions().unwrap().remove(0);

    for name in ["Zoo Pass", "Netflix", "Audible"] {
        let mut group = db.find_or_create_group(name, "u1", &seed).unwrap();
        group.recurring = true;
        db.save_group_row(&group).unwrap();
    }
    // A non-recurring group stays out of the listing
    db.find_or_create_group("Gym", "u1", &seed).unwrap();

    let recurring = db.list_recurring_groups().unwrap();
    let names: Vec<&str> = recurring.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Audible", "Netflix", "Zoo Pass"]);
}

#[test]
fn test_store_traits_delegate() {
    let db = Database::in_memory().unwrap();
    let report = TransactionStore::upsert_batch(
        &db,
        &[new_tx("t1", "u1", "Rent", 1200.0, (2024, 1, 1))],
    )
    .unwrap();
    assert_eq!(report.created, 1);

    let all = TransactionStore::find_all(&db).unwrap();
    assert_eq!(all.len(), 1);

    let group = GroupStore::find_or_create(&db, "Rent", "u1", &all[0]).unwrap();
    assert_eq!(group.user_id, "u1");
    assert!(GroupStore::find_recurring(&db).unwrap().is_empty());
}
