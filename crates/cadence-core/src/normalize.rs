//! Merchant name normalization
//!
//! Merchant labels frequently embed transaction-specific numeric suffixes
//! (store numbers, reference codes) that must be ignored when matching
//! transactions to a group. Stripping digits and trimming is intentionally
//! simple; the canonical name is the grouping key everywhere downstream.

/// Normalize a raw merchant label into a canonical name
///
/// Deletes all decimal digits, then trims surrounding whitespace.
/// Idempotent: re-normalizing a canonical name is a no-op.
pub fn canonical_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_ascii_digit())
        .collect::<String>()
        .trim()
        .to_string()
}
