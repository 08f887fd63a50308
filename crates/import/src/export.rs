use serde::Serialize;
use std::io::Write;
use tally_core::{CategorizedTransaction, MatchTier, Money};

use crate::csv::ImportError;

#[derive(Serialize)]
struct ExportRow<'a> {
    date: String,
    description: &'a str,
    category: &'a str,
    match_tier: MatchTier,
    amount: Money,
}

/// Writes categorized transactions as CSV with a header row. Undated rows
/// get an empty date cell.
pub fn write_categorized<W: Write>(
    writer: W,
    transactions: &[CategorizedTransaction],
) -> Result<(), ImportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for ct in transactions {
        wtr.serialize(ExportRow {
            date: ct
                .transaction
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            description: &ct.transaction.description,
            category: &ct.category,
            match_tier: ct.match_tier,
            amount: ct.transaction.amount,
        })?;
    }
    wtr.flush()?;
    Ok(())
}
