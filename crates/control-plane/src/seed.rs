//! Demo warehouse data.
//!
//! Two ledgers that almost reconcile: the bank statement lacks the last
//! three general ledger entries.

use autoflow_tools::Table;
use chrono::{Days, NaiveDate};
use serde_json::{json, Value};

use crate::db::models::WriteMode;
use crate::db::queries::warehouse;
use crate::db::DbPool;
use crate::error::AppResult;

const AMOUNTS: [f64; 5] = [100.50, 200.00, -50.00, 1200.00, 45.00];
const DESCRIPTIONS: [&str; 5] = ["Service Fee", "Consulting", "Refund", "Retainer", "Supplies"];
const BANK_REFS: [&str; 7] = ["REF-A", "REF-B", "REF-C", "REF-D", "REF-E", "REF-F", "REF-G"];

fn txn_id(i: usize) -> Value {
    json!(format!("GL-{}", 1001 + i))
}

fn date(i: usize) -> Value {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    let day = start.checked_add_days(Days::new(i as u64)).unwrap_or(start);
    json!(day.format("%Y-%m-%d").to_string())
}

/// General ledger: 20 entries cycling through five amounts.
pub fn gl_transactions() -> Table {
    let rows = (0..20)
        .map(|i| vec![txn_id(i), date(i), json!(AMOUNTS[i % 5]), json!(DESCRIPTIONS[i % 5])])
        .collect();
    Table::from_rows(
        vec!["txn_id".into(), "date".into(), "amount".into(), "description".into()],
        rows,
    )
}

/// Bank statement: the first 17 ledger entries.
pub fn bank_statement() -> Table {
    let rows = (0..17)
        .map(|i| {
            let reference = if i < 15 { BANK_REFS[i % 5] } else { BANK_REFS[i - 10] };
            vec![txn_id(i), date(i), json!(AMOUNTS[i % 5]), json!(reference)]
        })
        .collect();
    Table::from_rows(
        vec!["txn_id".into(), "date".into(), "amount".into(), "bank_ref".into()],
        rows,
    )
}

/// Drop and recreate the demo tables.
pub async fn seed_warehouse(pool: &DbPool) -> AppResult<()> {
    for (name, table) in [
        ("gl_transactions", gl_transactions()),
        ("bank_statement", bank_statement()),
    ] {
        warehouse::drop_table(pool, name).await?;
        warehouse::write_table(pool, name, &table, WriteMode::Replace).await?;
    }

    tracing::info!("Data warehouse seeded");
    Ok(())
}
