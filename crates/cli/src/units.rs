use crate::view::UnitRow;
use std::time::{SystemTime, UNIX_EPOCH};
use symdex_core::SymbolIndex;
use tabled::Table;

pub fn run(index: &SymbolIndex) -> Result<(), Box<dyn std::error::Error>> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let rows: Vec<UnitRow> = index
        .units()?
        .into_iter()
        .map(|unit| UnitRow::new(unit, now))
        .collect();

    if rows.is_empty() {
        println!("No source units indexed.");
    } else {
        println!("{}", Table::new(rows));
    }
    Ok(())
}
