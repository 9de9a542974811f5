use crate::view::BindingRow;
use symdex_api::LinkageId;
use symdex_core::SymbolIndex;
use tabled::Table;

pub fn run(
    index: &SymbolIndex,
    linkage: &LinkageId,
    name: &str,
    prefix: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let found = index.find_qualified(linkage, name, prefix)?;

    let mut rows = Vec::with_capacity(found.len());
    for rec in found {
        rows.push(BindingRow::load(index, rec)?);
    }
    if rows.is_empty() {
        println!("No bindings named {} in {}", name, linkage);
    } else {
        println!("{}", Table::new(rows));
    }
    Ok(())
}
