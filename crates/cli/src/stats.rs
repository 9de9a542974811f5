use crate::view::format_size;
use symdex_core::SymbolIndex;

pub fn run(index: &SymbolIndex, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let stats = index.stats()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    println!("Index File:      {}", stats.path.display());
    println!("Chunks:          {}", stats.chunks);
    println!("Allocated:       {}", format_size(stats.allocated_bytes));
    println!("Free:            {}", format_size(stats.free_bytes));
    println!("Linkages:        {}", stats.linkages.join(", "));
    println!("Source Units:    {}", stats.units);
    Ok(())
}
