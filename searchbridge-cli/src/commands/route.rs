use anyhow::{Context, Result};
use searchbridge::naming::{IndexNames, SimpleIndexNamingStrategy};
use searchbridge::sharding::Sharding;
use searchbridge::Config;

/// Resolve a document's shard from configuration alone; the cluster is not contacted.
pub fn run_route(config: &Config, logical: &str, id: &str, routing_key: Option<&str>) -> Result<()> {
    let index_config = config
        .indexes
        .get(logical)
        .with_context(|| format!("Index '{}' is not configured", logical))?;
    let names = IndexNames::new(&SimpleIndexNamingStrategy::new(), logical)?;
    let sharding = Sharding::from_config(&names.logical, &index_config.sharding)?;

    println!("Index:    {}", names.logical);
    println!("Document: {}", id);
    match sharding.write_routing(id, routing_key)? {
        Some(routing) => println!("Shard:    {} (via {})", routing, names.write_alias),
        None => println!("Shard:    (sharding disabled)"),
    }
    Ok(())
}
