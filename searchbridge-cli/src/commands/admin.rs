use anyhow::{bail, Context, Result};
use searchbridge::lifecycle::CreateIndexResult;
use searchbridge::{Backend, Config, Error};

async fn connect(config: &Config) -> Result<Backend> {
    Backend::connect(config)
        .await
        .with_context(|| format!("Failed to connect to {}", config.client.url))
}

/// Selected logical indexes, or every configured one when none are named.
fn selected<'a>(backend: &'a Backend, requested: &'a [String]) -> Result<Vec<&'a str>> {
    if requested.is_empty() {
        return Ok(backend.indexes().map(|i| i.logical()).collect());
    }
    requested
        .iter()
        .map(|logical| {
            backend.index(logical)?;
            Ok(logical.as_str())
        })
        .collect()
}

pub async fn run_info(config: &Config) -> Result<()> {
    let backend = connect(config).await?;
    let dialect = backend.dialect();

    println!("Cluster:  {}", config.client.url);
    println!("Engine:   {}", dialect.version());
    println!("Dialect:  {}", dialect.kind());
    println!();

    for handle in backend.indexes() {
        let names = handle.names();
        println!("{}", names.logical);
        println!("  Write alias: {}", names.write_alias);
        println!("  Read alias:  {}", names.read_alias);
        println!("  Lifecycle:   {}", backend.strategy(&names.logical));
        if handle.sharding().is_enabled() {
            let shards: Vec<&str> = handle
                .sharding()
                .shard_identifiers()
                .iter()
                .map(|s| s.as_str())
                .collect();
            println!("  Shards:      {}", shards.join(", "));
        } else {
            println!("  Shards:      disabled");
        }

        match backend.lifecycle().fetch_metadata(&names.logical).await? {
            None => println!("  Indexes:     (none)"),
            Some(indexes) => {
                for index in indexes {
                    let aliases: Vec<String> = index
                        .aliases
                        .iter()
                        .map(|(alias, meta)| match meta.is_write_index {
                            Some(true) => format!("{} (write)", alias),
                            _ => alias.clone(),
                        })
                        .collect();
                    println!("  Index:       {} [{}]", index.primary_name, aliases.join(", "));
                }
            }
        }
        println!();
    }
    Ok(())
}

pub async fn run_create(config: &Config, indexes: &[String]) -> Result<()> {
    let backend = connect(config).await?;
    for logical in selected(&backend, indexes)? {
        let handle = backend.index(logical)?;
        match backend.lifecycle().create_if_absent(logical, handle.schema()).await? {
            CreateIndexResult::Created => println!("{}: created {}", logical, handle.names().initial_physical),
            CreateIndexResult::AlreadyExists => println!("{}: already exists", logical),
        }
    }
    Ok(())
}

pub async fn run_validate(config: &Config, indexes: &[String]) -> Result<()> {
    let backend = connect(config).await?;
    let mut invalid = 0usize;
    for logical in selected(&backend, indexes)? {
        let handle = backend.index(logical)?;
        match backend.lifecycle().validate(logical, handle.schema()).await {
            Ok(()) => println!("{}: valid", logical),
            Err(Error::SchemaMismatch { index, report }) => {
                invalid += 1;
                println!("{}: {} differs from the expected schema", logical, index);
                println!("{}", report);
            }
            Err(e) => return Err(e.into()),
        }
    }
    if invalid > 0 {
        bail!("{} index(es) do not match their schema", invalid);
    }
    Ok(())
}

pub async fn run_update(config: &Config, indexes: &[String]) -> Result<()> {
    let backend = connect(config).await?;
    for logical in selected(&backend, indexes)? {
        let handle = backend.index(logical)?;
        let merged = backend
            .lifecycle()
            .update(logical, handle.schema())
            .await
            .with_context(|| format!("Failed to update '{}'", logical))?;
        if merged {
            println!("{}: merged new mappings", logical);
        } else {
            println!("{}: up to date", logical);
        }
    }
    Ok(())
}

pub async fn run_rollover(config: &Config, logical: &str, drop_old: bool) -> Result<()> {
    let backend = connect(config).await?;
    let result = backend.rollover(logical, drop_old).await?;

    println!("Rolled over '{}'", result.logical);
    println!("  From: {}{}", result.old_index, if result.old_dropped { " (dropped)" } else { "" });
    println!("  To:   {}", result.new_index);
    println!("  At:   {}", result.rolled_over_at.to_rfc3339());
    Ok(())
}

pub async fn run_drop(config: &Config, indexes: &[String]) -> Result<()> {
    let backend = connect(config).await?;
    for logical in selected(&backend, indexes)? {
        if backend.lifecycle().drop_if_existing(logical).await? {
            println!("{}: dropped", logical);
        } else {
            println!("{}: nothing to drop", logical);
        }
    }
    Ok(())
}
