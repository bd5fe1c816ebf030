use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use searchbridge::config::LogFormat;
use searchbridge::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "searchbridge")]
#[command(about = "Manage indexes, aliases and bulk loads on Elasticsearch-family clusters")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SEARCHBRIDGE_CONFIG", default_value = "searchbridge.toml")]
    config: PathBuf,

    /// Cluster URL, overrides `client.url`
    #[arg(long, env = "SEARCHBRIDGE_URL")]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the detected dialect and the state of every configured index
    Info,

    /// Create missing indexes with their aliases
    Create {
        /// Logical indexes (default: all configured)
        indexes: Vec<String>,
    },

    /// Compare live indexes with their expected schema
    Validate {
        /// Logical indexes (default: all configured)
        indexes: Vec<String>,
    },

    /// Merge new mapping properties into live indexes
    Update {
        /// Logical indexes (default: all configured)
        indexes: Vec<String>,
    },

    /// Move a logical index to a new physical generation
    Rollover {
        index: String,

        /// Drop the previous generation afterwards
        #[arg(long)]
        drop_old: bool,
    },

    /// Drop every physical index of the given logical indexes
    Drop {
        #[arg(required = true)]
        indexes: Vec<String>,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Bulk-load NDJSON documents into a logical index
    Load {
        index: String,

        /// NDJSON file, one document per line (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Document field holding the id (random ids when absent)
        #[arg(long, default_value = "id")]
        id_field: String,

        /// Document field holding the routing key
        #[arg(long)]
        routing_field: Option<String>,

        /// Make the documents searchable once loaded
        #[arg(long)]
        refresh: bool,
    },

    /// Show which shard a document is routed to
    Route {
        index: String,

        id: String,

        #[arg(short, long)]
        routing_key: Option<String>,
    },
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone()),
    );
    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if let Some(url) = cli.url {
        config.client.url = url;
    }
    init_tracing(&config);

    match cli.command {
        Commands::Info => commands::run_info(&config).await?,
        Commands::Create { indexes } => commands::run_create(&config, &indexes).await?,
        Commands::Validate { indexes } => commands::run_validate(&config, &indexes).await?,
        Commands::Update { indexes } => commands::run_update(&config, &indexes).await?,
        Commands::Rollover { index, drop_old } => {
            commands::run_rollover(&config, &index, drop_old).await?
        }
        Commands::Drop { indexes, yes } => {
            if !yes {
                anyhow::bail!("Refusing to drop {} without --yes", indexes.join(", "));
            }
            commands::run_drop(&config, &indexes).await?
        }
        Commands::Load {
            index,
            input,
            id_field,
            routing_field,
            refresh,
        } => {
            let source = match input {
                Some(path) => commands::DocumentSource::FromFile(path),
                None => commands::DocumentSource::FromStdin,
            };
            let options = commands::LoadOptions {
                id_field,
                routing_field,
                refresh,
            };
            commands::run_load(&config, &index, source, &options).await?
        }
        Commands::Route {
            index,
            id,
            routing_key,
        } => commands::run_route(&config, &index, &id, routing_key.as_deref())?,
    }

    Ok(())
}
