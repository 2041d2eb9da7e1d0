//! Sift CLI
//!
//! Renders the filtered SELECT a query schema produces for a query string.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sea_query::PostgresQueryBuilder;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use sift_kernel::attribute::TypedValidatorFactory;
use sift_kernel::condition::{ConditionBuilder, parse_query_string};
use sift_kernel::config::Config;
use sift_kernel::container::ServiceMap;
use sift_kernel::field::QuerySchema;

#[derive(Debug, Parser)]
#[command(name = "sift", version, about = "Render filtered SELECT statements from a query schema")]
struct Cli {
    /// Query schema file (YAML, or JSON with a .json extension).
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Table to select from, overriding the schema's base table.
    #[arg(long)]
    table: Option<String>,

    /// Query string, e.g. "owner_like=%25bob%25&id[]=1&id[]=2".
    query: String,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    let schema_path = config.schema_path(cli.schema)?;
    let schema = QuerySchema::from_path(&schema_path)?;
    info!(schema = %schema_path.display(), fields = schema.fields.len(), "schema loaded");

    // No custom builders ship with the CLI; schemas routing kinds to one are
    // rejected here.
    let builders = ServiceMap::<dyn ConditionBuilder>::new();
    let filters = schema.filter_set(Arc::new(TypedValidatorFactory), Arc::new(builders))?;

    let params = parse_query_string(&cli.query)?;
    let table = cli
        .table
        .or(config.base_table)
        .unwrap_or_else(|| schema.base_table.clone());

    let sql = filters
        .select(&table, &params)?
        .to_string(PostgresQueryBuilder);
    println!("{sql}");

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
