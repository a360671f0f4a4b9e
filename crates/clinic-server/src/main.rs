//! clinic-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), loads the
//! field schema, opens the SQLite store, and serves the JSON API over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use clinic_core::compute::ComputationRegistry;
use clinic_server::{ServerConfig, load_schema, schema_summary};
use clinic_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Clinical sample records server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Parse the field schema, print a summary and exit.
  #[arg(long)]
  check_schema: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("CLINIC"))
    .build()
    .context("failed to read config file")?;

  let home = std::env::var_os("HOME").map(PathBuf::from);
  let server_cfg: ServerConfig = settings
    .try_deserialize::<ServerConfig>()
    .context("failed to deserialise ServerConfig")?
    .with_home(home.as_deref());

  let schema_path = server_cfg.schema_path.as_path();
  let registry = ComputationRegistry::with_builtins();
  let defs = load_schema(schema_path, &registry)
    .with_context(|| format!("failed to load schema from {schema_path:?}"))?;

  if cli.check_schema {
    print!("{}", schema_summary(&defs));
    return Ok(());
  }

  let store_path = server_cfg.store_path.as_path();
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let app = clinic_server::router(Arc::new(store), Arc::new(defs));
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
