//! Server wiring for the clinical sample API: configuration, schema loading
//! and the top-level router.

pub mod error;

use std::{fmt::Write as _, path::{Path, PathBuf}, sync::Arc};

use axum::Router;
use clinic_core::{
  compute::ComputationRegistry,
  sample::DataModality,
  schema::{FieldDefsCollection, RawSchema, parse, parse_json},
  store::SampleStore,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::{Error, Result};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CLINIC_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:        String,
  pub port:        u16,
  pub store_path:  PathBuf,
  pub schema_path: PathBuf,
}

impl ServerConfig {
  /// Resolve `~/` in both paths against `home`.
  pub fn with_home(mut self, home: Option<&Path>) -> Self {
    if let Some(home) = home {
      self.store_path = under_home(&self.store_path, home);
      self.schema_path = under_home(&self.schema_path, home);
    }
    self
  }
}

fn under_home(path: &Path, home: &Path) -> PathBuf {
  match path.strip_prefix("~") {
    Ok(rest) => home.join(rest),
    Err(_) => path.to_path_buf(),
  }
}

// ─── Schema loading ──────────────────────────────────────────────────────────

/// Encoding of a schema file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
  Json,
  Toml,
}

impl SchemaFormat {
  pub fn from_path(path: &Path) -> Option<Self> {
    match path.extension()?.to_str()? {
      "json" => Some(Self::Json),
      "toml" => Some(Self::Toml),
      _ => None,
    }
  }
}

/// Parse schema text in `format` against `registry`.
pub fn parse_schema(
  text: &str,
  format: SchemaFormat,
  registry: &ComputationRegistry,
) -> Result<FieldDefsCollection> {
  match format {
    SchemaFormat::Json => Ok(parse_json(text, registry)?),
    SchemaFormat::Toml => {
      let raw: RawSchema = toml::from_str(text)?;
      Ok(parse(raw, registry)?)
    }
  }
}

/// Read and parse the schema file at `path`.
pub fn load_schema(path: &Path, registry: &ComputationRegistry) -> Result<FieldDefsCollection> {
  let format =
    SchemaFormat::from_path(path).ok_or_else(|| Error::UnsupportedFormat(path.to_owned()))?;
  let text = std::fs::read_to_string(path)
    .map_err(|source| Error::Io { path: path.to_owned(), source })?;
  parse_schema(&text, format, registry)
}

/// One line per modality: field count, computed count and time-index.
pub fn schema_summary(defs: &FieldDefsCollection) -> String {
  let mut out = String::new();
  for modality in [DataModality::Static, DataModality::Temporal, DataModality::Event] {
    let fields = defs.get(modality);
    let computed = fields.values().filter(|f| f.is_computed()).count();
    let _ = write!(out, "{modality}: {} fields ({computed} computed)", fields.len());
    if modality == DataModality::Temporal
      && let Some(ti) = defs.time_index()
    {
      let _ = write!(out, ", time-index {:?} ({})", ti.feature_name, ti.kind.name());
    }
    out.push('\n');
  }
  out
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The API router with request tracing.
pub fn router<S>(store: Arc<S>, defs: Arc<FieldDefsCollection>) -> Router
where
  S: SampleStore + 'static,
{
  clinic_api::api_router(store, defs).layer(TraceLayer::new_for_http())
}
