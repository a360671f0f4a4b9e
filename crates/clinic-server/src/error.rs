//! Error type for schema loading.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot read {path:?}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("unsupported schema file {0:?}: expected a .json or .toml extension")]
  UnsupportedFormat(PathBuf),

  #[error("malformed TOML schema: {0}")]
  Toml(#[from] toml::de::Error),

  #[error(transparent)]
  Core(#[from] clinic_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
