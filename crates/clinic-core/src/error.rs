//! Error types for `clinic-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The field schema is malformed. Fatal at startup.
  #[error("configuration error: {0}")]
  Configuration(String),

  /// User-submitted data violates a data-level invariant. Nothing was mutated.
  #[error("invalid value for {feature:?}: {message}")]
  Validation { feature: String, message: String },

  /// A structurally disallowed mutation was attempted.
  #[error("invalid operation: {0}")]
  InvalidOperation(String),

  #[error("too many records: listing supports at most {limit} keys")]
  TooManyRecords { limit: usize },

  #[error("sample not found: {0:?}")]
  SampleNotFound(String),

  /// A stored value could not be converted back into its field type.
  #[error("cannot decode stored value for {feature:?}: {message}")]
  Decode { feature: String, message: String },

  #[error("computation for {feature:?} failed: {message}")]
  Computation { feature: String, message: String },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn validation(
    feature: impl Into<String>,
    message: impl Into<String>,
  ) -> Self {
    Self::Validation { feature: feature.into(), message: message.into() }
  }

  pub(crate) fn decode(
    feature: impl Into<String>,
    message: impl Into<String>,
  ) -> Self {
    Self::Decode { feature: feature.into(), message: message.into() }
  }

  /// Wrap a backend error so it can cross the [`crate::store::SampleStore`]
  /// boundary.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// Whether the error is recoverable inline in the same interaction.
  pub fn is_validation(&self) -> bool { matches!(self, Self::Validation { .. }) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
