//! Sample records holding one subject's data per modality.
//!
//! [`DataSample`] is the in-memory, typed form. [`StoredSample`] is the
//! self-describing JSON object written to the persistence store; converting
//! between the two goes through the schema (see
//! [`crate::schema::FieldDefsCollection::hydrate`]).

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::value::FieldValue;

// ─── Modality ────────────────────────────────────────────────────────────────

/// Which block of a sample a field belongs to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DataModality {
  /// Per-sample, time-invariant.
  Static,
  /// One entry per time-step, ordered by the time-index.
  Temporal,
  /// One entry per occurrence.
  Event,
}

// ─── In-memory sample ────────────────────────────────────────────────────────

/// Feature name → value, in schema declaration order.
pub type Fields = IndexMap<String, FieldValue>;

/// The in-memory record for one subject.
///
/// Invariants maintained by [`crate::mutation::SampleEditor`]:
/// - `temporal` always holds at least one time-step;
/// - every time-step has the same key set;
/// - time-index values are unique and ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataSample {
  #[serde(rename = "static")]
  pub static_data: Fields,
  pub temporal:    Vec<Fields>,
  pub event:       Vec<Fields>,
}

impl DataSample {
  /// The value of `feature` across all time-steps, in order. Steps missing
  /// the feature are skipped.
  pub fn temporal_series<'a>(
    &'a self,
    feature: &'a str,
  ) -> impl Iterator<Item = &'a FieldValue> + 'a {
    self.temporal.iter().filter_map(move |step| step.get(feature))
  }
}

/// Stable sort of time-steps by `time_index`. Steps without one go last.
pub(crate) fn sort_timesteps(temporal: &mut [Fields], time_index: &str) {
  temporal.sort_by(|a, b| match (a.get(time_index), b.get(time_index)) {
    (Some(a), Some(b)) => a.time_order(b),
    (Some(_), None) => Ordering::Less,
    (None, Some(_)) => Ordering::Greater,
    (None, None) => Ordering::Equal,
  });
}

// ─── Stored sample ───────────────────────────────────────────────────────────

/// Feature name → storable JSON primitive.
pub type StoredFields = serde_json::Map<String, serde_json::Value>;

/// The persisted shape of a sample:
///
/// ```json
/// { "static": {...}, "temporal": [{...}, ...], "event": [{...}, ...] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredSample {
  #[serde(rename = "static", default)]
  pub static_data: StoredFields,
  #[serde(default)]
  pub temporal:    Vec<StoredFields>,
  #[serde(default)]
  pub event:       Vec<StoredFields>,
}

impl StoredSample {
  pub fn to_json(&self) -> crate::Result<String> { Ok(serde_json::to_string(self)?) }

  pub fn from_json(s: &str) -> crate::Result<Self> { Ok(serde_json::from_str(s)?) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn stored_sample_uses_static_key() {
    let json = r#"{"static":{"age":40},"temporal":[{"time_index":0}],"event":[]}"#;
    let stored = StoredSample::from_json(json).unwrap();
    assert_eq!(stored.static_data["age"], 40);
    assert_eq!(stored.temporal.len(), 1);
    assert_eq!(stored.to_json().unwrap(), json);
  }

  #[test]
  fn missing_blocks_default_to_empty() {
    let stored = StoredSample::from_json(r#"{"static":{}}"#).unwrap();
    assert!(stored.temporal.is_empty());
    assert!(stored.event.is_empty());
  }

  #[test]
  fn modality_parses_from_lowercase() {
    assert_eq!("temporal".parse::<DataModality>().unwrap(), DataModality::Temporal);
    assert_eq!(DataModality::Event.to_string(), "event");
  }
}
