//! Computed-field callbacks.
//!
//! A schema file can only name a computation; the callback itself is
//! registered in code with a [`ComputationRegistry`] and looked up by name
//! when the schema is parsed.

use std::{collections::HashMap, fmt, sync::Arc};

use serde::{Serialize, Serializer};

use crate::{Result, sample::DataSample, value::FieldValue};

/// Signature of a computation callback.
///
/// The `usize` argument is the row being resolved: the time-step index for
/// temporal fields, the event index for event fields, and the session's
/// current time-step for static fields.
pub type ComputeFn = dyn Fn(&DataSample, usize) -> Result<FieldValue> + Send + Sync;

/// A named, shareable computation attached to a field definition.
#[derive(Clone)]
pub struct Computation {
  name: String,
  func: Arc<ComputeFn>,
}

impl Computation {
  pub fn new<F>(name: impl Into<String>, func: F) -> Self
  where
    F: Fn(&DataSample, usize) -> Result<FieldValue> + Send + Sync + 'static,
  {
    Self { name: name.into(), func: Arc::new(func) }
  }

  pub fn call(&self, sample: &DataSample, row: usize) -> Result<FieldValue> {
    (self.func)(sample, row)
  }
}

impl fmt::Debug for Computation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Computation").field(&self.name).finish()
  }
}

impl Serialize for Computation {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.name)
  }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Name → computation lookup consulted by [`crate::schema::parse`].
#[derive(Clone, Default)]
pub struct ComputationRegistry {
  entries: HashMap<String, Computation>,
}

impl ComputationRegistry {
  pub fn new() -> Self { Self::default() }

  /// A registry pre-populated with the schema-independent builtins:
  ///
  /// - `timestep_count`: number of time-steps in the sample;
  /// - `timestep_number`: 1-based position of the row being resolved.
  pub fn with_builtins() -> Self {
    let mut registry = Self::new();
    registry.register("timestep_count", |sample, _| {
      Ok(FieldValue::Int(sample.temporal.len() as i64))
    });
    registry.register("timestep_number", |_, row| Ok(FieldValue::Int(row as i64 + 1)));
    registry
  }

  /// Register `func` under `name`, replacing any previous entry.
  pub fn register<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
  where
    F: Fn(&DataSample, usize) -> Result<FieldValue> + Send + Sync + 'static,
  {
    let name = name.into();
    self.entries.insert(name.clone(), Computation::new(name, func));
    self
  }

  pub fn get(&self, name: &str) -> Option<&Computation> { self.entries.get(name) }

  pub fn names(&self) -> impl Iterator<Item = &str> { self.entries.keys().map(String::as_str) }
}

impl fmt::Debug for ComputationRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set().entries(self.entries.keys()).finish()
  }
}
