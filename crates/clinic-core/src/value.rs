//! In-memory field values.

use std::{cmp::Ordering, fmt};

use chrono::NaiveDate;
use serde::Serialize;

/// A typed value held by one field of a sample.
///
/// Conversion to and from the storable JSON representation is driven by the
/// owning [`crate::field::FieldDef`], because the same JSON string can be a
/// date or free text depending on the field kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
  Int(i64),
  Float(f64),
  Bool(bool),
  Date(NaiveDate),
  /// Categorical and free-text values.
  Text(String),
}

impl FieldValue {
  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Self::Int(v) => Some(*v),
      _ => None,
    }
  }

  /// Numeric view of ints and floats.
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Self::Int(v) => Some(*v as f64),
      Self::Float(v) => Some(*v),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Self::Bool(v) => Some(*v),
      _ => None,
    }
  }

  pub fn as_date(&self) -> Option<NaiveDate> {
    match self {
      Self::Date(v) => Some(*v),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::Text(v) => Some(v),
      _ => None,
    }
  }

  /// Short name of the variant, used in error messages.
  pub fn type_name(&self) -> &'static str {
    match self {
      Self::Int(_) => "int",
      Self::Float(_) => "float",
      Self::Bool(_) => "bool",
      Self::Date(_) => "date",
      Self::Text(_) => "text",
    }
  }

  /// Total order used for time-index values.
  ///
  /// Ints and floats compare numerically with each other; values of
  /// unrelated variants compare equal so that a sort never panics.
  pub fn time_order(&self, other: &Self) -> Ordering {
    match (self, other) {
      (Self::Int(a), Self::Int(b)) => a.cmp(b),
      (Self::Date(a), Self::Date(b)) => a.cmp(b),
      (Self::Text(a), Self::Text(b)) => a.cmp(b),
      (a, b) => match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        _ => Ordering::Equal,
      },
    }
  }
}

impl fmt::Display for FieldValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Int(v) => write!(f, "{v}"),
      Self::Float(v) => write!(f, "{v}"),
      Self::Bool(v) => write!(f, "{v}"),
      Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
      Self::Text(v) => f.write_str(v),
    }
  }
}

impl From<i64> for FieldValue {
  fn from(v: i64) -> Self { Self::Int(v) }
}

impl From<f64> for FieldValue {
  fn from(v: f64) -> Self { Self::Float(v) }
}

impl From<bool> for FieldValue {
  fn from(v: bool) -> Self { Self::Bool(v) }
}

impl From<NaiveDate> for FieldValue {
  fn from(v: NaiveDate) -> Self { Self::Date(v) }
}

impl From<&str> for FieldValue {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

impl From<String> for FieldValue {
  fn from(v: String) -> Self { Self::Text(v) }
}
