//! Field definitions: the typed description of one feature.
//!
//! A [`FieldDef`] is flat data: a [`FieldKind`] (the base type plus its
//! type-specific constraints) and two independent capabilities, being the
//! time-index and being computed. All per-kind behaviour (default values,
//! validation, storage conversion, formatting, time-index progression) is a
//! `match` on the kind.

use chrono::{Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::{Error, Result, compute::Computation, sample::DataModality, value::FieldValue};

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The base type of a field, carrying its type-specific constraints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "data_type", rename_all = "snake_case")]
pub enum FieldKind {
  Int {
    min_value: Option<i64>,
    max_value: Option<i64>,
    step:      Option<i64>,
  },
  Float {
    min_value: Option<f64>,
    max_value: Option<f64>,
    step:      Option<f64>,
  },
  Categorical {
    options: Vec<String>,
  },
  Binary,
  Str,
  Date {
    min_value: Option<NaiveDate>,
    max_value: Option<NaiveDate>,
  },
}

impl FieldKind {
  /// The `data_type` discriminator used in schema files.
  pub fn name(&self) -> &'static str {
    match self {
      Self::Int { .. } => "int",
      Self::Float { .. } => "float",
      Self::Categorical { .. } => "categorical",
      Self::Binary => "binary",
      Self::Str => "str",
      Self::Date { .. } => "date",
    }
  }

  /// Whether a field of this kind may serve as a time-index.
  pub fn is_orderable(&self) -> bool {
    matches!(self, Self::Int { .. } | Self::Float { .. } | Self::Date { .. })
  }

  /// Formatting used when a field declares none.
  pub fn default_formatting(&self) -> &'static str {
    match self {
      Self::Int { .. } => ",d",
      Self::Float { .. } => ".2f",
      Self::Date { .. } => DATE_FORMAT,
      Self::Categorical { .. } | Self::Binary | Self::Str => "",
    }
  }
}

/// How a new time-step seeds a temporal field.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TimestepDefaultMode {
  /// Use the field's processed default.
  #[default]
  NoAction,
  /// Copy the value from the most recently added time-step.
  TakePrevious,
}

// ─── FieldDef ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct FieldDef {
  pub data_modality:         DataModality,
  pub feature_name:          String,
  pub readable_name:         String,
  #[serde(flatten)]
  pub kind:                  FieldKind,
  pub default_value:         Option<FieldValue>,
  pub formatting:            Option<String>,
  pub info:                  Option<String>,
  pub is_time_index:         bool,
  pub computation:           Option<Computation>,
  pub timestep_default_mode: TimestepDefaultMode,
}

impl FieldDef {
  /// A plain, non-computed field with no default or formatting.
  pub fn new(
    data_modality: DataModality,
    feature_name: impl Into<String>,
    kind: FieldKind,
  ) -> Self {
    let feature_name = feature_name.into();
    Self {
      data_modality,
      readable_name: feature_name.clone(),
      feature_name,
      kind,
      default_value: None,
      formatting: None,
      info: None,
      is_time_index: false,
      computation: None,
      timestep_default_mode: TimestepDefaultMode::default(),
    }
  }

  pub fn is_computed(&self) -> bool { self.computation.is_some() }

  /// Counterpart of [`Self::is_computed`]: the field takes user input.
  pub fn is_editable(&self) -> bool { !self.is_computed() }

  /// The explicit formatting string, or the kind's default.
  pub fn get_formatting(&self) -> &str {
    self
      .formatting
      .as_deref()
      .unwrap_or_else(|| self.kind.default_formatting())
  }

  /// The declared default, or one derived from the kind's constraints.
  pub fn processed_default(&self) -> FieldValue {
    if let Some(v) = &self.default_value {
      return v.clone();
    }
    match &self.kind {
      FieldKind::Int { min_value, max_value, .. } => {
        let v = min_value.unwrap_or(0);
        FieldValue::Int(max_value.map_or(v, |max| v.min(max)))
      }
      FieldKind::Float { min_value, max_value, .. } => {
        let v = min_value.unwrap_or(0.0);
        FieldValue::Float(max_value.map_or(v, |max| v.min(max)))
      }
      FieldKind::Categorical { options } => {
        FieldValue::Text(options.first().cloned().unwrap_or_default())
      }
      FieldKind::Binary => FieldValue::Bool(false),
      FieldKind::Str => FieldValue::Text(String::new()),
      FieldKind::Date { min_value, max_value } => {
        let today = Local::now().date_naive();
        let v = min_value.unwrap_or(today);
        FieldValue::Date(max_value.map_or(v, |max| v.min(max)))
      }
    }
  }

  /// Check a user-supplied value against the kind and its constraints.
  ///
  /// Ints are widened for float fields; every other mismatch is a
  /// [`Error::Validation`].
  pub fn validate(&self, value: FieldValue) -> Result<FieldValue> {
    let name = &self.feature_name;
    let mismatch = |v: &FieldValue| {
      Error::validation(
        name,
        format!("expected a {} value, got {}", self.kind.name(), v.type_name()),
      )
    };

    match &self.kind {
      FieldKind::Int { min_value, max_value, .. } => {
        let v = value.as_i64().ok_or_else(|| mismatch(&value))?;
        check_bounds(name, v, *min_value, *max_value)?;
        Ok(FieldValue::Int(v))
      }
      FieldKind::Float { min_value, max_value, .. } => {
        let v = value.as_f64().ok_or_else(|| mismatch(&value))?;
        if !v.is_finite() {
          return Err(Error::validation(name, "value must be finite"));
        }
        check_bounds(name, v, *min_value, *max_value)?;
        Ok(FieldValue::Float(v))
      }
      FieldKind::Categorical { options } => {
        let v = value.as_str().ok_or_else(|| mismatch(&value))?;
        if !options.iter().any(|o| o == v) {
          return Err(Error::validation(
            name,
            format!("{v:?} is not one of {options:?}"),
          ));
        }
        Ok(value)
      }
      FieldKind::Binary => value.as_bool().map(FieldValue::Bool).ok_or_else(|| mismatch(&value)),
      FieldKind::Str => match value {
        FieldValue::Text(_) => Ok(value),
        other => Err(mismatch(&other)),
      },
      FieldKind::Date { min_value, max_value } => {
        let v = value.as_date().ok_or_else(|| mismatch(&value))?;
        check_bounds(name, v, *min_value, *max_value)?;
        Ok(FieldValue::Date(v))
      }
    }
  }

  /// Convert an in-memory value to its storable JSON form.
  pub fn process_input_to_db(&self, value: &FieldValue) -> Value {
    match (&self.kind, value) {
      (FieldKind::Float { .. }, v) => v.as_f64().map_or(Value::Null, Value::from),
      (_, FieldValue::Int(v)) => Value::from(*v),
      (_, FieldValue::Float(v)) => Value::from(*v),
      (_, FieldValue::Bool(v)) => Value::Bool(*v),
      (_, FieldValue::Date(v)) => Value::String(v.format(DATE_FORMAT).to_string()),
      (_, FieldValue::Text(v)) => Value::String(v.clone()),
    }
  }

  /// Convert a stored JSON value back into the field's in-memory type.
  pub fn process_db_to_input(&self, value: &Value) -> Result<FieldValue> {
    let name = &self.feature_name;
    let fail = || {
      Error::decode(name, format!("cannot read {value} as {}", self.kind.name()))
    };

    match &self.kind {
      FieldKind::Int { .. } => match value {
        Value::Number(n) => n
          .as_i64()
          .or_else(|| n.as_f64().and_then(whole_i64))
          .map(FieldValue::Int)
          .ok_or_else(fail),
        Value::String(s) => s.trim().parse().map(FieldValue::Int).map_err(|_| fail()),
        _ => Err(fail()),
      },
      FieldKind::Float { .. } => match value {
        Value::Number(n) => n.as_f64().map(FieldValue::Float).ok_or_else(fail),
        Value::String(s) => s.trim().parse().map(FieldValue::Float).map_err(|_| fail()),
        _ => Err(fail()),
      },
      FieldKind::Binary => match value {
        Value::Bool(b) => Ok(FieldValue::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
          Some(0) => Ok(FieldValue::Bool(false)),
          Some(1) => Ok(FieldValue::Bool(true)),
          _ => Err(fail()),
        },
        _ => Err(fail()),
      },
      FieldKind::Categorical { .. } | FieldKind::Str => match value {
        Value::String(s) => Ok(FieldValue::Text(s.clone())),
        Value::Number(n) => Ok(FieldValue::Text(n.to_string())),
        _ => Err(fail()),
      },
      FieldKind::Date { .. } => match value {
        Value::String(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
          .map(FieldValue::Date)
          .map_err(|_| fail()),
        _ => Err(fail()),
      },
    }
  }

  /// The time-index value following `previous`: `+1` for numbers, `+1 day`
  /// for dates.
  pub fn get_next(&self, previous: &FieldValue) -> Result<FieldValue> {
    let unsupported = || {
      Error::InvalidOperation(format!(
        "cannot advance {} time-index {:?} from {previous}",
        self.kind.name(),
        self.feature_name,
      ))
    };

    match (&self.kind, previous) {
      (FieldKind::Int { .. }, FieldValue::Int(v)) => {
        v.checked_add(1).map(FieldValue::Int).ok_or_else(unsupported)
      }
      (FieldKind::Float { .. }, v) => {
        v.as_f64().map(|f| FieldValue::Float(f + 1.0)).ok_or_else(unsupported)
      }
      (FieldKind::Date { .. }, FieldValue::Date(d)) => d
        .checked_add_days(Days::new(1))
        .map(FieldValue::Date)
        .ok_or_else(unsupported),
      _ => Err(unsupported()),
    }
  }
}

fn check_bounds<T>(feature: &str, v: T, min: Option<T>, max: Option<T>) -> Result<()>
where
  T: PartialOrd + std::fmt::Display + Copy,
{
  if let Some(min) = min
    && v < min
  {
    return Err(Error::validation(feature, format!("{v} is below the minimum {min}")));
  }
  if let Some(max) = max
    && v > max
  {
    return Err(Error::validation(feature, format!("{v} is above the maximum {max}")));
  }
  Ok(())
}

/// `f` as an `i64` if it is a whole number within range.
fn whole_i64(f: f64) -> Option<i64> {
  // i64::MAX as f64 rounds up to 2^63, which is out of range.
  let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
  (f.fract() == 0.0 && in_range).then_some(f as i64)
}
