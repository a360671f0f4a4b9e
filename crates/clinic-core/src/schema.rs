//! Field schema parsing and the [`FieldDefsCollection`].
//!
//! The raw schema is a nested mapping keyed by modality:
//!
//! ```json
//! {
//!   "static":   { "age": { "data_type": "int", "min_value": 0 } },
//!   "temporal": {
//!     "time_index": { "data_type": "time_index", "time_index_type": "int" },
//!     "weight":     { "data_type": "float", "timestep_default_mode": "take_previous" }
//!   },
//!   "event":    {}
//! }
//! ```
//!
//! Parsing validates every declared default and the time-index rules up
//! front; a collection that parses is never revisited at runtime.

use chrono::{
  NaiveDate,
  format::{Item, StrftimeItems},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{
  Error, Result,
  compute::ComputationRegistry,
  engine,
  field::{DATE_FORMAT, FieldDef, FieldKind, TimestepDefaultMode},
  sample::{DataModality, DataSample, Fields, StoredFields, StoredSample, sort_timesteps},
};

/// Conventional feature name of the temporal time-index.
pub const TIME_INDEX_FIELD: &str = "time_index";

// ─── Raw input ───────────────────────────────────────────────────────────────

/// One field's attributes as written in a schema file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawFieldDef {
  pub data_type:             String,
  pub time_index_type:       Option<String>,
  pub readable_name:         Option<String>,
  pub default_value:         Option<Value>,
  pub formatting:            Option<String>,
  pub info:                  Option<String>,
  #[serde(default)]
  pub is_time_index:         bool,
  #[serde(default)]
  pub is_computed:           bool,
  /// Name of a callback in the [`ComputationRegistry`].
  pub computation:           Option<String>,
  pub min_value:             Option<Value>,
  pub max_value:             Option<Value>,
  pub step:                  Option<Value>,
  #[serde(default)]
  pub options:               Vec<String>,
  #[serde(default)]
  pub timestep_default_mode: TimestepDefaultMode,
}

/// The whole schema file, one ordered mapping per modality.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSchema {
  #[serde(rename = "static", default)]
  pub static_fields: IndexMap<String, RawFieldDef>,
  #[serde(default)]
  pub temporal:      IndexMap<String, RawFieldDef>,
  #[serde(default)]
  pub event:         IndexMap<String, RawFieldDef>,
}

// ─── Collection ──────────────────────────────────────────────────────────────

/// Feature name → definition, in declaration order.
pub type FieldDefs = IndexMap<String, FieldDef>;

/// All field definitions of one application. Immutable once parsed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldDefsCollection {
  #[serde(rename = "static")]
  pub static_defs: FieldDefs,
  pub temporal:    FieldDefs,
  pub event:       FieldDefs,
}

impl FieldDefsCollection {
  pub fn get(&self, modality: DataModality) -> &FieldDefs {
    match modality {
      DataModality::Static => &self.static_defs,
      DataModality::Temporal => &self.temporal,
      DataModality::Event => &self.event,
    }
  }

  /// The temporal time-index field, present whenever temporal fields are.
  pub fn time_index(&self) -> Option<&FieldDef> {
    self.temporal.values().find(|f| f.is_time_index)
  }

  /// Convert a stored record into a typed sample and resolve every
  /// computed field.
  ///
  /// Fields are reordered to declaration order and unknown keys are dropped.
  /// A non-computed field missing from the record (e.g. added to the schema
  /// after the record was written) is filled with its processed default.
  /// Time-steps are sorted by time-index; a time-index shared by two steps
  /// is a [`Error::Decode`].
  pub fn hydrate(&self, stored: StoredSample) -> Result<DataSample> {
    let mut sample = DataSample {
      static_data: decode_fields(&self.static_defs, &stored.static_data)?,
      temporal:    stored
        .temporal
        .iter()
        .map(|step| decode_fields(&self.temporal, step))
        .collect::<Result<_>>()?,
      event:       stored
        .event
        .iter()
        .map(|entry| decode_fields(&self.event, entry))
        .collect::<Result<_>>()?,
    };
    if sample.temporal.is_empty() {
      if !self.temporal.is_empty() {
        return Err(Error::decode("temporal", "stored sample has no time-steps"));
      }
      sample.temporal.push(Fields::new());
    }
    if let Some(ti) = self.time_index() {
      order_timesteps(&mut sample.temporal, &ti.feature_name)?;
    }
    engine::resolve_all(self, &mut sample, 0)?;
    Ok(sample)
  }

  /// Convert a typed sample into its storable form.
  pub fn dehydrate(&self, sample: &DataSample) -> StoredSample {
    StoredSample {
      static_data: encode_fields(&self.static_defs, &sample.static_data),
      temporal:    sample.temporal.iter().map(|s| encode_fields(&self.temporal, s)).collect(),
      event:       sample.event.iter().map(|e| encode_fields(&self.event, e)).collect(),
    }
  }
}

fn order_timesteps(temporal: &mut [Fields], time_index: &str) -> Result<()> {
  let in_order = temporal.is_sorted_by(|a, b| match (a.get(time_index), b.get(time_index)) {
    (Some(a), Some(b)) => a.time_order(b).is_le(),
    _ => true,
  });
  if !in_order {
    warn!(feature = time_index, "stored time-steps out of order; sorting");
    sort_timesteps(temporal, time_index);
  }

  let duplicate = temporal.windows(2).find_map(|pair| {
    match (pair[0].get(time_index), pair[1].get(time_index)) {
      (Some(a), Some(b)) if a.time_order(b).is_eq() => Some(b),
      _ => None,
    }
  });
  match duplicate {
    Some(value) => Err(Error::decode(
      time_index,
      format!("time-index {value} is stored on more than one time-step"),
    )),
    None => Ok(()),
  }
}

fn decode_fields(defs: &FieldDefs, stored: &StoredFields) -> Result<Fields> {
  let mut fields = Fields::with_capacity(defs.len());
  for (name, def) in defs {
    match stored.get(name) {
      Some(raw) if !raw.is_null() => {
        fields.insert(name.clone(), def.process_db_to_input(raw)?);
      }
      _ if def.is_computed() => {}
      _ => {
        warn!(feature = %name, modality = %def.data_modality, "stored sample lacks field; using default");
        fields.insert(name.clone(), def.processed_default());
      }
    }
  }
  Ok(fields)
}

fn encode_fields(defs: &FieldDefs, fields: &Fields) -> StoredFields {
  defs
    .iter()
    .filter_map(|(name, def)| {
      fields.get(name).map(|v| (name.clone(), def.process_input_to_db(v)))
    })
    .collect()
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

/// Parse a JSON schema document.
pub fn parse_json(json: &str, registry: &ComputationRegistry) -> Result<FieldDefsCollection> {
  let raw: RawSchema = serde_json::from_str(json)
    .map_err(|e| Error::Configuration(format!("malformed schema: {e}")))?;
  parse(raw, registry)
}

/// Build a validated [`FieldDefsCollection`] from a raw schema.
pub fn parse(raw: RawSchema, registry: &ComputationRegistry) -> Result<FieldDefsCollection> {
  if !raw.temporal.is_empty() {
    check_time_index_declaration(&raw.temporal)?;
  }

  Ok(FieldDefsCollection {
    static_defs: parse_modality(raw.static_fields, DataModality::Static, registry)?,
    temporal:    parse_modality(raw.temporal, DataModality::Temporal, registry)?,
    event:       parse_modality(raw.event, DataModality::Event, registry)?,
  })
}

fn check_time_index_declaration(temporal: &IndexMap<String, RawFieldDef>) -> Result<()> {
  let flagged: Vec<&str> = temporal
    .iter()
    .filter(|(_, f)| f.is_time_index || f.data_type == "time_index")
    .map(|(name, _)| name.as_str())
    .collect();

  if let Some(raw) = temporal.get(TIME_INDEX_FIELD)
    && !(raw.is_time_index || raw.data_type == "time_index")
  {
    return Err(Error::Configuration(format!(
      "temporal field {TIME_INDEX_FIELD:?} must be flagged as the time-index",
    )));
  }

  match flagged.as_slice() {
    [] => Err(Error::Configuration(
      "temporal fields are defined but none is flagged as the time-index".into(),
    )),
    [_] => Ok(()),
    many => Err(Error::Configuration(format!(
      "exactly one temporal time-index is allowed, found {many:?}",
    ))),
  }
}

fn parse_modality(
  raw: IndexMap<String, RawFieldDef>,
  modality: DataModality,
  registry: &ComputationRegistry,
) -> Result<FieldDefs> {
  raw
    .into_iter()
    .map(|(name, def)| {
      let parsed = parse_field(&name, def, modality, registry)?;
      Ok((name, parsed))
    })
    .collect()
}

fn parse_field(
  name: &str,
  raw: RawFieldDef,
  modality: DataModality,
  registry: &ComputationRegistry,
) -> Result<FieldDef> {
  let config = |msg: String| Error::Configuration(format!("{modality}.{name}: {msg}"));

  let (type_name, is_time_index) = if raw.data_type == "time_index" {
    let ti_type = raw
      .time_index_type
      .as_deref()
      .ok_or_else(|| config("time_index fields require `time_index_type`".into()))?;
    (ti_type, true)
  } else {
    (raw.data_type.as_str(), raw.is_time_index)
  };

  let kind = parse_kind(type_name, &raw).map_err(config)?;

  if is_time_index {
    if modality != DataModality::Temporal {
      return Err(config("only temporal fields can be a time-index".into()));
    }
    if !kind.is_orderable() {
      return Err(config(format!("a {} field cannot be a time-index", kind.name())));
    }
  }

  let computation = match (&raw.computation, raw.is_computed) {
    (Some(c), _) => Some(
      registry
        .get(c)
        .cloned()
        .ok_or_else(|| config(format!("unknown computation {c:?}")))?,
    ),
    (None, true) => return Err(config("computed fields require `computation`".into())),
    (None, false) => None,
  };
  if is_time_index && computation.is_some() {
    return Err(config("the time-index cannot be computed".into()));
  }

  if let (FieldKind::Date { .. }, Some(f)) = (&kind, &raw.formatting)
    && StrftimeItems::new(f).any(|item| item == Item::Error)
  {
    return Err(config(format!("invalid date formatting {f:?}")));
  }

  let mut def = FieldDef::new(modality, name, kind);
  def.readable_name = raw.readable_name.unwrap_or_else(|| name.to_owned());
  def.formatting = raw.formatting;
  def.info = raw.info;
  def.is_time_index = is_time_index;
  def.computation = computation;
  def.timestep_default_mode = raw.timestep_default_mode;

  if let Some(v) = &raw.default_value {
    let value = def
      .process_db_to_input(v)
      .and_then(|value| def.validate(value))
      .map_err(|e| config(format!("invalid default_value: {e}")))?;
    def.default_value = Some(value);
  }

  Ok(def)
}

fn parse_kind(type_name: &str, raw: &RawFieldDef) -> Result<FieldKind, String> {
  let kind = match type_name {
    "int" => {
      let kind = FieldKind::Int {
        min_value: bound(&raw.min_value, "min_value", as_i64)?,
        max_value: bound(&raw.max_value, "max_value", as_i64)?,
        step:      bound(&raw.step, "step", as_i64)?,
      };
      if let FieldKind::Int { min_value: Some(lo), max_value: Some(hi), .. } = kind
        && lo > hi
      {
        return Err(format!("min_value {lo} exceeds max_value {hi}"));
      }
      kind
    }
    "float" => {
      let kind = FieldKind::Float {
        min_value: bound(&raw.min_value, "min_value", Value::as_f64)?,
        max_value: bound(&raw.max_value, "max_value", Value::as_f64)?,
        step:      bound(&raw.step, "step", Value::as_f64)?,
      };
      if let FieldKind::Float { min_value: Some(lo), max_value: Some(hi), .. } = kind
        && lo > hi
      {
        return Err(format!("min_value {lo} exceeds max_value {hi}"));
      }
      kind
    }
    "categorical" => {
      if raw.options.is_empty() {
        return Err("categorical fields require at least one option".into());
      }
      FieldKind::Categorical { options: raw.options.clone() }
    }
    "binary" => FieldKind::Binary,
    "str" | "text" => FieldKind::Str,
    "date" => {
      let min_value = bound(&raw.min_value, "min_value", as_date)?;
      let max_value = bound(&raw.max_value, "max_value", as_date)?;
      if let (Some(lo), Some(hi)) = (min_value, max_value)
        && lo > hi
      {
        return Err(format!("min_value {lo} exceeds max_value {hi}"));
      }
      FieldKind::Date { min_value, max_value }
    }
    other => return Err(format!("unknown data_type {other:?}")),
  };
  Ok(kind)
}

fn bound<T>(
  value: &Option<Value>,
  attr: &str,
  read: impl Fn(&Value) -> Option<T>,
) -> Result<Option<T>, String> {
  value
    .as_ref()
    .map(|v| read(v).ok_or_else(|| format!("invalid {attr}: {v}")))
    .transpose()
}

fn as_i64(v: &Value) -> Option<i64> { v.as_i64() }

fn as_date(v: &Value) -> Option<NaiveDate> {
  v.as_str().and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
}
