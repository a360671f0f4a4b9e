//! Default-value derivation and computed-field resolution.
//!
//! Within one modality, non-computed fields always resolve before computed
//! ones: defaults are produced for every non-computed field first, and only
//! then are the computed fields evaluated against a sample that already holds
//! them. Computed fields of the same pass all observe the same snapshot, so
//! they must not depend on each other.
//!
//! Across modalities, computations cascade static → temporal → event.

use crate::{
  Error, Result,
  field::{FieldDef, TimestepDefaultMode},
  sample::{DataModality, DataSample, Fields},
  schema::{FieldDefs, FieldDefsCollection},
  value::FieldValue,
};

/// Where a default row is being created.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultContext {
  /// The row is the first time-step of a brand new sample; `take_previous`
  /// has nothing to take and the time-index starts from its own default.
  pub first_timestep:   bool,
  /// Row handed to static computations.
  pub current_timestep: usize,
}

impl DefaultContext {
  pub fn first() -> Self { Self { first_timestep: true, current_timestep: 0 } }

  pub fn at(current_timestep: usize) -> Self {
    Self { first_timestep: false, current_timestep }
  }
}

// ─── Single values ───────────────────────────────────────────────────────────

/// Default value of one non-computed field for a new row of its modality.
///
/// - the temporal time-index advances from the greatest existing value via
///   [`FieldDef::get_next`];
/// - temporal fields in `take_previous` mode copy the most recently added
///   time-step;
/// - everything else takes the field's processed default.
pub fn get_default_value(
  field: &FieldDef,
  sample: &DataSample,
  ctx: DefaultContext,
) -> Result<FieldValue> {
  if field.data_modality != DataModality::Temporal || ctx.first_timestep {
    return Ok(field.processed_default());
  }

  if field.is_time_index {
    return match max_time_index(field, sample) {
      Some(max) => field.get_next(max),
      None => Ok(field.processed_default()),
    };
  }

  let previous = match field.timestep_default_mode {
    TimestepDefaultMode::TakePrevious => sample
      .temporal
      .last()
      .and_then(|step| step.get(&field.feature_name))
      .cloned(),
    TimestepDefaultMode::NoAction => None,
  };
  Ok(previous.unwrap_or_else(|| field.processed_default()))
}

fn max_time_index<'a>(field: &'a FieldDef, sample: &'a DataSample) -> Option<&'a FieldValue> {
  sample
    .temporal_series(&field.feature_name)
    .max_by(|a, b| a.time_order(b))
}

/// Evaluate a computed field against `sample` at `row`.
///
/// The result is checked against the field's kind and bounds.
pub fn compute(field: &FieldDef, sample: &DataSample, row: usize) -> Result<FieldValue> {
  let computation = field.computation.as_ref().ok_or_else(|| {
    Error::InvalidOperation(format!("{:?} is not a computed field", field.feature_name))
  })?;

  let failed = |message: String| Error::Computation {
    feature: field.feature_name.clone(),
    message,
  };
  let value = computation.call(sample, row).map_err(|e| failed(e.to_string()))?;
  field.validate(value).map_err(|e| failed(e.to_string()))
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// A complete default row for `modality`, computed fields included.
///
/// `sample` is the sample the row will join. For static, the row replaces
/// the static block; for temporal and event, it is appended.
pub fn get_default(
  defs: &FieldDefsCollection,
  modality: DataModality,
  sample: &DataSample,
  ctx: DefaultContext,
) -> Result<Fields> {
  let field_defs = defs.get(modality);

  let mut row = Fields::with_capacity(field_defs.len());
  for def in field_defs.values().filter(|d| d.is_editable()) {
    row.insert(def.feature_name.clone(), get_default_value(def, sample, ctx)?);
  }

  if !field_defs.values().any(FieldDef::is_computed) {
    return Ok(row);
  }

  let mut scratch = sample.clone();
  let index = match modality {
    DataModality::Static => {
      scratch.static_data = row;
      ctx.current_timestep
    }
    DataModality::Temporal => {
      scratch.temporal.push(row);
      scratch.temporal.len() - 1
    }
    DataModality::Event => {
      scratch.event.push(row);
      scratch.event.len() - 1
    }
  };
  resolve_row(defs, modality, &mut scratch, index)?;

  let resolved = match modality {
    DataModality::Static => Some(scratch.static_data),
    DataModality::Temporal => scratch.temporal.pop(),
    DataModality::Event => scratch.event.pop(),
  };
  resolved.ok_or_else(|| Error::InvalidOperation("default row vanished".into()))
}

/// Re-evaluate every computed field of `modality` at `row`, in place.
///
/// For static, `row` is the current time-step handed to the callbacks.
pub fn resolve_row(
  defs: &FieldDefsCollection,
  modality: DataModality,
  sample: &mut DataSample,
  row: usize,
) -> Result<()> {
  let field_defs = defs.get(modality);

  let mut computed = Vec::new();
  for def in field_defs.values().filter(|d| d.is_computed()) {
    computed.push((def.feature_name.clone(), compute(def, sample, row)?));
  }
  if computed.is_empty() {
    return Ok(());
  }

  let fields = row_mut(sample, modality, row).ok_or_else(|| {
    Error::InvalidOperation(format!("no {modality} row at index {row}"))
  })?;
  fields.extend(computed);
  order_like(field_defs, fields);
  Ok(())
}

/// Resolve every computed field of the sample: static first, then every
/// time-step, then every event.
pub fn resolve_all(
  defs: &FieldDefsCollection,
  sample: &mut DataSample,
  current_timestep: usize,
) -> Result<()> {
  resolve_row(defs, DataModality::Static, sample, current_timestep)?;
  for i in 0..sample.temporal.len() {
    resolve_row(defs, DataModality::Temporal, sample, i)?;
  }
  for i in 0..sample.event.len() {
    resolve_row(defs, DataModality::Event, sample, i)?;
  }
  Ok(())
}

fn row_mut(sample: &mut DataSample, modality: DataModality, row: usize) -> Option<&mut Fields> {
  match modality {
    DataModality::Static => Some(&mut sample.static_data),
    DataModality::Temporal => sample.temporal.get_mut(row),
    DataModality::Event => sample.event.get_mut(row),
  }
}

/// Reorder `fields` to declaration order.
pub(crate) fn order_like(defs: &FieldDefs, fields: &mut Fields) {
  let position = |k: &String| defs.get_index_of(k).unwrap_or(usize::MAX);
  fields.sort_by(|k1, _, k2, _| position(k1).cmp(&position(k2)));
}
