//! [`SampleEditor`]: validated add/update/delete operations on samples.
//!
//! Every operation works on a copy of the sample and only commits it (to the
//! caller's `&mut DataSample` and to the session pointers) after the single
//! persistence write succeeded. A failed operation leaves the caller's state
//! exactly as it was.

use tracing::{debug, info};

use crate::{
  Error, Result,
  engine::{self, DefaultContext},
  sample::{DataModality, DataSample, Fields, StoredFields, sort_timesteps},
  schema::{FieldDefs, FieldDefsCollection},
  session::{Action, SessionContext},
  store::SampleStore,
};

// ─── Confirmation payloads ───────────────────────────────────────────────────

/// The data a presentation layer submits when the user confirms an action.
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmation {
  AddSample { key: String },
  DeleteSample,
  EditStatic(Fields),
  /// Values for the current time-step.
  EditTemporal(Fields),
  EditEvent { index: usize, values: Fields },
  AddTemporal,
  AddEvent,
  /// Deletes the current time-step.
  DeleteTemporal,
  DeleteEvent { index: usize },
}

impl Confirmation {
  pub fn action(&self) -> Action {
    match self {
      Self::AddSample { .. } => Action::AddSample,
      Self::DeleteSample => Action::DeleteSample,
      Self::EditStatic(_) => Action::EditStatic,
      Self::EditTemporal(_) => Action::EditTemporal,
      Self::EditEvent { .. } => Action::EditEvent,
      Self::AddTemporal => Action::AddTemporal,
      Self::AddEvent => Action::AddEvent,
      Self::DeleteTemporal => Action::DeleteTemporal,
      Self::DeleteEvent { .. } => Action::DeleteEvent,
    }
  }
}

// ─── Editor ──────────────────────────────────────────────────────────────────

/// Binds a schema to a store and performs sample mutations against both.
pub struct SampleEditor<'a, S> {
  store: &'a S,
  defs:  &'a FieldDefsCollection,
}

impl<'a, S: SampleStore> SampleEditor<'a, S> {
  pub fn new(store: &'a S, defs: &'a FieldDefsCollection) -> Self { Self { store, defs } }

  pub fn defs(&self) -> &FieldDefsCollection { self.defs }

  // ── Reads ───────────────────────────────────────────────────────────────

  pub async fn list_keys(&self) -> Result<Vec<String>> {
    self.store.list_keys().await.map_err(Into::into)
  }

  /// Fetch and hydrate the sample under `key`.
  pub async fn load(&self, key: &str) -> Result<DataSample> {
    let stored = self
      .store
      .get(key)
      .await
      .map_err(Into::into)?
      .ok_or_else(|| Error::SampleNotFound(key.to_owned()))?;
    self.defs.hydrate(stored)
  }

  /// Make `key` the current sample, starting at its first time-step.
  pub async fn select_sample(
    &self,
    session: &mut SessionContext,
    key: &str,
  ) -> Result<DataSample> {
    require_showing(session, "select a sample")?;
    let sample = self.load(key).await?;
    session.current_sample = Some(key.to_owned());
    session.current_timestep = 0;
    Ok(sample)
  }

  /// Make `key` the current sample without decoding its record, so that a
  /// record the schema can no longer read can still be deleted.
  pub async fn select_key(&self, session: &mut SessionContext, key: &str) -> Result<()> {
    require_showing(session, "select a sample")?;
    if self.store.get(key).await.map_err(Into::into)?.is_none() {
      return Err(Error::SampleNotFound(key.to_owned()));
    }
    session.current_sample = Some(key.to_owned());
    session.current_timestep = 0;
    Ok(())
  }

  /// Move the time-step pointer and refresh static computed fields for the
  /// new time-step.
  pub fn select_timestep(
    &self,
    session: &mut SessionContext,
    sample: &mut DataSample,
    index: usize,
  ) -> Result<()> {
    require_showing(session, "select a time-step")?;
    check_index(DataModality::Temporal, index, sample.temporal.len())?;
    engine::resolve_row(self.defs, DataModality::Static, sample, index)?;
    session.current_timestep = index;
    Ok(())
  }

  // ── Samples ─────────────────────────────────────────────────────────────

  /// A fresh sample holding defaults for every modality: one time-step, and
  /// one event entry if event fields are defined.
  pub fn new_sample(&self) -> Result<DataSample> {
    let defs = self.defs;
    let ctx = DefaultContext::first();

    let mut sample = DataSample::default();
    sample.static_data = engine::get_default(defs, DataModality::Static, &sample, ctx)?;
    let first = engine::get_default(defs, DataModality::Temporal, &sample, ctx)?;
    sample.temporal.push(first);
    if !defs.event.is_empty() {
      let entry = engine::get_default(defs, DataModality::Event, &sample, ctx)?;
      sample.event.push(entry);
    }
    // Static computations may aggregate temporal data, which only exists now.
    engine::resolve_row(defs, DataModality::Static, &mut sample, 0)?;
    Ok(sample)
  }

  /// Create, persist and select a new sample under `key`.
  pub async fn add_sample(
    &self,
    session: &mut SessionContext,
    key: &str,
  ) -> Result<DataSample> {
    if self.store.get(key).await.map_err(Into::into)?.is_some() {
      return Err(Error::InvalidOperation(format!("sample {key:?} already exists")));
    }
    let sample = self.new_sample()?;

    info!(key, "adding sample");
    self.persist(key, &sample).await?;

    session.current_sample = Some(key.to_owned());
    session.current_timestep = 0;
    Ok(sample)
  }

  /// Delete the current sample from the store and clear the selection.
  pub async fn delete_sample(&self, session: &mut SessionContext) -> Result<()> {
    let key = session.require_sample()?.to_owned();

    info!(key, "deleting sample");
    self.store.delete(&key).await.map_err(Into::into)?;

    session.current_sample = None;
    session.current_timestep = 0;
    Ok(())
  }

  // ── Static ──────────────────────────────────────────────────────────────

  /// Replace static values with validated user input.
  ///
  /// Static computed fields are re-resolved, then the temporal computed
  /// fields of the current time-step only.
  pub async fn update_static(
    &self,
    session: &mut SessionContext,
    sample: &mut DataSample,
    values: Fields,
  ) -> Result<()> {
    let key = session.require_sample()?.to_owned();
    let current = session.current_timestep;
    check_index(DataModality::Temporal, current, sample.temporal.len())?;
    let values = validate_input(&self.defs.static_defs, values)?;

    let mut updated = sample.clone();
    merge(&self.defs.static_defs, &mut updated.static_data, values);
    engine::resolve_row(self.defs, DataModality::Static, &mut updated, current)?;
    engine::resolve_row(self.defs, DataModality::Temporal, &mut updated, current)?;

    self.persist(&key, &updated).await?;
    *sample = updated;
    Ok(())
  }

  // ── Temporal ────────────────────────────────────────────────────────────

  /// Replace the current time-step with validated user input.
  ///
  /// A submitted time-index equal to another step's is a validation error.
  /// On success the steps are re-sorted by time-index and the time-step
  /// pointer follows the edited step to its new position.
  pub async fn update_temporal(
    &self,
    session: &mut SessionContext,
    sample: &mut DataSample,
    values: Fields,
  ) -> Result<()> {
    let key = session.require_sample()?.to_owned();
    let time_index = self.time_index_name()?;
    let current = session.current_timestep;
    check_index(DataModality::Temporal, current, sample.temporal.len())?;
    let values = validate_input(&self.defs.temporal, values)?;

    if let Some(new_ti) = values.get(time_index) {
      let collides = sample.temporal.iter().enumerate().any(|(i, step)| {
        i != current && step.get(time_index).is_some_and(|v| v.time_order(new_ti).is_eq())
      });
      if collides {
        return Err(Error::Validation {
          feature: time_index.to_owned(),
          message: format!("time-index {new_ti} is already used by another time-step"),
        });
      }
    }

    let mut updated = sample.clone();
    merge(&self.defs.temporal, &mut updated.temporal[current], values);
    let edited = updated.temporal[current].get(time_index).cloned();

    sort_timesteps(&mut updated.temporal, time_index);
    let new_index = edited
      .and_then(|ti| {
        updated
          .temporal
          .iter()
          .position(|step| step.get(time_index).is_some_and(|v| v.time_order(&ti).is_eq()))
      })
      .unwrap_or(current);
    debug!(key, from = current, to = new_index, "time-step reordered");

    self.cascade_temporal(&mut updated, new_index)?;
    self.persist(&key, &updated).await?;
    *sample = updated;
    session.current_timestep = new_index;
    Ok(())
  }

  /// Append a default time-step whose time-index follows the current maximum
  /// and make it current.
  pub async fn add_temporal(
    &self,
    session: &mut SessionContext,
    sample: &mut DataSample,
  ) -> Result<()> {
    let key = session.require_sample()?.to_owned();
    self.time_index_name()?;

    let ctx = DefaultContext::at(session.current_timestep);
    let row = engine::get_default(self.defs, DataModality::Temporal, sample, ctx)?;

    let mut updated = sample.clone();
    updated.temporal.push(row);
    let new_index = updated.temporal.len() - 1;

    self.cascade_temporal(&mut updated, new_index)?;
    self.persist(&key, &updated).await?;
    *sample = updated;
    session.current_timestep = new_index;
    Ok(())
  }

  /// Delete the current time-step. The last remaining step cannot be
  /// deleted. The pointer stays in place, or falls back to the preceding step
  /// if the last step was removed.
  pub async fn delete_temporal(
    &self,
    session: &mut SessionContext,
    sample: &mut DataSample,
  ) -> Result<()> {
    let key = session.require_sample()?.to_owned();
    let current = session.current_timestep;
    if sample.temporal.len() <= 1 {
      return Err(Error::InvalidOperation(
        "a sample must keep at least one time-step".into(),
      ));
    }
    check_index(DataModality::Temporal, current, sample.temporal.len())?;

    let mut updated = sample.clone();
    updated.temporal.remove(current);
    let new_index = current.min(updated.temporal.len() - 1);

    self.cascade_temporal(&mut updated, new_index)?;
    self.persist(&key, &updated).await?;
    *sample = updated;
    session.current_timestep = new_index;
    Ok(())
  }

  // ── Events ──────────────────────────────────────────────────────────────

  /// Append a default event entry. Returns its index.
  pub async fn add_event(
    &self,
    session: &mut SessionContext,
    sample: &mut DataSample,
  ) -> Result<usize> {
    let key = session.require_sample()?.to_owned();
    if self.defs.event.is_empty() {
      return Err(Error::InvalidOperation("the schema defines no event fields".into()));
    }

    let ctx = DefaultContext::at(session.current_timestep);
    let row = engine::get_default(self.defs, DataModality::Event, sample, ctx)?;

    let mut updated = sample.clone();
    updated.event.push(row);
    let index = updated.event.len() - 1;

    self.persist(&key, &updated).await?;
    *sample = updated;
    Ok(index)
  }

  /// Replace the event entry at `index` with validated user input. Events
  /// keep their position.
  pub async fn update_event(
    &self,
    session: &mut SessionContext,
    sample: &mut DataSample,
    index: usize,
    values: Fields,
  ) -> Result<()> {
    let key = session.require_sample()?.to_owned();
    check_index(DataModality::Event, index, sample.event.len())?;
    let values = validate_input(&self.defs.event, values)?;

    let mut updated = sample.clone();
    merge(&self.defs.event, &mut updated.event[index], values);
    engine::resolve_row(self.defs, DataModality::Event, &mut updated, index)?;

    self.persist(&key, &updated).await?;
    *sample = updated;
    Ok(())
  }

  /// Delete the event entry at `index`. The event list may become empty.
  pub async fn delete_event(
    &self,
    session: &mut SessionContext,
    sample: &mut DataSample,
    index: usize,
  ) -> Result<()> {
    let key = session.require_sample()?.to_owned();
    check_index(DataModality::Event, index, sample.event.len())?;

    let mut updated = sample.clone();
    updated.event.remove(index);
    for i in index..updated.event.len() {
      engine::resolve_row(self.defs, DataModality::Event, &mut updated, i)?;
    }

    self.persist(&key, &updated).await?;
    *sample = updated;
    Ok(())
  }

  // ── Workflow ────────────────────────────────────────────────────────────

  /// Perform the mutation for the session's pending action and return to
  /// `showing`.
  ///
  /// A validation error keeps the session in its action state so the user
  /// can correct the input and confirm again, or cancel. Any other outcome
  /// returns to `showing`.
  pub async fn confirm(
    &self,
    session: &mut SessionContext,
    sample: &mut Option<DataSample>,
    confirmation: Confirmation,
  ) -> Result<()> {
    let pending = session
      .state()
      .action()
      .ok_or_else(|| Error::InvalidOperation("nothing to confirm while showing".into()))?;
    if confirmation.action() != pending {
      return Err(Error::InvalidOperation(format!(
        "cannot confirm {} while {}",
        confirmation.action(),
        session.state(),
      )));
    }

    let result = self.apply(session, sample, confirmation).await;
    if !matches!(&result, Err(e) if e.is_validation()) {
      session.machine.confirm()?;
    }
    result
  }

  async fn apply(
    &self,
    session: &mut SessionContext,
    slot: &mut Option<DataSample>,
    confirmation: Confirmation,
  ) -> Result<()> {
    if let Confirmation::AddSample { key } = &confirmation {
      *slot = Some(self.add_sample(session, key).await?);
      return Ok(());
    }
    if matches!(confirmation, Confirmation::DeleteSample) {
      self.delete_sample(session).await?;
      *slot = None;
      return Ok(());
    }

    let sample = slot
      .as_mut()
      .ok_or_else(|| Error::InvalidOperation("no sample is loaded".into()))?;
    match confirmation {
      Confirmation::EditStatic(values) => self.update_static(session, sample, values).await,
      Confirmation::EditTemporal(values) => self.update_temporal(session, sample, values).await,
      Confirmation::EditEvent { index, values } => {
        self.update_event(session, sample, index, values).await
      }
      Confirmation::AddTemporal => self.add_temporal(session, sample).await,
      Confirmation::AddEvent => self.add_event(session, sample).await.map(|_| ()),
      Confirmation::DeleteTemporal => self.delete_temporal(session, sample).await,
      Confirmation::DeleteEvent { index } => self.delete_event(session, sample, index).await,
      Confirmation::AddSample { .. } | Confirmation::DeleteSample => Ok(()),
    }
  }

  // ── Helpers ─────────────────────────────────────────────────────────────

  async fn persist(&self, key: &str, sample: &DataSample) -> Result<()> {
    debug!(key, timesteps = sample.temporal.len(), events = sample.event.len(), "writing sample");
    self.store.put(key, self.defs.dehydrate(sample)).await.map_err(Into::into)
  }

  fn time_index_name(&self) -> Result<&'a str> {
    let defs: &'a FieldDefsCollection = self.defs;
    defs
      .time_index()
      .map(|f| f.feature_name.as_str())
      .ok_or_else(|| Error::InvalidOperation("the schema defines no temporal fields".into()))
  }

  /// After the time-step list changed: every time-step, then static (which
  /// may aggregate temporal data).
  fn cascade_temporal(&self, sample: &mut DataSample, current: usize) -> Result<()> {
    for i in 0..sample.temporal.len() {
      engine::resolve_row(self.defs, DataModality::Temporal, sample, i)?;
    }
    engine::resolve_row(self.defs, DataModality::Static, sample, current)
  }
}

fn require_showing(session: &SessionContext, what: &str) -> Result<()> {
  if session.state().is_showing() {
    Ok(())
  } else {
    Err(Error::InvalidOperation(format!("cannot {what} while {}", session.state())))
  }
}

fn check_index(modality: DataModality, index: usize, len: usize) -> Result<()> {
  if index < len {
    Ok(())
  } else {
    Err(Error::InvalidOperation(format!(
      "{modality} index {index} is out of range (len {len})",
    )))
  }
}

/// Convert submitted JSON values into typed input for one modality.
///
/// Unknown features and unreadable values are validation errors. The result
/// still goes through the editor's own validation.
pub fn decode_input(defs: &FieldDefs, values: &StoredFields) -> Result<Fields> {
  values
    .iter()
    .map(|(name, raw)| {
      let def = defs
        .get(name)
        .ok_or_else(|| Error::validation(name, "unknown field"))?;
      let value = def.process_db_to_input(raw).map_err(|e| match e {
        Error::Decode { message, .. } => Error::validation(name, message),
        other => other,
      })?;
      Ok((name.clone(), value))
    })
    .collect()
}

/// Validate user input against the editable fields of one modality.
fn validate_input(defs: &FieldDefs, values: Fields) -> Result<Fields> {
  values
    .into_iter()
    .map(|(name, value)| {
      let def = defs
        .get(&name)
        .ok_or_else(|| Error::validation(&name, "unknown field"))?;
      if def.is_computed() {
        return Err(Error::validation(&name, "computed fields cannot be edited"));
      }
      Ok((name, def.validate(value)?))
    })
    .collect()
}

fn merge(defs: &FieldDefs, target: &mut Fields, values: Fields) {
  target.extend(values);
  engine::order_like(defs, target);
}
