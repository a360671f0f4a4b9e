//! Per-session interaction state.
//!
//! A session has exactly one active [`InteractionState`]. Action states are
//! entered from `showing` only, and left only through
//! [`StateMachine::confirm`] or [`StateMachine::cancel`].

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{Error, Result};

// ─── States and actions ──────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InteractionState {
  #[default]
  Showing,
  AddingSample,
  DeletingSample,
  EditingStaticData,
  EditingTemporalData,
  EditingEventData,
  AddingTemporalData,
  AddingEventData,
  DeletingTemporalData,
  DeletingEventData,
}

/// A user-initiated action that moves the session out of `showing`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
  AddSample,
  DeleteSample,
  EditStatic,
  EditTemporal,
  EditEvent,
  AddTemporal,
  AddEvent,
  DeleteTemporal,
  DeleteEvent,
}

impl Action {
  /// The state this action enters.
  pub fn state(self) -> InteractionState {
    match self {
      Self::AddSample => InteractionState::AddingSample,
      Self::DeleteSample => InteractionState::DeletingSample,
      Self::EditStatic => InteractionState::EditingStaticData,
      Self::EditTemporal => InteractionState::EditingTemporalData,
      Self::EditEvent => InteractionState::EditingEventData,
      Self::AddTemporal => InteractionState::AddingTemporalData,
      Self::AddEvent => InteractionState::AddingEventData,
      Self::DeleteTemporal => InteractionState::DeletingTemporalData,
      Self::DeleteEvent => InteractionState::DeletingEventData,
    }
  }

  /// Whether the action operates on the currently selected sample.
  pub fn needs_sample(self) -> bool { !matches!(self, Self::AddSample) }
}

impl InteractionState {
  /// The action that led here, or `None` for `showing`.
  pub fn action(self) -> Option<Action> {
    match self {
      Self::Showing => None,
      Self::AddingSample => Some(Action::AddSample),
      Self::DeletingSample => Some(Action::DeleteSample),
      Self::EditingStaticData => Some(Action::EditStatic),
      Self::EditingTemporalData => Some(Action::EditTemporal),
      Self::EditingEventData => Some(Action::EditEvent),
      Self::AddingTemporalData => Some(Action::AddTemporal),
      Self::AddingEventData => Some(Action::AddEvent),
      Self::DeletingTemporalData => Some(Action::DeleteTemporal),
      Self::DeletingEventData => Some(Action::DeleteEvent),
    }
  }

  pub fn is_showing(self) -> bool { self == Self::Showing }
}

// ─── State machine ───────────────────────────────────────────────────────────

/// The confirm/cancel workflow, independent of how a presentation layer asks
/// for confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateMachine {
  state: InteractionState,
}

impl StateMachine {
  pub fn new() -> Self { Self::default() }

  pub fn state(&self) -> InteractionState { self.state }

  /// Enter the action state for `action`. Only permitted from `showing`.
  pub fn request(&mut self, action: Action) -> Result<InteractionState> {
    if !self.state.is_showing() {
      return Err(Error::InvalidOperation(format!(
        "cannot start {action} while {}",
        self.state,
      )));
    }
    self.state = action.state();
    Ok(self.state)
  }

  /// Complete the pending action and return to `showing`.
  ///
  /// Returns the action whose mutation the caller must now perform.
  pub fn confirm(&mut self) -> Result<Action> {
    let action = self
      .state
      .action()
      .ok_or_else(|| Error::InvalidOperation("nothing to confirm while showing".into()))?;
    self.state = InteractionState::Showing;
    Ok(action)
  }

  /// Abandon the pending action without mutation. A no-op while `showing`.
  pub fn cancel(&mut self) { self.state = InteractionState::Showing; }
}

// ─── Session context ─────────────────────────────────────────────────────────

/// Everything scoped to one user session.
///
/// Concurrent sessions are unaware of each other; edits to the same sample
/// from two sessions overwrite one another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
  pub current_sample:   Option<String>,
  pub current_timestep: usize,
  pub machine:          StateMachine,
}

impl SessionContext {
  /// No sample selected, time-step 0, `showing`.
  pub fn new() -> Self {
    Self {
      current_sample:   None,
      current_timestep: 0,
      machine:          StateMachine::new(),
    }
  }

  pub fn state(&self) -> InteractionState { self.machine.state() }

  /// The selected sample key, or [`Error::InvalidOperation`] if none.
  pub fn require_sample(&self) -> Result<&str> {
    self
      .current_sample
      .as_deref()
      .ok_or_else(|| Error::InvalidOperation("no sample is selected".into()))
  }

  /// Enter the action state for `action`, checking that a sample is selected
  /// when the action needs one.
  pub fn request(&mut self, action: Action) -> Result<InteractionState> {
    if action.needs_sample() {
      self.require_sample()?;
    }
    self.machine.request(action)
  }

  pub fn cancel(&mut self) { self.machine.cancel(); }
}
