//! Handlers for `/samples` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/samples` | `{"keys": [...]}` |
//! | `POST`   | `/samples` | Body: `{"key":"..."}` (optional); returns 201 |
//! | `GET`    | `/samples/{key}` | Optional `?timestep=` |
//! | `DELETE` | `/samples/{key}` | 204 |
//! | `PUT`    | `/samples/{key}/static` | Body: feature → value; optional `?timestep=` |
//! | `POST`   | `/samples/{key}/temporal` | Appends a default time-step; returns 201 |
//! | `PUT`    | `/samples/{key}/temporal/{index}` | Body: feature → value |
//! | `DELETE` | `/samples/{key}/temporal/{index}` | |
//! | `POST`   | `/samples/{key}/events` | Appends a default event; returns 201 |
//! | `PUT`    | `/samples/{key}/events/{index}` | Body: feature → value |
//! | `DELETE` | `/samples/{key}/events/{index}` | |
//!
//! Every sample-returning endpoint responds with a [`SampleResponse`].

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use clinic_core::{
  mutation::{SampleEditor, decode_input},
  sample::{DataModality, DataSample, StoredFields, StoredSample},
  session::SessionContext,
  store::SampleStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── Responses ───────────────────────────────────────────────────────────────

/// A sample in its stored form, with the time-step the request ended on.
#[derive(Debug, Serialize, Deserialize)]
pub struct SampleResponse {
  pub key:              String,
  pub current_timestep: usize,
  /// Index of the event the request created, if any.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub event_index:      Option<usize>,
  pub sample:           StoredSample,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KeyList {
  pub keys: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimestepParams {
  pub timestep: Option<usize>,
}

fn respond<S: SampleStore>(
  state: &AppState<S>,
  session: &SessionContext,
  sample: &DataSample,
) -> Result<SampleResponse, ApiError> {
  Ok(SampleResponse {
    key:              session.require_sample()?.to_owned(),
    current_timestep: session.current_timestep,
    event_index:      None,
    sample:           state.defs.dehydrate(sample),
  })
}

/// Load `key` into a fresh session, optionally moving to `timestep`.
async fn open<S: SampleStore>(
  editor: &SampleEditor<'_, S>,
  key: &str,
  timestep: Option<usize>,
) -> Result<(SessionContext, DataSample), ApiError> {
  let mut session = SessionContext::new();
  let mut sample = editor.select_sample(&mut session, key).await?;
  if let Some(index) = timestep {
    editor.select_timestep(&mut session, &mut sample, index)?;
  }
  Ok((session, sample))
}

// ─── Samples ─────────────────────────────────────────────────────────────────

/// `GET /samples`
pub async fn list<S>(State(state): State<AppState<S>>) -> Result<Json<KeyList>, ApiError>
where
  S: SampleStore,
{
  let editor = SampleEditor::new(&*state.store, &state.defs);
  Ok(Json(KeyList { keys: editor.list_keys().await? }))
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateBody {
  pub key: Option<String>,
}

/// `POST /samples` — body: `{"key":"p1"}`; a UUID key is generated when
/// `key` is omitted.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SampleStore,
{
  let key = match body.key {
    Some(k) if k.trim().is_empty() => {
      return Err(ApiError::BadRequest("sample key must not be empty".into()));
    }
    Some(k) => k,
    None => Uuid::new_v4().to_string(),
  };

  let editor = SampleEditor::new(&*state.store, &state.defs);
  let mut session = SessionContext::new();
  let sample = editor.add_sample(&mut session, &key).await?;
  Ok((StatusCode::CREATED, Json(respond(&state, &session, &sample)?)))
}

/// `GET /samples/{key}[?timestep=<n>]`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(key): Path<String>,
  Query(params): Query<TimestepParams>,
) -> Result<Json<SampleResponse>, ApiError>
where
  S: SampleStore,
{
  let editor = SampleEditor::new(&*state.store, &state.defs);
  let (session, sample) = open(&editor, &key, params.timestep).await?;
  Ok(Json(respond(&state, &session, &sample)?))
}

/// `DELETE /samples/{key}`
///
/// The record is not decoded, so samples the schema can no longer read are
/// still deletable.
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  Path(key): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: SampleStore,
{
  let editor = SampleEditor::new(&*state.store, &state.defs);
  let mut session = SessionContext::new();
  editor.select_key(&mut session, &key).await?;
  editor.delete_sample(&mut session).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `PUT /samples/{key}/static[?timestep=<n>]` — body: feature → value.
///
/// `timestep` selects which time-step's computed fields are refreshed.
pub async fn update_static<S>(
  State(state): State<AppState<S>>,
  Path(key): Path<String>,
  Query(params): Query<TimestepParams>,
  Json(body): Json<StoredFields>,
) -> Result<Json<SampleResponse>, ApiError>
where
  S: SampleStore,
{
  let editor = SampleEditor::new(&*state.store, &state.defs);
  let values = decode_input(state.defs.get(DataModality::Static), &body)?;
  let (mut session, mut sample) = open(&editor, &key, params.timestep).await?;
  editor.update_static(&mut session, &mut sample, values).await?;
  Ok(Json(respond(&state, &session, &sample)?))
}

// ─── Time-steps ──────────────────────────────────────────────────────────────

/// `POST /samples/{key}/temporal`
pub async fn add_temporal<S>(
  State(state): State<AppState<S>>,
  Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SampleStore,
{
  let editor = SampleEditor::new(&*state.store, &state.defs);
  let (mut session, mut sample) = open(&editor, &key, None).await?;
  editor.add_temporal(&mut session, &mut sample).await?;
  Ok((StatusCode::CREATED, Json(respond(&state, &session, &sample)?)))
}

/// `PUT /samples/{key}/temporal/{index}` — body: feature → value.
///
/// The response's `current_timestep` is where the edited time-step ended up
/// after re-sorting.
pub async fn update_temporal<S>(
  State(state): State<AppState<S>>,
  Path((key, index)): Path<(String, usize)>,
  Json(body): Json<StoredFields>,
) -> Result<Json<SampleResponse>, ApiError>
where
  S: SampleStore,
{
  let editor = SampleEditor::new(&*state.store, &state.defs);
  let values = decode_input(state.defs.get(DataModality::Temporal), &body)?;
  let (mut session, mut sample) = open(&editor, &key, Some(index)).await?;
  editor.update_temporal(&mut session, &mut sample, values).await?;
  Ok(Json(respond(&state, &session, &sample)?))
}

/// `DELETE /samples/{key}/temporal/{index}`
pub async fn delete_temporal<S>(
  State(state): State<AppState<S>>,
  Path((key, index)): Path<(String, usize)>,
) -> Result<Json<SampleResponse>, ApiError>
where
  S: SampleStore,
{
  let editor = SampleEditor::new(&*state.store, &state.defs);
  let (mut session, mut sample) = open(&editor, &key, Some(index)).await?;
  editor.delete_temporal(&mut session, &mut sample).await?;
  Ok(Json(respond(&state, &session, &sample)?))
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// `POST /samples/{key}/events`
pub async fn add_event<S>(
  State(state): State<AppState<S>>,
  Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SampleStore,
{
  let editor = SampleEditor::new(&*state.store, &state.defs);
  let (mut session, mut sample) = open(&editor, &key, None).await?;
  let index = editor.add_event(&mut session, &mut sample).await?;

  let mut response = respond(&state, &session, &sample)?;
  response.event_index = Some(index);
  Ok((StatusCode::CREATED, Json(response)))
}

/// `PUT /samples/{key}/events/{index}` — body: feature → value.
pub async fn update_event<S>(
  State(state): State<AppState<S>>,
  Path((key, index)): Path<(String, usize)>,
  Json(body): Json<StoredFields>,
) -> Result<Json<SampleResponse>, ApiError>
where
  S: SampleStore,
{
  let editor = SampleEditor::new(&*state.store, &state.defs);
  let values = decode_input(state.defs.get(DataModality::Event), &body)?;
  let (mut session, mut sample) = open(&editor, &key, None).await?;
  editor.update_event(&mut session, &mut sample, index, values).await?;
  Ok(Json(respond(&state, &session, &sample)?))
}

/// `DELETE /samples/{key}/events/{index}`
pub async fn delete_event<S>(
  State(state): State<AppState<S>>,
  Path((key, index)): Path<(String, usize)>,
) -> Result<Json<SampleResponse>, ApiError>
where
  S: SampleStore,
{
  let editor = SampleEditor::new(&*state.store, &state.defs);
  let (mut session, mut sample) = open(&editor, &key, None).await?;
  editor.delete_event(&mut session, &mut sample, index).await?;
  Ok(Json(respond(&state, &session, &sample)?))
}
