//! `GET /schema` — the field definitions samples are edited with.

use axum::{Json, extract::State};
use clinic_core::{schema::FieldDefsCollection, store::SampleStore};

use crate::AppState;

pub async fn handler<S>(State(state): State<AppState<S>>) -> Json<FieldDefsCollection>
where
  S: SampleStore,
{
  Json(FieldDefsCollection::clone(&state.defs))
}
