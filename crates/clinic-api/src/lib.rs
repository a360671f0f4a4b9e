//! JSON REST API for clinical sample records.
//!
//! Exposes an axum [`Router`] backed by any [`clinic_core::store::SampleStore`]
//! and a parsed field schema. Every request runs in a fresh
//! [`clinic_core::session::SessionContext`]; the API keeps no session state
//! between requests. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", clinic_api::api_router(store.clone(), defs.clone()))
//! ```

pub mod error;
pub mod samples;
pub mod schema;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use clinic_core::{schema::FieldDefsCollection, store::SampleStore};

pub use error::ApiError;

/// Shared handler state: the store and the schema it is edited with.
pub struct AppState<S> {
  pub store: Arc<S>,
  pub defs:  Arc<FieldDefsCollection>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), defs: Arc::clone(&self.defs) }
  }
}

/// Build a fully-materialised API router for `store` and `defs`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, defs: Arc<FieldDefsCollection>) -> Router<()>
where
  S: SampleStore + 'static,
{
  Router::new()
    .route("/schema", get(schema::handler::<S>))
    // Samples
    .route("/samples", get(samples::list::<S>).post(samples::create::<S>))
    .route("/samples/{key}", get(samples::get_one::<S>).delete(samples::delete_one::<S>))
    .route("/samples/{key}/static", put(samples::update_static::<S>))
    // Time-steps
    .route("/samples/{key}/temporal", post(samples::add_temporal::<S>))
    .route(
      "/samples/{key}/temporal/{index}",
      put(samples::update_temporal::<S>).delete(samples::delete_temporal::<S>),
    )
    // Events
    .route("/samples/{key}/events", post(samples::add_event::<S>))
    .route(
      "/samples/{key}/events/{index}",
      put(samples::update_event::<S>).delete(samples::delete_event::<S>),
    )
    .with_state(AppState { store, defs })
}
