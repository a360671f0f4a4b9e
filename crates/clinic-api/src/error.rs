//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// Submitted data failed validation; nothing was written.
  #[error("invalid value for {feature:?}: {message}")]
  Unprocessable { feature: String, message: String },

  /// The operation is not allowed in the sample's current shape.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<clinic_core::Error> for ApiError {
  fn from(e: clinic_core::Error) -> Self {
    use clinic_core::Error as E;
    match e {
      E::Validation { feature, message } => Self::Unprocessable { feature, message },
      E::InvalidOperation(m) => Self::Conflict(m),
      E::SampleNotFound(key) => Self::NotFound(format!("sample {key:?} not found")),
      other => Self::Internal(Box::new(other)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Unprocessable { feature, message } => (
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({ "error": message, "feature": feature }),
      ),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, json!({ "error": m })),
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
      }
    };
    (status, Json(body)).into_response()
  }
}
