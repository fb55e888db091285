//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use shepherd_core::{error::ErrorKind, store::StoreError};
use thiserror::Error;

/// An error returned by an API handler.
///
/// Rendered as `{"success": false, "message": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend failure by the domain error it wraps.
  pub fn from_store<E: StoreError>(e: E) -> Self { Self::classified(e.kind(), e) }

  fn classified<E>(kind: ErrorKind, e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    match kind {
      ErrorKind::Validation => Self::Validation(e.to_string()),
      ErrorKind::NotFound => Self::NotFound(e.to_string()),
      ErrorKind::Conflict => Self::Conflict(e.to_string()),
      ErrorKind::Store => Self::Store(Box::new(e)),
    }
  }
}

impl From<shepherd_core::Error> for ApiError {
  fn from(e: shepherd_core::Error) -> Self { Self::classified(e.kind(), e) }
}

impl From<JsonRejection> for ApiError {
  fn from(r: JsonRejection) -> Self { Self::Validation(r.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(r: PathRejection) -> Self { Self::Validation(r.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(r: QueryRejection) -> Self { Self::Validation(r.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Validation(_) => StatusCode::BAD_REQUEST,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = self.to_string();
    if status.is_server_error() {
      tracing::error!(error = %message, "request failed");
    } else {
      tracing::warn!(%status, error = %message, "request rejected");
    }
    (status, Json(json!({ "success": false, "message": message }))).into_response()
  }
}
