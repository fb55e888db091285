//! Handlers for `/visitors` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/visitors/intake` | Body: [`IntakeRequest`]; 201 for a new visitor, 200 for a returning one |
//! | `GET`    | `/visitors` | Optional `?filter=` and `?search=` |
//! | `GET`    | `/visitors/stats` | Follow-up workload counts |
//! | `GET`    | `/visitors/lookup` | `?phone=`; 404 if the number is unknown |
//! | `GET`    | `/visitors/:id` | 404 if not found |
//! | `PUT`    | `/visitors/:id` | Body: [`VisitorUpdate`] |
//! | `DELETE` | `/visitors/:id` | Attendance history is kept |
//! | `POST`   | `/visitors/:id/assign` | Body: [`Assignment`] |
//! | `POST`   | `/visitors/:id/convert` | Marks the visitor as a member |
//! | `GET`    | `/visitors/:id/attendance` | Newest first |

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use shepherd_core::{
  intake::IntakeRequest,
  projection::{FollowUpStats, VisitorFilter, VisitorQuery, VisitorSummary},
  store::VisitorStore,
  visitor::{Assignment, VisitorUpdate},
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

type Reply = Result<Json<Value>, ApiError>;

// ─── Intake ───────────────────────────────────────────────────────────────────

/// `POST /visitors/intake`
pub async fn intake<S>(
  State(state): State<ApiState<S>>,
  body: Result<Json<IntakeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: VisitorStore,
{
  let Json(body) = body?;
  let now = Utc::now();
  let intake = body.validate(now.date_naive())?;

  let outcome = state
    .store
    .intake(intake, now)
    .await
    .map_err(ApiError::from_store)?;

  tracing::info!(
    visitor_id = %outcome.visitor.visitor_id,
    existing = outcome.existing,
    checked_in = outcome.checked_in,
    service_id = %outcome.attendance.service_id,
    "visitor intake"
  );

  let status = if outcome.existing { StatusCode::OK } else { StatusCode::CREATED };
  let body = json!({
    "success": true,
    "message": outcome.welcome_message(),
    "visitor": {
      "visitor_id":    outcome.visitor.visitor_id,
      "name":          outcome.visitor.name,
      "phone":         outcome.visitor.phone,
      "email":         outcome.visitor.email,
      "check_in_time": outcome.attendance.check_in_time.format("%H:%M:%S").to_string(),
    },
  });
  Ok((status, Json(body)))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  /// `all`, a follow-up status, `converted`, `new` or `returning`.
  pub filter: Option<String>,
  /// Substring match over name, phone, email and source.
  pub search: Option<String>,
}

/// `GET /visitors[?filter=...][&search=...]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Reply
where
  S: VisitorStore,
{
  let Query(params) = params?;
  let filter: VisitorFilter = params.filter.as_deref().unwrap_or_default().parse()?;
  let query = VisitorQuery { filter, search: params.search };

  let now = Utc::now();
  let summaries: Vec<VisitorSummary> = state
    .store
    .list_visitors(&query, now)
    .await
    .map_err(ApiError::from_store)?
    .into_iter()
    .map(|row| VisitorSummary::project(row, now.date_naive()))
    .collect();

  Ok(Json(json!({
    "success": true,
    "count": summaries.len(),
    "data": summaries,
  })))
}

// ─── Stats ────────────────────────────────────────────────────────────────────

/// `GET /visitors/stats`
pub async fn stats<S>(State(state): State<ApiState<S>>) -> Reply
where
  S: VisitorStore,
{
  let now = Utc::now();
  let summaries: Vec<VisitorSummary> = state
    .store
    .list_visitors(&VisitorQuery::default(), now)
    .await
    .map_err(ApiError::from_store)?
    .into_iter()
    .map(|row| VisitorSummary::project(row, now.date_naive()))
    .collect();

  Ok(Json(json!({
    "success": true,
    "data": FollowUpStats::tally(&summaries, now),
  })))
}

// ─── Lookup ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct LookupParams {
  #[serde(default)]
  pub phone: String,
}

/// `GET /visitors/lookup?phone=...`: lets a check-in form recognise a
/// returning visitor before submitting.
pub async fn lookup<S>(
  State(state): State<ApiState<S>>,
  params: Result<Query<LookupParams>, QueryRejection>,
) -> Reply
where
  S: VisitorStore,
{
  let Query(params) = params?;
  let phone = params.phone.trim();
  if phone.is_empty() {
    return Err(ApiError::Validation("phone is required".to_owned()));
  }

  let visitor = state
    .store
    .find_by_phone(phone)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("no visitor with phone {phone:?}")))?;

  Ok(Json(json!({
    "success": true,
    "data": {
      "visitor_id": visitor.visitor_id,
      "name":       visitor.name,
      "phone":      visitor.phone,
      "email":      visitor.email,
    },
  })))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /visitors/:id`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  id: Result<Path<Uuid>, PathRejection>,
) -> Reply
where
  S: VisitorStore,
{
  let Path(id) = id?;
  let row = state
    .store
    .get_visitor(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("visitor {id} not found")))?;

  Ok(Json(json!({
    "success": true,
    "data": VisitorSummary::project(row, Utc::now().date_naive()),
  })))
}

// ─── Attendance ───────────────────────────────────────────────────────────────

/// `GET /visitors/:id/attendance`
pub async fn attendance<S>(
  State(state): State<ApiState<S>>,
  id: Result<Path<Uuid>, PathRejection>,
) -> Reply
where
  S: VisitorStore,
{
  let Path(id) = id?;
  let records = state
    .store
    .attendance_for(id)
    .await
    .map_err(ApiError::from_store)?;

  Ok(Json(json!({
    "success": true,
    "count": records.len(),
    "data": records,
  })))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /visitors/:id`: full-record update.
pub async fn update<S>(
  State(state): State<ApiState<S>>,
  id: Result<Path<Uuid>, PathRejection>,
  body: Result<Json<VisitorUpdate>, JsonRejection>,
) -> Reply
where
  S: VisitorStore,
{
  let Path(id) = id?;
  let Json(body) = body?;

  let visitor = state
    .store
    .update_visitor(id, body, &state.policy, Utc::now())
    .await
    .map_err(ApiError::from_store)?;

  tracing::info!(
    visitor_id = %id,
    status = %visitor.follow_up_status,
    "visitor updated"
  );

  Ok(Json(json!({
    "success": true,
    "message": "Visitor updated successfully",
    "data": visitor,
  })))
}

// ─── Assign ───────────────────────────────────────────────────────────────────

/// `POST /visitors/:id/assign` with body `{"assigned_to": "...", "notes": "..."}`
pub async fn assign<S>(
  State(state): State<ApiState<S>>,
  id: Result<Path<Uuid>, PathRejection>,
  body: Result<Json<Assignment>, JsonRejection>,
) -> Reply
where
  S: VisitorStore,
{
  let Path(id) = id?;
  let Json(body) = body?;

  let visitor = state
    .store
    .assign_visitor(id, body, Utc::now())
    .await
    .map_err(ApiError::from_store)?;

  let assignee = visitor.assigned_to.as_deref().unwrap_or_default();
  tracing::info!(visitor_id = %id, assigned_to = assignee, "visitor assigned");

  Ok(Json(json!({
    "success": true,
    "message": format!("Visitor assigned to {assignee}"),
    "data": visitor,
  })))
}

// ─── Convert ──────────────────────────────────────────────────────────────────

/// `POST /visitors/:id/convert`
pub async fn convert<S>(
  State(state): State<ApiState<S>>,
  id: Result<Path<Uuid>, PathRejection>,
) -> Reply
where
  S: VisitorStore,
{
  let Path(id) = id?;
  let visitor = state
    .store
    .mark_converted(id, Utc::now())
    .await
    .map_err(ApiError::from_store)?;

  tracing::info!(visitor_id = %id, "visitor converted to member");

  Ok(Json(json!({
    "success": true,
    "message": "Visitor marked as converted to member",
    "data": visitor,
  })))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /visitors/:id`
pub async fn delete<S>(
  State(state): State<ApiState<S>>,
  id: Result<Path<Uuid>, PathRejection>,
) -> Reply
where
  S: VisitorStore,
{
  let Path(id) = id?;
  state
    .store
    .delete_visitor(id)
    .await
    .map_err(ApiError::from_store)?;

  tracing::info!(visitor_id = %id, "visitor deleted");

  Ok(Json(json!({
    "success": true,
    "message": "Visitor deleted successfully",
  })))
}
