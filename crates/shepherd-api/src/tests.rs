//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use shepherd_core::lifecycle::TransitionPolicy;
use shepherd_store_sqlite::SqliteStore;
use tower::ServiceExt as _;

use crate::api_router;

async fn app_with(policy: TransitionPolicy) -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  api_router(Arc::new(store), policy)
}

async fn app() -> Router { app_with(TransitionPolicy::default()).await }

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let builder = Request::builder().method(method).uri(uri);
  let req = match body {
    Some(v) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(v.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
  (status, json)
}

async fn intake(app: &Router, name: &str, phone: &str) -> (StatusCode, Value) {
  send(
    app,
    "POST",
    "/visitors/intake",
    Some(json!({ "name": name, "phone": phone, "service_id": "S1" })),
  )
  .await
}

async fn visitor_id(app: &Router, name: &str, phone: &str) -> String {
  let (_, body) = intake(app, name, phone).await;
  body["visitor"]["visitor_id"].as_str().unwrap().to_owned()
}

// ── Intake ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn intake_registers_then_welcomes_back() {
  let app = app().await;

  let (status, body) = intake(&app, "Ama", "055").await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["success"], true);
  assert!(body["message"].as_str().unwrap().contains("registered"), "{body}");
  assert_eq!(body["visitor"]["name"], "Ama");
  assert_eq!(body["visitor"]["phone"], "055");
  assert!(body["visitor"]["check_in_time"].is_string());

  let (status, body) = intake(&app, "Ama", "055").await;
  assert_eq!(status, StatusCode::OK);
  assert!(body["message"].as_str().unwrap().contains("Welcome back"), "{body}");

  let (_, list) = send(&app, "GET", "/visitors", None).await;
  assert_eq!(list["count"], 1);
  assert_eq!(list["data"][0]["visit_count"], 1);
  assert_eq!(list["data"][0]["urgency"], "high");
  assert_eq!(list["data"][0]["days_since_visit"], 0);
}

#[tokio::test]
async fn intake_without_phone_is_rejected() {
  let app = app().await;
  let (status, body) = send(
    &app,
    "POST",
    "/visitors/intake",
    Some(json!({ "name": "Ama", "service_id": "S1" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["success"], false);
  assert!(body["message"].as_str().unwrap().contains("phone"));

  let (_, list) = send(&app, "GET", "/visitors", None).await;
  assert_eq!(list["count"], 0);
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
  let app = app().await;
  let req = Request::builder()
    .method("POST")
    .uri("/visitors/intake")
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from("{not json"))
    .unwrap();
  let resp = app.oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lookup_by_phone() {
  let app = app().await;
  let id = visitor_id(&app, "Ama", "055").await;

  let (status, body) = send(&app, "GET", "/visitors/lookup?phone=055", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["visitor_id"], id.as_str());
  assert_eq!(body["data"]["name"], "Ama");

  let (status, _) = send(&app, "GET", "/visitors/lookup?phone=024", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = send(&app, "GET", "/visitors/lookup", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn future_check_in_date_is_rejected() {
  let app = app().await;
  let (status, body) = send(
    &app,
    "POST",
    "/visitors/intake",
    Some(json!({ "name": "Ama", "phone": "055", "service_id": "S1", "check_in_date": "2999-01-01" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["message"].as_str().unwrap().contains("check_in_date"));

  let (_, list) = send(&app, "GET", "/visitors", None).await;
  assert_eq!(list["count"], 0);
}

// ── Listing ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_filter_is_rejected() {
  let app = app().await;
  let (status, body) = send(&app, "GET", "/visitors?filter=vip", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["success"], false);
}

#[tokio::test]
async fn list_filters_and_search() {
  let app = app().await;
  visitor_id(&app, "Ama", "055").await;
  let kwame = visitor_id(&app, "Kwame", "024").await;

  let (status, _) = send(&app, "POST", &format!("/visitors/{kwame}/convert"), None).await;
  assert_eq!(status, StatusCode::OK);

  let (_, body) = send(&app, "GET", "/visitors?filter=converted", None).await;
  assert_eq!(body["count"], 1);
  assert_eq!(body["data"][0]["name"], "Kwame");

  let (_, body) = send(&app, "GET", "/visitors?filter=new&search=ama", None).await;
  assert_eq!(body["count"], 1);
  assert_eq!(body["data"][0]["phone"], "055");

  let (_, body) = send(&app, "GET", "/visitors?filter=returning", None).await;
  assert_eq!(body["count"], 0);
}

// ── Update / assign ───────────────────────────────────────────────────────────

#[tokio::test]
async fn update_defaults_status_and_reports_missing() {
  let app = app().await;
  let id = visitor_id(&app, "Ama", "055").await;

  let (status, _) = send(
    &app,
    "PUT",
    &format!("/visitors/{id}"),
    Some(json!({ "name": "Ama", "phone": "055", "follow_up_status": "contacted" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (status, body) = send(
    &app,
    "PUT",
    &format!("/visitors/{id}"),
    Some(json!({ "name": "Ama Mensah", "phone": "055", "follow_up_date": "2026-03-09" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "Visitor updated successfully");
  assert_eq!(body["data"]["follow_up_status"], "pending");
  assert_eq!(body["data"]["follow_up_date"], "2026-03-09");

  let (_, one) = send(&app, "GET", &format!("/visitors/{id}"), None).await;
  assert_eq!(one["data"]["follow_up_date_display"], "Mar 9, 2026");

  let missing = uuid::Uuid::new_v4();
  let (status, body) = send(
    &app,
    "PUT",
    &format!("/visitors/{missing}"),
    Some(json!({ "name": "Ama", "phone": "055" })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["success"], false);
}

#[tokio::test]
async fn update_rejected_by_forward_only_policy() {
  let app = app_with(TransitionPolicy::forward_only()).await;
  let id = visitor_id(&app, "Ama", "055").await;

  let (status, body) = send(
    &app,
    "PUT",
    &format!("/visitors/{id}"),
    Some(json!({ "name": "Ama", "phone": "055", "follow_up_status": "completed" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["message"].as_str().unwrap().contains("pending"));
}

#[tokio::test]
async fn assign_appends_journal_line() {
  let app = app().await;
  let id = visitor_id(&app, "Ama", "055").await;

  let (status, body) = send(
    &app,
    "POST",
    &format!("/visitors/{id}/assign"),
    Some(json!({ "assigned_to": "Pastor John", "notes": "will call Tuesday" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["success"], true);
  assert_eq!(body["data"]["assigned_to"], "Pastor John");

  let (_, one) = send(&app, "GET", &format!("/visitors/{id}"), None).await;
  let text = one["data"]["follow_up_notes_text"].as_str().unwrap();
  assert!(text.contains("Assigned to: Pastor John - will call Tuesday"), "{text}");
  assert_eq!(one["data"]["follow_up_notes"].as_array().unwrap().len(), 1);

  let (status, _) = send(
    &app,
    "POST",
    &format!("/visitors/{id}/assign"),
    Some(json!({ "notes": "nobody" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Delete / attendance / stats ───────────────────────────────────────────────

#[tokio::test]
async fn delete_then_not_found_but_history_kept() {
  let app = app().await;
  let id = visitor_id(&app, "Ama", "055").await;

  let (status, body) = send(&app, "DELETE", &format!("/visitors/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "Visitor deleted successfully");

  let (status, _) = send(&app, "DELETE", &format!("/visitors/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = send(&app, "GET", &format!("/visitors/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (_, history) = send(&app, "GET", &format!("/visitors/{id}/attendance"), None).await;
  assert_eq!(history["count"], 1);
  assert_eq!(history["data"][0]["service_id"], "S1");
}

#[tokio::test]
async fn bad_visitor_id_is_a_validation_error() {
  let app = app().await;
  let (status, body) = send(&app, "GET", "/visitors/not-a-uuid", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["success"], false);
}

#[tokio::test]
async fn stats_count_follow_up_workload() {
  let app = app().await;
  visitor_id(&app, "Ama", "055").await;
  let kwame = visitor_id(&app, "Kwame", "024").await;
  send(
    &app,
    "PUT",
    &format!("/visitors/{kwame}"),
    Some(json!({ "name": "Kwame", "phone": "024", "follow_up_status": "scheduled" })),
  )
  .await;

  let (status, body) = send(&app, "GET", "/visitors/stats", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["total"], 2);
  assert_eq!(body["data"]["by_status"]["pending"], 1);
  assert_eq!(body["data"]["by_status"]["scheduled"], 1);
  assert_eq!(body["data"]["new_this_week"], 2);
  assert_eq!(body["data"]["urgent_high"], 1);
}
