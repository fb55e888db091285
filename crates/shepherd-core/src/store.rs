//! The `VisitorStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `shepherd-store-sqlite`). Higher layers (`shepherd-api`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  attendance::AttendanceRecord,
  error::ErrorKind,
  intake::{Intake, IntakeOutcome},
  lifecycle::TransitionPolicy,
  projection::{VisitorQuery, VisitorRow},
  visitor::{Assignment, Visitor, VisitorUpdate},
};

/// A backend error that may wrap a domain [`crate::Error`].
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The domain error behind this failure, if there is one.
  fn as_core(&self) -> Option<&crate::Error>;

  fn kind(&self) -> ErrorKind {
    self.as_core().map_or(ErrorKind::Store, crate::Error::kind)
  }
}

/// Abstraction over the visitor and attendance stores.
///
/// Mutations that touch more than one row run in a single transaction: a
/// failed call leaves no partial writes behind.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait VisitorStore: Send + Sync {
  type Error: StoreError;

  // ── Intake ────────────────────────────────────────────────────────────

  /// Resolve the visitor by phone (creating or refreshing it) and ensure
  /// exactly one attendance record exists for the service and date. Both
  /// steps commit together or not at all.
  fn intake(
    &self,
    intake: Intake,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<IntakeOutcome, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve a visitor by id. Returns `None` if not found.
  fn get_visitor(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<VisitorRow>, Self::Error>> + Send + '_;

  /// Look a visitor up by exact phone number.
  fn find_by_phone<'a>(
    &'a self,
    phone: &'a str,
  ) -> impl Future<Output = Result<Option<Visitor>, Self::Error>> + Send + 'a;

  /// Visitors matching `query`, newest first, each joined with its
  /// attendance aggregate. `now` anchors the "new visitor" window.
  fn list_visitors<'a>(
    &'a self,
    query: &'a VisitorQuery,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<VisitorRow>, Self::Error>> + Send + 'a;

  /// Attendance records for a visitor, newest first. Records outlive the
  /// visitor, so this still answers after a delete.
  fn attendance_for(
    &self,
    visitor_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + '_;

  // ── Follow-up lifecycle ───────────────────────────────────────────────

  /// Replace the visitor's descriptive and follow-up fields. The status
  /// change must be permitted by `policy`.
  fn update_visitor<'a>(
    &'a self,
    id: Uuid,
    update: VisitorUpdate,
    policy: &'a TransitionPolicy,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Visitor, Self::Error>> + Send + 'a;

  /// Set the assignee and append an `Assigned to:` line to the journal.
  fn assign_visitor(
    &self,
    id: Uuid,
    assignment: Assignment,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Visitor, Self::Error>> + Send + '_;

  /// Flag the visitor as converted to a member.
  fn mark_converted(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Visitor, Self::Error>> + Send + '_;

  /// Permanently remove the visitor. Attendance history is kept.
  fn delete_visitor(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
