//! Attendance: one immutable check-in fact per visitor, service and day.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status tag written on visitor check-ins; members and volunteers use
/// other tags in the same table.
pub const VISITOR_CHECK_IN: &str = "visitor";

/// A single check-in. Created once by the check-in engine and never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub attendance_id: Uuid,
  /// Weak back-reference; the record survives deletion of the visitor.
  pub visitor_id:    Uuid,
  /// Opaque service/event identifier owned by the events subsystem.
  pub service_id:    String,
  pub check_in_date: NaiveDate,
  pub check_in_time: NaiveTime,
  pub status:        String,
}

/// Aggregate of a visitor's attendance rows, computed at query time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceHistory {
  pub visit_count:  u32,
  pub first_visit:  Option<NaiveDate>,
  pub latest_visit: Option<NaiveDate>,
}

impl AttendanceHistory {
  /// More than one check-in on record.
  pub fn is_returning(&self) -> bool { self.visit_count > 1 }
}
