//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that string
//! comparison in SQL is chronological. Calendar dates are `YYYY-MM-DD`, times
//! of day `HH:MM:SS`. The follow-up journal is stored as a JSON array. UUIDs
//! are stored as hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use shepherd_core::{
  attendance::{AttendanceHistory, AttendanceRecord},
  journal::FollowUpJournal,
  projection::VisitorRow,
  visitor::{FollowUpStatus, Visitor},
};
use uuid::Uuid;

use crate::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate / NaiveTime ────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn encode_time(t: NaiveTime) -> String { t.format(TIME_FORMAT).to_string() }

pub fn decode_time(s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s, TIME_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Journal ──────────────────────────────────────────────────────────────────

pub fn encode_journal(journal: &FollowUpJournal) -> Result<String> {
  Ok(serde_json::to_string(journal)?)
}

pub fn decode_journal(s: &str) -> Result<FollowUpJournal> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawVisitor::read`], qualified with the `v` alias.
pub const VISITOR_COLUMNS: &str = "
  v.visitor_id, v.name, v.phone, v.email, v.source, v.purpose,
  v.follow_up_status, v.follow_up_date, v.follow_up_notes, v.assigned_to,
  v.visit_count, v.last_visit_date, v.converted_to_member,
  v.created_at, v.updated_at";

/// Raw values read directly from a `visitors` row.
pub struct RawVisitor {
  pub visitor_id:          String,
  pub name:                String,
  pub phone:               String,
  pub email:               Option<String>,
  pub source:              String,
  pub purpose:             Option<String>,
  pub follow_up_status:    String,
  pub follow_up_date:      Option<String>,
  pub follow_up_notes:     String,
  pub assigned_to:         Option<String>,
  pub visit_count:         i64,
  pub last_visit_date:     Option<String>,
  pub converted_to_member: bool,
  pub created_at:          String,
  pub updated_at:          String,
}

impl RawVisitor {
  /// Read the [`VISITOR_COLUMNS`] that start at column 0.
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      visitor_id:          row.get(0)?,
      name:                row.get(1)?,
      phone:               row.get(2)?,
      email:               row.get(3)?,
      source:              row.get(4)?,
      purpose:             row.get(5)?,
      follow_up_status:    row.get(6)?,
      follow_up_date:      row.get(7)?,
      follow_up_notes:     row.get(8)?,
      assigned_to:         row.get(9)?,
      visit_count:         row.get(10)?,
      last_visit_date:     row.get(11)?,
      converted_to_member: row.get(12)?,
      created_at:          row.get(13)?,
      updated_at:          row.get(14)?,
    })
  }

  pub fn status(&self) -> Result<FollowUpStatus> {
    Ok(FollowUpStatus::parse(&self.follow_up_status)?)
  }

  pub fn journal(&self) -> Result<FollowUpJournal> {
    decode_journal(&self.follow_up_notes)
  }

  pub fn into_visitor(self) -> Result<Visitor> {
    Ok(Visitor {
      visitor_id:          decode_uuid(&self.visitor_id)?,
      follow_up_status:    self.status()?,
      follow_up_notes:     self.journal()?,
      follow_up_date:      self.follow_up_date.as_deref().map(decode_date).transpose()?,
      last_visit_date:     self.last_visit_date.as_deref().map(decode_date).transpose()?,
      visit_count:         u32::try_from(self.visit_count)?,
      created_at:          decode_dt(&self.created_at)?,
      updated_at:          decode_dt(&self.updated_at)?,
      name:                self.name,
      phone:               self.phone,
      email:               self.email,
      source:              self.source,
      purpose:             self.purpose,
      assigned_to:         self.assigned_to,
      converted_to_member: self.converted_to_member,
    })
  }
}

/// A visitor row followed by the attendance aggregate columns
/// `COUNT(a.attendance_id), MIN(a.check_in_date), MAX(a.check_in_date)`.
pub struct RawVisitorRow {
  pub visitor:      RawVisitor,
  pub visit_count:  i64,
  pub first_visit:  Option<String>,
  pub latest_visit: Option<String>,
}

/// Aggregate columns appended after [`VISITOR_COLUMNS`].
pub const HISTORY_COLUMNS: &str =
  "COUNT(a.attendance_id), MIN(a.check_in_date), MAX(a.check_in_date)";

impl RawVisitorRow {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      visitor:      RawVisitor::read(row)?,
      visit_count:  row.get(15)?,
      first_visit:  row.get(16)?,
      latest_visit: row.get(17)?,
    })
  }

  pub fn into_row(self) -> Result<VisitorRow> {
    let history = AttendanceHistory {
      visit_count:  u32::try_from(self.visit_count)?,
      first_visit:  self.first_visit.as_deref().map(decode_date).transpose()?,
      latest_visit: self.latest_visit.as_deref().map(decode_date).transpose()?,
    };
    Ok(VisitorRow { visitor: self.visitor.into_visitor()?, history })
  }
}

/// Column list matching [`RawAttendance::read`].
pub const ATTENDANCE_COLUMNS: &str =
  "attendance_id, visitor_id, service_id, check_in_date, check_in_time, status";

/// Raw strings read directly from an `attendance` row.
pub struct RawAttendance {
  pub attendance_id: String,
  pub visitor_id:    String,
  pub service_id:    String,
  pub check_in_date: String,
  pub check_in_time: String,
  pub status:        String,
}

impl RawAttendance {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      attendance_id: row.get(0)?,
      visitor_id:    row.get(1)?,
      service_id:    row.get(2)?,
      check_in_date: row.get(3)?,
      check_in_time: row.get(4)?,
      status:        row.get(5)?,
    })
  }

  pub fn into_record(self) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
      attendance_id: decode_uuid(&self.attendance_id)?,
      visitor_id:    decode_uuid(&self.visitor_id)?,
      service_id:    self.service_id,
      check_in_date: decode_date(&self.check_in_date)?,
      check_in_time: decode_time(&self.check_in_time)?,
      status:        self.status,
    })
  }
}
