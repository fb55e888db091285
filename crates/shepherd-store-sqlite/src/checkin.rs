//! Check-in engine: at most one attendance record per visitor, service and
//! day.

use rusqlite::{Connection, OptionalExtension as _};
use shepherd_core::attendance::VISITOR_CHECK_IN;
use uuid::Uuid;

use crate::{
  Result,
  encode::{ATTENDANCE_COLUMNS, RawAttendance, encode_uuid},
};

pub struct CheckIn {
  pub record:  RawAttendance,
  /// `false` when the visitor was already checked in.
  pub created: bool,
}

/// Ensure an attendance record exists for the triple. An existing record is
/// returned untouched; otherwise one is inserted with the given time and the
/// visitor's cached visit counters are refreshed.
pub fn check_in(
  conn: &Connection,
  visitor_id: &str,
  service_id: &str,
  check_in_date: &str,
  check_in_time: &str,
) -> Result<CheckIn> {
  let existing = conn
    .query_row(
      &format!(
        "SELECT {ATTENDANCE_COLUMNS} FROM attendance
          WHERE visitor_id = ?1 AND service_id = ?2 AND check_in_date = ?3"
      ),
      rusqlite::params![visitor_id, service_id, check_in_date],
      RawAttendance::read,
    )
    .optional()?;

  if let Some(record) = existing {
    return Ok(CheckIn { record, created: false });
  }

  let record = RawAttendance {
    attendance_id: encode_uuid(Uuid::new_v4()),
    visitor_id:    visitor_id.to_owned(),
    service_id:    service_id.to_owned(),
    check_in_date: check_in_date.to_owned(),
    check_in_time: check_in_time.to_owned(),
    status:        VISITOR_CHECK_IN.to_owned(),
  };

  conn.execute(
    "INSERT INTO attendance (
       attendance_id, visitor_id, service_id, check_in_date, check_in_time, status
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      record.attendance_id,
      record.visitor_id,
      record.service_id,
      record.check_in_date,
      record.check_in_time,
      record.status,
    ],
  )?;

  conn.execute(
    "UPDATE visitors
        SET visit_count     = (SELECT COUNT(*) FROM attendance WHERE visitor_id = ?1),
            last_visit_date = (SELECT MAX(check_in_date) FROM attendance WHERE visitor_id = ?1)
      WHERE visitor_id = ?1",
    rusqlite::params![visitor_id],
  )?;

  Ok(CheckIn { record, created: true })
}
