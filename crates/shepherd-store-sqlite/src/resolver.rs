//! Visitor identity resolution: find-or-create by phone number.
//!
//! Runs inside the caller's transaction. The `UNIQUE` constraint on
//! `visitors.phone` is the final backstop: an insert that loses a race to a
//! concurrent intake adopts the winning row instead of failing.

use rusqlite::{Connection, OptionalExtension as _};
use shepherd_core::intake::Intake;
use uuid::Uuid;

use crate::{Error, Result, encode::encode_uuid};

/// The canonical visitor for an intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
  pub visitor_id: String,
  /// The phone number was already on record.
  pub existing:   bool,
}

/// Resolve `intake` to exactly one visitor row, refreshing the descriptive
/// fields of an existing visitor (last write wins).
pub fn resolve(conn: &Connection, intake: &Intake, at: &str) -> Result<Resolved> {
  match lookup(conn, &intake.phone)? {
    Some(visitor_id) => {
      refresh(conn, &visitor_id, intake, at)?;
      Ok(Resolved { visitor_id, existing: true })
    }
    None => create_or_adopt(conn, intake, at),
  }
}

/// Insert a new visitor; on a phone conflict, retry the lookup-then-update
/// path once.
pub(crate) fn create_or_adopt(
  conn: &Connection,
  intake: &Intake,
  at: &str,
) -> Result<Resolved> {
  let visitor_id = encode_uuid(Uuid::new_v4());
  match insert(conn, &visitor_id, intake, at) {
    Ok(()) => Ok(Resolved { visitor_id, existing: false }),
    Err(e) if is_unique_violation(&e) => {
      tracing::debug!(phone = %intake.phone, "phone claimed concurrently; adopting existing visitor");
      let visitor_id = lookup(conn, &intake.phone)?
        .ok_or_else(|| shepherd_core::Error::DuplicatePhone(intake.phone.clone()))?;
      refresh(conn, &visitor_id, intake, at)?;
      Ok(Resolved { visitor_id, existing: true })
    }
    Err(e) => Err(Error::Sqlite(e)),
  }
}

fn lookup(conn: &Connection, phone: &str) -> Result<Option<String>> {
  Ok(
    conn
      .query_row(
        "SELECT visitor_id FROM visitors WHERE phone = ?1",
        rusqlite::params![phone],
        |row| row.get(0),
      )
      .optional()?,
  )
}

fn insert(
  conn: &Connection,
  visitor_id: &str,
  intake: &Intake,
  at: &str,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO visitors (
       visitor_id, name, phone, email, source, purpose, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
    rusqlite::params![
      visitor_id,
      intake.name,
      intake.phone,
      intake.email,
      intake.source,
      intake.purpose,
      at,
    ],
  )?;
  Ok(())
}

/// `phone` and `visitor_id` never change here.
fn refresh(conn: &Connection, visitor_id: &str, intake: &Intake, at: &str) -> Result<()> {
  conn.execute(
    "UPDATE visitors
        SET name = ?2, email = ?3, source = ?4, purpose = ?5, updated_at = ?6
      WHERE visitor_id = ?1",
    rusqlite::params![
      visitor_id,
      intake.name,
      intake.email,
      intake.source,
      intake.purpose,
      at,
    ],
  )?;
  Ok(())
}

pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}
