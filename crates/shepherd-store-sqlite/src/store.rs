//! [`SqliteStore`], the SQLite implementation of [`VisitorStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use shepherd_core::{
  attendance::AttendanceRecord,
  intake::{Intake, IntakeOutcome},
  journal::JournalEntry,
  lifecycle::TransitionPolicy,
  projection::{VisitorFilter, VisitorQuery, VisitorRow, new_visitor_cutoff},
  store::VisitorStore,
  visitor::{Assignment, Visitor, VisitorUpdate},
};

use crate::{
  Error, Result,
  checkin,
  encode::{
    ATTENDANCE_COLUMNS, HISTORY_COLUMNS, RawAttendance, RawVisitor, RawVisitorRow,
    VISITOR_COLUMNS, encode_date, encode_dt, encode_journal, encode_time, encode_uuid,
  },
  resolver::{self, is_unique_violation},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A visitor store backed by a single SQLite file.
///
/// Clones share one background connection.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a fresh in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` against the connection outside of any explicit transaction.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(&*conn))).await?
  }

  /// Run `f` inside an immediate transaction. The transaction commits only
  /// if `f` succeeds; any error rolls back every write `f` made.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&*tx);
        if out.is_ok() {
          tx.commit()?;
        }
        Ok(out)
      })
      .await?
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn load_visitor(conn: &Connection, visitor_id: &str) -> Result<Option<RawVisitor>> {
  Ok(
    conn
      .query_row(
        &format!("SELECT {VISITOR_COLUMNS} FROM visitors v WHERE v.visitor_id = ?1"),
        rusqlite::params![visitor_id],
        RawVisitor::read,
      )
      .optional()?,
  )
}

fn require_visitor(conn: &Connection, id: Uuid) -> Result<RawVisitor> {
  load_visitor(conn, &encode_uuid(id))?
    .ok_or_else(|| shepherd_core::Error::VisitorNotFound(id).into())
}

/// Map a phone `UNIQUE` violation on update to a conflict.
fn phone_conflict(e: rusqlite::Error, phone: &str) -> Error {
  if is_unique_violation(&e) {
    shepherd_core::Error::DuplicatePhone(phone.to_owned()).into()
  } else {
    Error::Sqlite(e)
  }
}

/// Make `%`, `_` and `\` in a search term match literally under
/// `LIKE ... ESCAPE '\'`.
fn escape_like(term: &str) -> String {
  let mut out = String::with_capacity(term.len());
  for c in term.chars() {
    if matches!(c, '\\' | '%' | '_') {
      out.push('\\');
    }
    out.push(c);
  }
  out
}

// ─── VisitorStore impl ───────────────────────────────────────────────────────

impl VisitorStore for SqliteStore {
  type Error = Error;

  // ── Intake ────────────────────────────────────────────────────────────────

  async fn intake(&self, intake: Intake, at: DateTime<Utc>) -> Result<IntakeOutcome> {
    let at_str   = encode_dt(at);
    let time_str = encode_time(at.time());
    let date_str = encode_date(intake.check_in_date);

    let (raw_visitor, raw_attendance, existing, checked_in) = self
      .write(move |tx| {
        let resolved = resolver::resolve(tx, &intake, &at_str)?;
        let check_in = checkin::check_in(
          tx,
          &resolved.visitor_id,
          &intake.service_id,
          &date_str,
          &time_str,
        )?;
        let visitor = load_visitor(tx, &resolved.visitor_id)?
          .ok_or(Error::Sqlite(rusqlite::Error::QueryReturnedNoRows))?;
        Ok((visitor, check_in.record, resolved.existing, check_in.created))
      })
      .await?;

    Ok(IntakeOutcome {
      visitor: raw_visitor.into_visitor()?,
      existing,
      checked_in,
      attendance: raw_attendance.into_record()?,
    })
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_visitor(&self, id: Uuid) -> Result<Option<VisitorRow>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawVisitorRow> = self
      .read(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {VISITOR_COLUMNS}, {HISTORY_COLUMNS}
                   FROM visitors v
                   LEFT JOIN attendance a ON a.visitor_id = v.visitor_id
                  WHERE v.visitor_id = ?1
                  GROUP BY v.visitor_id"
              ),
              rusqlite::params![id_str],
              RawVisitorRow::read,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVisitorRow::into_row).transpose()
  }

  async fn find_by_phone(&self, phone: &str) -> Result<Option<Visitor>> {
    let phone = phone.trim().to_owned();

    let raw: Option<RawVisitor> = self
      .read(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {VISITOR_COLUMNS} FROM visitors v WHERE v.phone = ?1"),
              rusqlite::params![phone],
              RawVisitor::read,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVisitor::into_visitor).transpose()
  }

  async fn list_visitors(
    &self,
    query: &VisitorQuery,
    now:   DateTime<Utc>,
  ) -> Result<Vec<VisitorRow>> {
    // Build WHERE / HAVING clauses dynamically; every bound value is a string.
    let mut conds:  Vec<String> = vec![];
    let mut having: Vec<&'static str> = vec![];
    let mut values: Vec<String> = vec![];

    match query.filter {
      VisitorFilter::All => {}
      VisitorFilter::Status(status) => {
        values.push(status.as_str().to_owned());
        conds.push(format!("v.follow_up_status = ?{}", values.len()));
      }
      VisitorFilter::Converted => conds.push("v.converted_to_member = 1".to_owned()),
      VisitorFilter::New => {
        values.push(encode_dt(new_visitor_cutoff(now)));
        conds.push(format!("v.created_at >= ?{}", values.len()));
      }
      VisitorFilter::Returning => having.push("COUNT(a.attendance_id) > 1"),
    }

    if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
      values.push(format!("%{}%", escape_like(term)));
      let n = values.len();
      conds.push(format!(
        "(v.name LIKE ?{n} ESCAPE '\\' OR v.phone LIKE ?{n} ESCAPE '\\'
          OR IFNULL(v.email, '') LIKE ?{n} ESCAPE '\\' OR v.source LIKE ?{n} ESCAPE '\\')"
      ));
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    let having_clause = if having.is_empty() {
      String::new()
    } else {
      format!("HAVING {}", having.join(" AND "))
    };

    let sql = format!(
      "SELECT {VISITOR_COLUMNS}, {HISTORY_COLUMNS}
         FROM visitors v
         LEFT JOIN attendance a ON a.visitor_id = v.visitor_id
         {where_clause}
        GROUP BY v.visitor_id
        {having_clause}
        ORDER BY v.created_at DESC, v.visitor_id"
    );

    let raws: Vec<RawVisitorRow> = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(values.iter()), RawVisitorRow::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVisitorRow::into_row).collect()
  }

  async fn attendance_for(&self, visitor_id: Uuid) -> Result<Vec<AttendanceRecord>> {
    let id_str = encode_uuid(visitor_id);

    let raws: Vec<RawAttendance> = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ATTENDANCE_COLUMNS} FROM attendance
            WHERE visitor_id = ?1
            ORDER BY check_in_date DESC, check_in_time DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawAttendance::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAttendance::into_record).collect()
  }

  // ── Follow-up lifecycle ───────────────────────────────────────────────────

  async fn update_visitor(
    &self,
    id:     Uuid,
    update: VisitorUpdate,
    policy: &TransitionPolicy,
    at:     DateTime<Utc>,
  ) -> Result<Visitor> {
    let update = update.validate()?;
    let policy = policy.clone();

    let raw = self
      .write(move |tx| {
        let current = require_visitor(tx, id)?;
        policy.check(current.status()?, update.status())?;

        let mut journal = current.journal()?;
        if let Some(text) = &update.follow_up_notes {
          journal.append_unless_repeated(JournalEntry::new(at, None, text.clone()));
        }

        tx.execute(
          "UPDATE visitors
              SET name = ?2, phone = ?3, email = ?4, source = ?5,
                  follow_up_status = ?6, follow_up_date = ?7, follow_up_notes = ?8,
                  assigned_to = COALESCE(?9, assigned_to), updated_at = ?10
            WHERE visitor_id = ?1",
          rusqlite::params![
            current.visitor_id,
            update.name,
            update.phone,
            update.email,
            update.source(),
            update.status().as_str(),
            update.follow_up_date.map(encode_date),
            encode_journal(&journal)?,
            update.assigned_to,
            encode_dt(at),
          ],
        )
        .map_err(|e| phone_conflict(e, &update.phone))?;

        require_visitor(tx, id)
      })
      .await?;

    raw.into_visitor()
  }

  async fn assign_visitor(
    &self,
    id:         Uuid,
    assignment: Assignment,
    at:         DateTime<Utc>,
  ) -> Result<Visitor> {
    let assignment = assignment.validate()?;

    let raw = self
      .write(move |tx| {
        let current = require_visitor(tx, id)?;
        let mut journal = current.journal()?;
        journal.append(JournalEntry::new(
          at,
          assignment.assigned_by.clone(),
          assignment.journal_text(),
        ));

        tx.execute(
          "UPDATE visitors
              SET assigned_to = ?2, follow_up_notes = ?3, updated_at = ?4
            WHERE visitor_id = ?1",
          rusqlite::params![
            current.visitor_id,
            assignment.assigned_to,
            encode_journal(&journal)?,
            encode_dt(at),
          ],
        )?;

        require_visitor(tx, id)
      })
      .await?;

    raw.into_visitor()
  }

  async fn mark_converted(&self, id: Uuid, at: DateTime<Utc>) -> Result<Visitor> {
    let raw = self
      .write(move |tx| {
        let changed = tx.execute(
          "UPDATE visitors SET converted_to_member = 1, updated_at = ?2
            WHERE visitor_id = ?1",
          rusqlite::params![encode_uuid(id), encode_dt(at)],
        )?;
        if changed == 0 {
          return Err(shepherd_core::Error::VisitorNotFound(id).into());
        }
        require_visitor(tx, id)
      })
      .await?;

    raw.into_visitor()
  }

  async fn delete_visitor(&self, id: Uuid) -> Result<()> {
    self
      .write(move |tx| {
        let deleted = tx.execute(
          "DELETE FROM visitors WHERE visitor_id = ?1",
          rusqlite::params![encode_uuid(id)],
        )?;
        if deleted == 0 {
          return Err(shepherd_core::Error::VisitorNotFound(id).into());
        }
        Ok(())
      })
      .await
  }
}
