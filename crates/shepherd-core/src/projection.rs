//! The read-side projection of visitors: visit counts, recency, urgency and
//! display dates.
//!
//! Nothing here mutates stored state. Every listing recomputes these fields
//! from the attendance history so they never go stale.

use std::{collections::BTreeMap, str::FromStr};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::{
  Error,
  attendance::AttendanceHistory,
  visitor::{FollowUpStatus, Visitor},
};

/// Shown in place of a date that is not set.
pub const NOT_AVAILABLE: &str = "N/A";

/// Layout for human-readable dates, e.g. `Mar 1, 2026`.
pub const DISPLAY_DATE_FORMAT: &str = "%b %-d, %Y";

/// A visitor created within this many days counts as new.
pub const NEW_VISITOR_WINDOW_DAYS: i64 = 7;

// ─── Urgency ─────────────────────────────────────────────────────────────────

/// Priority tier for outstanding follow-up.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
  None,
  Low,
  Medium,
  High,
}

impl Urgency {
  /// Only pending visitors with at least one visit are ranked:
  /// `high` within 3 days, `medium` within 7, `low` beyond that.
  pub fn assess(status: FollowUpStatus, days_since_visit: Option<i64>) -> Self {
    match (status, days_since_visit) {
      (FollowUpStatus::Pending, Some(days)) if days <= 3 => Self::High,
      (FollowUpStatus::Pending, Some(days)) if days <= 7 => Self::Medium,
      (FollowUpStatus::Pending, Some(_)) => Self::Low,
      _ => Self::None,
    }
  }
}

/// Calendar days from `latest_visit` to `today`, never negative.
pub fn days_since(latest_visit: Option<NaiveDate>, today: NaiveDate) -> Option<i64> {
  latest_visit.map(|d| (today - d).num_days().max(0))
}

fn display_date(date: Option<NaiveDate>) -> String {
  date
    .map(|d| d.format(DISPLAY_DATE_FORMAT).to_string())
    .unwrap_or_else(|| NOT_AVAILABLE.to_owned())
}

// ─── Rows and summaries ──────────────────────────────────────────────────────

/// A visitor joined with its aggregated attendance, as read from the store.
#[derive(Debug, Clone)]
pub struct VisitorRow {
  pub visitor: Visitor,
  pub history: AttendanceHistory,
}

/// A visitor plus every derived field, as returned by listings.
#[derive(Debug, Clone, Serialize)]
pub struct VisitorSummary {
  #[serde(flatten)]
  pub visitor:                Visitor,
  pub first_visit:            Option<NaiveDate>,
  pub latest_visit:           Option<NaiveDate>,
  pub days_since_visit:       Option<i64>,
  pub urgency:                Urgency,
  pub first_visit_display:    String,
  pub latest_visit_display:   String,
  pub follow_up_date_display: String,
  /// The journal rendered as newline-delimited text.
  pub follow_up_notes_text:   String,
}

impl VisitorSummary {
  /// Derive every read-side field for `row` as of `today`. The cached
  /// `visit_count` / `last_visit_date` on the visitor are replaced by the
  /// values computed from attendance.
  pub fn project(row: VisitorRow, today: NaiveDate) -> Self {
    let VisitorRow { mut visitor, history } = row;
    visitor.visit_count = history.visit_count;
    visitor.last_visit_date = history.latest_visit;

    let days_since_visit = days_since(history.latest_visit, today);
    let urgency = Urgency::assess(visitor.follow_up_status, days_since_visit);

    Self {
      first_visit: history.first_visit,
      latest_visit: history.latest_visit,
      days_since_visit,
      urgency,
      first_visit_display: display_date(history.first_visit),
      latest_visit_display: display_date(history.latest_visit),
      follow_up_date_display: display_date(visitor.follow_up_date),
      follow_up_notes_text: visitor.follow_up_notes.render(),
      visitor,
    }
  }

  pub fn is_new(&self, now: DateTime<Utc>) -> bool {
    self.visitor.created_at >= new_visitor_cutoff(now)
  }
}

/// Visitors created at or after this instant count as new.
pub fn new_visitor_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
  now - Duration::days(NEW_VISITOR_WINDOW_DAYS)
}

// ─── Filtering ───────────────────────────────────────────────────────────────

/// Listing filter, as accepted by `?filter=`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VisitorFilter {
  #[default]
  All,
  Status(FollowUpStatus),
  /// `converted_to_member = true`.
  Converted,
  /// Created within the last [`NEW_VISITOR_WINDOW_DAYS`] days.
  New,
  /// More than one attendance record.
  Returning,
}

impl FromStr for VisitorFilter {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "" | "all" => Ok(Self::All),
      "converted" => Ok(Self::Converted),
      "new" => Ok(Self::New),
      "returning" => Ok(Self::Returning),
      other => FollowUpStatus::from_str(other)
        .map(Self::Status)
        .map_err(|_| Error::UnknownFilter(other.to_owned())),
    }
  }
}

/// Parameters for [`crate::store::VisitorStore::list_visitors`].
#[derive(Debug, Clone, Default)]
pub struct VisitorQuery {
  pub filter: VisitorFilter,
  /// Case-insensitive substring match over name, phone, email and source.
  pub search: Option<String>,
}

// ─── Stats ───────────────────────────────────────────────────────────────────

/// Follow-up workload counts derived from projected visitors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FollowUpStats {
  pub total:         usize,
  pub by_status:     BTreeMap<FollowUpStatus, usize>,
  pub converted:     usize,
  pub new_this_week: usize,
  pub returning:     usize,
  pub urgent_high:   usize,
  pub urgent_medium: usize,
  pub urgent_low:    usize,
}

impl FollowUpStats {
  pub fn tally<'a>(
    summaries: impl IntoIterator<Item = &'a VisitorSummary>,
    now: DateTime<Utc>,
  ) -> Self {
    let mut stats = Self::default();
    for s in summaries {
      stats.total += 1;
      *stats.by_status.entry(s.visitor.follow_up_status).or_default() += 1;
      if s.visitor.converted_to_member {
        stats.converted += 1;
      }
      if s.is_new(now) {
        stats.new_this_week += 1;
      }
      if s.visitor.visit_count > 1 {
        stats.returning += 1;
      }
      match s.urgency {
        Urgency::High => stats.urgent_high += 1,
        Urgency::Medium => stats.urgent_medium += 1,
        Urgency::Low => stats.urgent_low += 1,
        Urgency::None => {}
      }
    }
    stats
  }
}
