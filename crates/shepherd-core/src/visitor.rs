//! Visitor: the long-lived aggregate tracked from first contact through
//! follow-up.
//!
//! A visitor is keyed by phone number. Attendance facts reference a visitor
//! by id but are never owned by it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result, journal::FollowUpJournal};

/// Origin tag applied when an intake does not name one.
pub const DEFAULT_SOURCE: &str = "other";

// ─── Follow-up status ────────────────────────────────────────────────────────

/// The current stage of pastoral contact with a visitor.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FollowUpStatus {
  #[default]
  Pending,
  Contacted,
  Scheduled,
  Completed,
  NoResponse,
}

impl FollowUpStatus {
  /// The string stored in the `follow_up_status` column.
  pub fn as_str(self) -> &'static str { self.into() }

  /// Parse a stored or submitted status name.
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownStatus(s.to_owned()))
  }

  /// `completed` and `no_response` end the normal flow, although staff may
  /// still move a visitor out of them if the transition policy allows it.
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Completed | Self::NoResponse)
  }
}

// ─── Visitor ─────────────────────────────────────────────────────────────────

/// A non-member individual, unique per phone number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visitor {
  pub visitor_id:          Uuid,
  pub name:                String,
  /// Natural dedup key; never changes through intake.
  pub phone:               String,
  pub email:               Option<String>,
  /// Free-form origin tag, `"other"` unless supplied.
  pub source:              String,
  pub purpose:             Option<String>,
  pub follow_up_status:    FollowUpStatus,
  pub follow_up_date:      Option<NaiveDate>,
  pub follow_up_notes:     FollowUpJournal,
  pub assigned_to:         Option<String>,
  /// Cached on check-in. Reads recompute it from attendance.
  pub visit_count:         u32,
  /// Cached on check-in. Reads recompute it from attendance.
  pub last_visit_date:     Option<NaiveDate>,
  pub converted_to_member: bool,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

// ─── Mutations ───────────────────────────────────────────────────────────────

/// Full-record replacement applied by
/// [`crate::store::VisitorStore::update_visitor`].
///
/// Omitted optional fields are cleared (`email`, `follow_up_date`) or reset
/// to their defaults (`source`, `follow_up_status`). The journal and the
/// assignee are the exceptions: leaving them out leaves them untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VisitorUpdate {
  pub name:             String,
  pub phone:            String,
  pub email:            Option<String>,
  pub source:           Option<String>,
  pub follow_up_status: Option<FollowUpStatus>,
  pub follow_up_date:   Option<NaiveDate>,
  /// Appended to the journal unless it repeats the latest entry.
  pub follow_up_notes:  Option<String>,
  pub assigned_to:      Option<String>,
}

impl VisitorUpdate {
  /// Trim every field and reject missing `name` / `phone`.
  pub fn validate(mut self) -> Result<Self> {
    self.name = required("name", &self.name)?;
    self.phone = required("phone", &self.phone)?;
    self.email = optional(self.email);
    self.source = optional(self.source);
    self.follow_up_notes = optional(self.follow_up_notes);
    self.assigned_to = optional(self.assigned_to);
    Ok(self)
  }

  pub fn status(&self) -> FollowUpStatus {
    self.follow_up_status.unwrap_or_default()
  }

  pub fn source(&self) -> &str {
    self.source.as_deref().unwrap_or(DEFAULT_SOURCE)
  }
}

/// Input to [`crate::store::VisitorStore::assign_visitor`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Assignment {
  #[serde(default)]
  pub assigned_to: String,
  #[serde(default)]
  pub notes:       Option<String>,
  /// Recorded as the author of the journal entry.
  #[serde(default)]
  pub assigned_by: Option<String>,
}

impl Assignment {
  pub fn validate(mut self) -> Result<Self> {
    self.assigned_to = required("assigned_to", &self.assigned_to)?;
    self.notes = optional(self.notes);
    self.assigned_by = optional(self.assigned_by);
    Ok(self)
  }

  /// Journal text: `Assigned to: <who>[ - <notes>]`.
  pub fn journal_text(&self) -> String {
    match &self.notes {
      Some(notes) => format!("Assigned to: {} - {notes}", self.assigned_to),
      None => format!("Assigned to: {}", self.assigned_to),
    }
  }
}

// ─── Field helpers ───────────────────────────────────────────────────────────

pub(crate) fn required(field: &str, value: &str) -> Result<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(Error::Validation(format!("{field} is required")));
  }
  Ok(trimmed.to_owned())
}

pub(crate) fn optional(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_names_match_storage() {
    assert_eq!(FollowUpStatus::NoResponse.as_str(), "no_response");
    assert_eq!(FollowUpStatus::parse("scheduled").unwrap(), FollowUpStatus::Scheduled);
    assert!(matches!(
      FollowUpStatus::parse("lost"),
      Err(Error::UnknownStatus(s)) if s == "lost"
    ));
  }

  #[test]
  fn update_without_status_defaults_to_pending() {
    let update = VisitorUpdate {
      name: "Ama".into(),
      phone: "055".into(),
      ..Default::default()
    }
    .validate()
    .unwrap();
    assert_eq!(update.status(), FollowUpStatus::Pending);
    assert_eq!(update.source(), "other");
  }

  #[test]
  fn update_requires_name_and_phone() {
    let err = VisitorUpdate { phone: "055".into(), ..Default::default() }
      .validate()
      .unwrap_err();
    assert!(matches!(err, Error::Validation(m) if m.contains("name")));

    let err = VisitorUpdate { name: "Ama".into(), phone: "  ".into(), ..Default::default() }
      .validate()
      .unwrap_err();
    assert!(matches!(err, Error::Validation(m) if m.contains("phone")));
  }

  #[test]
  fn assignment_text_omits_empty_notes() {
    let a = Assignment {
      assigned_to: "Pastor John".into(),
      notes: Some("   ".into()),
      assigned_by: None,
    }
    .validate()
    .unwrap();
    assert_eq!(a.journal_text(), "Assigned to: Pastor John");

    let a = Assignment {
      assigned_to: "Pastor John".into(),
      notes: Some("will call Tuesday".into()),
      assigned_by: None,
    };
    assert_eq!(a.journal_text(), "Assigned to: Pastor John - will call Tuesday");
  }
}
