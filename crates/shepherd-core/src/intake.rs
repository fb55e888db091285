//! Intake: resolving a visitor's identity and recording a check-in as one
//! unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  attendance::AttendanceRecord,
  visitor::{DEFAULT_SOURCE, Visitor, optional, required},
};

/// Intake payload as submitted by the check-in form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntakeRequest {
  #[serde(default)]
  pub name:          String,
  #[serde(default)]
  pub phone:         String,
  #[serde(default)]
  pub email:         Option<String>,
  #[serde(default)]
  pub source:        Option<String>,
  #[serde(default)]
  pub purpose:       Option<String>,
  #[serde(default)]
  pub service_id:    String,
  /// Defaults to the current date.
  #[serde(default)]
  pub check_in_date: Option<NaiveDate>,
}

/// A validated intake, with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intake {
  pub name:          String,
  pub phone:         String,
  pub email:         Option<String>,
  pub source:        String,
  pub purpose:       Option<String>,
  pub service_id:    String,
  pub check_in_date: NaiveDate,
}

impl IntakeRequest {
  /// Reject missing `name`, `phone` or `service_id` and a check-in date
  /// after `today`, then fill in defaults. Nothing is persisted before this
  /// succeeds.
  pub fn validate(self, today: NaiveDate) -> Result<Intake> {
    if let Some(date) = self.check_in_date
      && date > today
    {
      return Err(Error::Validation(format!(
        "check_in_date {date} is in the future"
      )));
    }
    Ok(Intake {
      name:          required("name", &self.name)?,
      phone:         required("phone", &self.phone)?,
      email:         optional(self.email),
      source:        optional(self.source).unwrap_or_else(|| DEFAULT_SOURCE.to_owned()),
      purpose:       optional(self.purpose),
      service_id:    required("service_id", &self.service_id)?,
      check_in_date: self.check_in_date.unwrap_or(today),
    })
  }
}

/// Result of a committed intake.
#[derive(Debug, Clone, Serialize)]
pub struct IntakeOutcome {
  pub visitor:    Visitor,
  /// `true` when the phone number already belonged to a visitor.
  pub existing:   bool,
  /// `false` when the visitor was already checked in for this service today.
  pub checked_in: bool,
  /// The attendance row for this service and day, new or pre-existing.
  pub attendance: AttendanceRecord,
}

impl IntakeOutcome {
  /// User-facing greeting; depends only on whether the visitor is new.
  pub fn welcome_message(&self) -> String {
    let name = &self.visitor.name;
    if self.existing {
      format!("Welcome back, {name}! Your check-in has been recorded.")
    } else {
      format!("Thank you for visiting, {name}! You have been registered successfully.")
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2026, 3, 1).unwrap() }

  #[test]
  fn defaults_are_applied() {
    let intake = IntakeRequest {
      name: " Ama ".into(),
      phone: "055".into(),
      email: Some(String::new()),
      service_id: "S1".into(),
      ..Default::default()
    }
    .validate(today())
    .unwrap();

    assert_eq!(intake.name, "Ama");
    assert_eq!(intake.email, None);
    assert_eq!(intake.source, "other");
    assert_eq!(intake.check_in_date, today());
  }

  #[test]
  fn service_is_required() {
    let err = IntakeRequest {
      name: "Ama".into(),
      phone: "055".into(),
      ..Default::default()
    }
    .validate(today())
    .unwrap_err();
    assert!(matches!(err, crate::Error::Validation(m) if m.contains("service_id")));
  }

  #[test]
  fn future_check_in_is_rejected() {
    let request = |d: u32| IntakeRequest {
      name: "Ama".into(),
      phone: "055".into(),
      service_id: "S1".into(),
      check_in_date: NaiveDate::from_ymd_opt(2026, 3, d),
      ..Default::default()
    };

    let err = request(20).validate(today()).unwrap_err();
    assert!(matches!(err, crate::Error::Validation(m) if m.contains("check_in_date")));

    assert_eq!(request(1).validate(today()).unwrap().check_in_date, today());
  }
}
