//! Error types for `shepherd-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::visitor::FollowUpStatus;

#[derive(Debug, Error)]
pub enum Error {
  /// A required field was missing or malformed. Raised before any store
  /// mutation takes place.
  #[error("{0}")]
  Validation(String),

  #[error("visitor not found: {0}")]
  VisitorNotFound(Uuid),

  /// Another visitor already owns this phone number and could not be
  /// re-resolved after the insert lost the race.
  #[error("a visitor with phone {0:?} already exists")]
  DuplicatePhone(String),

  #[error("follow-up status cannot move from {from} to {to}")]
  TransitionNotAllowed {
    from: FollowUpStatus,
    to:   FollowUpStatus,
  },

  #[error("unknown follow-up status: {0:?}")]
  UnknownStatus(String),

  #[error("unknown visitor filter: {0:?}")]
  UnknownFilter(String),
}

/// How a failure should be reported to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Validation,
  NotFound,
  Conflict,
  Store,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Validation(_)
      | Self::TransitionNotAllowed { .. }
      | Self::UnknownStatus(_)
      | Self::UnknownFilter(_) => ErrorKind::Validation,
      Self::VisitorNotFound(_) => ErrorKind::NotFound,
      Self::DuplicatePhone(_) => ErrorKind::Conflict,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
