//! Follow-up lifecycle: which status changes staff may make.
//!
//! The natural flow is `pending → contacted → scheduled → completed`, with
//! `no_response` reachable from any non-terminal state. Staff have always been
//! free to move a visitor anywhere, so the default policy allows every
//! transition; deployments that want the strict flow opt in through
//! configuration.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::{Error, Result, visitor::FollowUpStatus};

/// The set of permitted status transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionPolicy {
  /// `None` allows every transition.
  allowed: Option<BTreeMap<FollowUpStatus, BTreeSet<FollowUpStatus>>>,
}

impl TransitionPolicy {
  /// Any status may move to any other.
  pub fn unrestricted() -> Self { Self::default() }

  /// The forward-only flow plus `no_response` from any non-terminal state.
  pub fn forward_only() -> Self {
    use crate::visitor::FollowUpStatus::*;
    Self::from_map([
      (Pending, vec![Contacted, NoResponse]),
      (Contacted, vec![Scheduled, NoResponse]),
      (Scheduled, vec![Completed, NoResponse]),
    ])
  }

  /// Build a policy from an explicit adjacency list. Statuses absent from
  /// the map may not move anywhere.
  pub fn from_map(
    map: impl IntoIterator<Item = (FollowUpStatus, Vec<FollowUpStatus>)>,
  ) -> Self {
    let allowed = map
      .into_iter()
      .map(|(from, to)| (from, to.into_iter().collect()))
      .collect();
    Self { allowed: Some(allowed) }
  }

  pub fn is_unrestricted(&self) -> bool { self.allowed.is_none() }

  /// Staying put is always permitted so repeated updates stay idempotent.
  pub fn allows(&self, from: FollowUpStatus, to: FollowUpStatus) -> bool {
    if from == to {
      return true;
    }
    match &self.allowed {
      None => true,
      Some(map) => map.get(&from).is_some_and(|targets| targets.contains(&to)),
    }
  }

  pub fn check(&self, from: FollowUpStatus, to: FollowUpStatus) -> Result<()> {
    if self.allows(from, to) {
      Ok(())
    } else {
      Err(Error::TransitionNotAllowed { from, to })
    }
  }
}

// ─── Configuration ───────────────────────────────────────────────────────────

/// The `[follow_up]` configuration table.
///
/// ```toml
/// [follow_up]
/// forward_only = true
///
/// # or an explicit adjacency list:
/// [follow_up.transitions]
/// pending   = ["contacted", "no_response"]
/// contacted = ["scheduled", "pending"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FollowUpConfig {
  #[serde(default)]
  pub forward_only: bool,
  #[serde(default)]
  pub transitions:  Option<BTreeMap<FollowUpStatus, Vec<FollowUpStatus>>>,
}

impl FollowUpConfig {
  /// An explicit `transitions` table wins over `forward_only`.
  pub fn policy(&self) -> TransitionPolicy {
    match (&self.transitions, self.forward_only) {
      (Some(map), _) => TransitionPolicy::from_map(map.clone()),
      (None, true) => TransitionPolicy::forward_only(),
      (None, false) => TransitionPolicy::unrestricted(),
    }
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator as _;

  use super::*;
  use crate::visitor::FollowUpStatus::*;

  #[test]
  fn default_policy_allows_backward_moves() {
    let policy = TransitionPolicy::default();
    assert!(policy.allows(Completed, Pending));
    assert!(policy.allows(NoResponse, Contacted));
    assert!(FollowUpStatus::iter().all(|to| policy.allows(Completed, to)));
  }

  #[test]
  fn forward_only_rejects_backward_moves() {
    let policy = TransitionPolicy::forward_only();
    assert!(policy.allows(Pending, Contacted));
    assert!(policy.allows(Scheduled, NoResponse));
    assert!(policy.allows(Completed, Completed));
    assert!(!policy.allows(Contacted, Pending));
    assert!(!policy.allows(Completed, NoResponse));
    assert!(matches!(
      policy.check(Scheduled, Pending),
      Err(Error::TransitionNotAllowed { from: Scheduled, to: Pending })
    ));
  }

  #[test]
  fn no_response_reachable_from_every_open_state() {
    let policy = TransitionPolicy::forward_only();
    for from in FollowUpStatus::iter().filter(|s| !s.is_terminal()) {
      assert!(policy.allows(from, NoResponse), "{from} -> no_response");
    }
  }

  #[test]
  fn config_transitions_override_forward_only() {
    let cfg: FollowUpConfig = serde_json::from_value(serde_json::json!({
      "forward_only": true,
      "transitions": { "pending": ["completed"] },
    }))
    .unwrap();
    let policy = cfg.policy();
    assert!(policy.allows(Pending, Completed));
    assert!(!policy.allows(Pending, Contacted));
  }

  #[test]
  fn empty_config_is_unrestricted() {
    assert!(FollowUpConfig::default().policy().is_unrestricted());
  }
}
