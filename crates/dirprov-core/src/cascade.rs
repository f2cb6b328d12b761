// ── Best-effort cascade reporting ──
//
// Multi-entry operations commit their critical path first and then run
// a list of independent follow-up steps. A failed step is logged and
// recorded here; it never turns the overall result into an error.

use serde::Serialize;
use strum::Display;
use tracing::warn;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CascadeAction {
    /// Rewrite a renamed address in another group's member list.
    UpdateGroupMember,
    /// Move an alias entry to its new domain.
    RelocateAlias,
    /// Remove an alias address from its owner.
    StripOwnerAddress,
    /// Remove an address from a static group.
    StripGroupMember,
    /// Remove an address from a dynamic group's external unit.
    StripExternalMember,
    /// Remove a dynamic group id from a member's back-reference.
    StripBackReference,
    /// Delete an alias entry.
    RemoveAlias,
    /// Rewrite the target of an alias that moved with its domain.
    FixForeignAlias,
    /// Rewrite an out-of-domain group's reference to a moved address.
    FixForeignGroupMember,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Ok,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeStep {
    pub action: CascadeAction,
    /// The entry or address the step touched.
    pub target: String,
    pub outcome: StepOutcome,
}

impl CascadeStep {
    pub fn is_ok(&self) -> bool {
        self.outcome == StepOutcome::Ok
    }
}

/// Every best-effort step an operation attempted, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub steps: Vec<CascadeStep>,
}

impl CascadeReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one step, logging failures.
    pub fn record(
        &mut self,
        action: CascadeAction,
        target: impl Into<String>,
        result: Result<(), CoreError>,
    ) {
        let target = target.into();
        let outcome = match result {
            Ok(()) => StepOutcome::Ok,
            Err(err) => {
                warn!(%action, target = %target, error = %err, "cascade step failed");
                StepOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        };
        self.steps.push(CascadeStep {
            action,
            target,
            outcome,
        });
    }

    pub fn merge(&mut self, other: CascadeReport) {
        self.steps.extend(other.steps);
    }

    pub fn failed(&self) -> impl Iterator<Item = &CascadeStep> {
        self.steps.iter().filter(|s| !s.is_ok())
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn is_clean(&self) -> bool {
        self.failed_count() == 0
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_are_counted_not_raised() {
        let mut report = CascadeReport::new();
        report.record(CascadeAction::UpdateGroupMember, "g1@a.com", Ok(()));
        report.record(
            CascadeAction::RelocateAlias,
            "al@a.com",
            Err(CoreError::collision("alias", "al@b.com")),
        );

        assert_eq!(report.len(), 2);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.is_clean());
        let failed: Vec<_> = report.failed().map(|s| s.target.as_str()).collect();
        assert_eq!(failed, ["al@a.com"]);
    }
}
