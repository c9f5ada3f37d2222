use std::fmt;

use chrono::{DateTime, Utc};

use crate::domain::{RequirementStatus, VerificationRequirement};

/// Operations that move a requirement between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Submit,
    Approve,
    Reject,
    Reset,
    Expire,
}

impl ReviewAction {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewAction::Submit => "submit",
            ReviewAction::Approve => "approve",
            ReviewAction::Reject => "reject",
            ReviewAction::Reset => "reset",
            ReviewAction::Expire => "expire",
        }
    }
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action} a requirement that is {from}")]
pub struct TransitionError {
    pub action: ReviewAction,
    pub from: RequirementStatus,
}

/// The status `action` leads to from `from`, if the move is allowed.
pub fn next_status(
    from: RequirementStatus,
    action: ReviewAction,
) -> Result<RequirementStatus, TransitionError> {
    use RequirementStatus::*;

    let to = match (action, from) {
        (ReviewAction::Submit, Pending | Submitted | Rejected | Expired) => Submitted,
        (ReviewAction::Approve, Submitted) => Approved,
        (ReviewAction::Reject, Submitted | Approved) => Rejected,
        (ReviewAction::Reset, Approved | Rejected) => Submitted,
        (ReviewAction::Expire, Approved) => Expired,
        _ => return Err(TransitionError { action, from }),
    };
    Ok(to)
}

/// Applies `action` to the row, stamping the matching timestamps. Returns the status the row
/// had before, which callers hand to the repository as the compare-and-set guard.
pub fn apply(
    requirement: &mut VerificationRequirement,
    action: ReviewAction,
    now: DateTime<Utc>,
    reason: Option<String>,
) -> Result<RequirementStatus, TransitionError> {
    let previous = requirement.status;
    requirement.status = next_status(previous, action)?;
    requirement.updated_at = now;

    match action {
        ReviewAction::Submit => {
            requirement.submitted_at = Some(now);
            requirement.reviewed_at = None;
            requirement.approved_at = None;
            requirement.rejected_at = None;
            requirement.rejection_reason = None;
        }
        ReviewAction::Approve => {
            requirement.reviewed_at = Some(now);
            requirement.approved_at = Some(now);
            requirement.rejection_reason = None;
        }
        ReviewAction::Reject => {
            requirement.reviewed_at = Some(now);
            requirement.rejected_at = Some(now);
            requirement.approved_at = None;
            requirement.rejection_reason = reason;
        }
        ReviewAction::Reset => {
            requirement.reviewed_at = None;
            requirement.approved_at = None;
            requirement.rejected_at = None;
            requirement.rejection_reason = None;
        }
        ReviewAction::Expire => {}
    }

    Ok(previous)
}
