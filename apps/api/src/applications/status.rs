//! Application review workflow.
//!
//! ```text
//! pending ──► reviewed ──► rejected
//!    │  ◄────────┘            ▲
//!    └────────────────────────┘
//! ```
//! `rejected` is terminal. Re-applying the current status is a no-op.

use crate::errors::AppError;
use crate::models::application::ApplicationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Changed,
}

pub fn check_transition(
    from: ApplicationStatus,
    to: ApplicationStatus,
) -> Result<Transition, AppError> {
    use ApplicationStatus::*;

    if from == to {
        return Ok(Transition::Unchanged);
    }
    match (from, to) {
        (Pending, Reviewed) | (Pending, Rejected) | (Reviewed, Rejected) | (Reviewed, Pending) => {
            Ok(Transition::Changed)
        }
        _ => Err(AppError::UnprocessableEntity(format!(
            "Cannot move an application from {from} to {to}"
        ))),
    }
}

/// Only pending applications can be withdrawn by the applicant.
pub fn can_withdraw(status: ApplicationStatus) -> bool {
    status == ApplicationStatus::Pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApplicationStatus::*;

    #[test]
    fn test_allowed_transitions() {
        for (from, to) in [
            (Pending, Reviewed),
            (Pending, Rejected),
            (Reviewed, Rejected),
            (Reviewed, Pending),
        ] {
            assert_eq!(check_transition(from, to).unwrap(), Transition::Changed);
        }
    }

    #[test]
    fn test_rejected_is_terminal() {
        for to in [Pending, Reviewed] {
            assert!(matches!(
                check_transition(Rejected, to),
                Err(AppError::UnprocessableEntity(_))
            ));
        }
    }

    #[test]
    fn test_same_status_is_noop() {
        for status in ApplicationStatus::ALL {
            assert_eq!(
                check_transition(*status, *status).unwrap(),
                Transition::Unchanged
            );
        }
    }

    #[test]
    fn test_withdraw_only_pending() {
        assert!(can_withdraw(Pending));
        assert!(!can_withdraw(Reviewed));
        assert!(!can_withdraw(Rejected));
    }
}
