//! Settlement flags.
//!
//! Each split carries two independent one-way booleans: the owning
//! participant first accepts their share, then marks it paid. Neither flag
//! ever resets, so re-submitting a transition is a no-op rather than an
//! error.

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Acceptance/payment state of a single split.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitStatus {
    pub accepted: bool,
    pub paid: bool,
}

/// Requested flag transitions.
///
/// `true` raises a flag, `false` leaves it alone. There is no way to lower a
/// flag once raised.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SplitStatusUpdate {
    pub accept: bool,
    pub pay: bool,
}

impl SplitStatus {
    /// Applies `update` on top of the current state.
    ///
    /// A split cannot be paid before it is accepted; accepting and paying in
    /// the same update is allowed.
    pub fn apply(self, update: SplitStatusUpdate) -> ResultEngine<SplitStatus> {
        let next = SplitStatus {
            accepted: self.accepted || update.accept,
            paid: self.paid || update.pay,
        };
        if next.paid && !next.accepted {
            return Err(EngineError::Validation(
                "a split must be accepted before it can be paid".to_string(),
            ));
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unaccepted_and_unpaid() {
        let status = SplitStatus::default();
        assert!(!status.accepted);
        assert!(!status.paid);
    }

    #[test]
    fn accept_is_idempotent() {
        let update = SplitStatusUpdate {
            accept: true,
            pay: false,
        };
        let once = SplitStatus::default().apply(update).unwrap();
        let twice = once.apply(update).unwrap();
        assert_eq!(once, twice);
        assert!(twice.accepted);
        assert!(!twice.paid);
    }

    #[test]
    fn pay_requires_accept() {
        let err = SplitStatus::default()
            .apply(SplitStatusUpdate {
                accept: false,
                pay: true,
            })
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::Validation("a split must be accepted before it can be paid".to_string())
        );
    }

    #[test]
    fn accept_and_pay_together() {
        let status = SplitStatus::default()
            .apply(SplitStatusUpdate {
                accept: true,
                pay: true,
            })
            .unwrap();
        assert!(status.accepted);
        assert!(status.paid);
    }

    #[test]
    fn pay_after_accept() {
        let accepted = SplitStatus {
            accepted: true,
            paid: false,
        };
        let paid = accepted
            .apply(SplitStatusUpdate {
                accept: false,
                pay: true,
            })
            .unwrap();
        assert!(paid.accepted);
        assert!(paid.paid);
    }

    #[test]
    fn flags_never_reset() {
        let settled = SplitStatus {
            accepted: true,
            paid: true,
        };
        let after = settled.apply(SplitStatusUpdate::default()).unwrap();
        assert_eq!(after, settled);
    }
}
