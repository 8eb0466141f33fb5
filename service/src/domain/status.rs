//! Status machine of the documents and projects.
//!
//! Each status enum implements [`Lifecycle`], which decides which moves are
//! allowed and whether the owning entity may still be deleted.

/// Lifecycle of a status value.
pub trait Lifecycle: Copy + Eq {
    /// Indicates whether no further regular transitions are expected from
    /// this status.
    fn is_terminal(self) -> bool;

    /// Indicates whether the entity in this status may be deleted.
    fn allows_deletion(self) -> bool;

    /// Indicates whether the entity in this status may be moved to the `next`
    /// one by an explicit request.
    fn can_transition_to(self, next: Self) -> bool;
}

/// Checks whether `from` may be moved to `to`.
///
/// Staying in the same status is always allowed.
pub fn check_transition<S: Lifecycle>(from: S, to: S) -> Result<(), (S, S)> {
    if from == to || from.can_transition_to(to) {
        Ok(())
    } else {
        Err((from, to))
    }
}

#[cfg(test)]
mod spec {
    use crate::domain::{invoice, project, quote};

    use super::{check_transition, Lifecycle as _};

    #[test]
    fn quote_deletion_guard() {
        use quote::Status as S;

        assert!(S::Draft.allows_deletion());
        assert!(S::Sent.allows_deletion());
        assert!(S::Rejected.allows_deletion());
        assert!(S::Expired.allows_deletion());
        assert!(!S::Accepted.allows_deletion());
    }

    #[test]
    fn quote_accepts_any_known_move() {
        use quote::Status as S;

        assert!(check_transition(S::Draft, S::Sent).is_ok());
        assert!(check_transition(S::Sent, S::Accepted).is_ok());
        assert!(check_transition(S::Accepted, S::Draft).is_ok());
        assert!(check_transition(S::Rejected, S::Sent).is_ok());
        assert!(S::Accepted.is_terminal());
        assert!(!S::Sent.is_terminal());
    }

    #[test]
    fn project_terminal_statuses() {
        use project::Status as S;

        for s in [S::Planning, S::InProgress, S::OnHold] {
            assert!(!s.is_terminal(), "{s}");
        }
        for s in [S::Completed, S::Cancelled] {
            assert!(s.is_terminal(), "{s}");
        }
        assert!(check_transition(S::Completed, S::InProgress).is_ok());
    }

    #[test]
    fn invoice_paid_is_final() {
        use invoice::Status as S;

        assert!(!S::Paid.allows_deletion());
        assert!(S::Draft.allows_deletion());
        assert!(S::Overdue.allows_deletion());

        assert!(check_transition(S::Draft, S::Sent).is_ok());
        assert!(check_transition(S::Sent, S::Paid).is_ok());
        assert!(check_transition(S::Overdue, S::Paid).is_ok());
        assert!(check_transition(S::Sent, S::Cancelled).is_ok());
        assert_eq!(
            check_transition(S::Paid, S::Draft),
            Err((S::Paid, S::Draft)),
        );
        assert!(check_transition(S::Cancelled, S::Sent).is_err());
    }
}
