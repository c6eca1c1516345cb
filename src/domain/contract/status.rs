//! Contract status state machine.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Status of a contract in the subscription lifecycle.
///
/// Terminal states (`Cancelled`, `Dispute`, `Completed`, `Expired`) accept no
/// further transitions; attempts fail with a validation error rather than a
/// silent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    /// Created when an offer is accepted; awaiting the first confirmed charge.
    Created,

    /// First charge confirmed. Billing, provisioning, and sessions run.
    Active,

    /// Explicitly cancelled by parent or tutor. Terminal.
    Cancelled,

    /// Disputed by either party with a mandatory reason. Terminal pending
    /// external (administrative) resolution.
    Dispute,

    /// One party marked the work finished; waiting for both ratings.
    PendingCompletion,

    /// Both parties have rated. Terminal.
    Completed,

    /// Suspended after three consecutive recurring-charge failures. Terminal;
    /// the parent must re-subscribe. Note the dual meaning: despite the name
    /// this state is only ever reached through payment suspension - natural
    /// end-of-term expiry is not modeled as a separate state.
    Expired,
}

impl StateMachine for ContractStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ContractStatus::*;
        matches!(
            (self, target),
            // First confirmed charge
            (Created, Active)
            // From ACTIVE
                | (Active, Cancelled)
                | (Active, Dispute)
                | (Active, PendingCompletion)
                | (Active, Expired)
            // Second rating recorded
                | (PendingCompletion, Completed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ContractStatus::*;
        match self {
            Created => vec![Active],
            Active => vec![Cancelled, Dispute, PendingCompletion, Expired],
            PendingCompletion => vec![Completed],
            Cancelled | Dispute | Completed | Expired => vec![],
        }
    }
}

impl ContractStatus {
    /// All statuses, for exhaustive testing.
    pub const ALL: [ContractStatus; 7] = [
        ContractStatus::Created,
        ContractStatus::Active,
        ContractStatus::Cancelled,
        ContractStatus::Dispute,
        ContractStatus::PendingCompletion,
        ContractStatus::Completed,
        ContractStatus::Expired,
    ];

    /// True while the contract blocks a new contract on the same offer.
    pub fn is_live(&self) -> bool {
        matches!(self, ContractStatus::Created | ContractStatus::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn created_only_activates() {
        assert_eq!(
            ContractStatus::Created.valid_transitions(),
            vec![ContractStatus::Active]
        );
    }

    #[test]
    fn active_branches_four_ways() {
        let targets = ContractStatus::Active.valid_transitions();
        assert_eq!(targets.len(), 4);
        assert!(targets.contains(&ContractStatus::Expired));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for status in [
            ContractStatus::Cancelled,
            ContractStatus::Dispute,
            ContractStatus::Completed,
            ContractStatus::Expired,
        ] {
            assert!(status.is_terminal(), "{:?} should be terminal", status);
        }
    }

    #[test]
    fn pending_completion_only_completes() {
        assert_eq!(
            ContractStatus::PendingCompletion.valid_transitions(),
            vec![ContractStatus::Completed]
        );
        assert!(ContractStatus::PendingCompletion
            .transition_to(ContractStatus::Cancelled)
            .is_err());
    }

    #[test]
    fn live_statuses_block_new_contracts() {
        assert!(ContractStatus::Created.is_live());
        assert!(ContractStatus::Active.is_live());
        assert!(!ContractStatus::Expired.is_live());
        assert!(!ContractStatus::PendingCompletion.is_live());
    }

    fn any_status() -> impl Strategy<Value = ContractStatus> {
        prop::sample::select(ContractStatus::ALL.to_vec())
    }

    proptest! {
        // Every (from, to) pair behaves consistently: transition_to succeeds
        // exactly on declared edges and never mutates state on failure.
        #[test]
        fn transition_matrix_is_consistent(from in any_status(), to in any_status()) {
            let declared = from.valid_transitions().contains(&to);
            prop_assert_eq!(from.can_transition_to(&to), declared);
            match from.transition_to(to) {
                Ok(next) => {
                    prop_assert!(declared);
                    prop_assert_eq!(next, to);
                }
                Err(_) => prop_assert!(!declared),
            }
        }
    }
}
