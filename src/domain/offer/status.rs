//! Offer status state machine.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Status of a tutoring offer.
///
/// Mutated only by the receiving party's accept or reject action; both
/// outcomes are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    /// Sent, awaiting the receiver's decision.
    Pending,

    /// Accepted by the receiver. A contract may now be created for it.
    Accepted,

    /// Rejected by the receiver.
    Rejected,
}

impl StateMachine for OfferStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use OfferStatus::*;
        matches!((self, target), (Pending, Accepted) | (Pending, Rejected))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use OfferStatus::*;
        match self {
            Pending => vec![Accepted, Rejected],
            Accepted => vec![],
            Rejected => vec![],
        }
    }
}
