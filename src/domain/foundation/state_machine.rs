//! State machine trait for lifecycle status enums.
//!
//! Contract, offer, schedule, and session-detail statuses all move along a
//! fixed set of edges. Implementors declare the edges once and get validated
//! transitions for free; an edge outside the set fails with a validation
//! error and leaves state unchanged.

use super::ValidationError;

/// Trait for status enums that represent state machines.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from the current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs the transition with validation, erroring if the edge is not
    /// in the declared set.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if the current state is terminal (no valid outgoing edges).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
