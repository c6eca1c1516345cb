//! Contract lifecycle use cases - cancellation, disputes, completion, and
//! the dual-rating closure.

mod cancel_contract;
mod submit_rating;
mod terminate_contract;

pub use cancel_contract::{CancelContractCommand, CancelContractHandler};
pub use submit_rating::{SubmitRatingCommand, SubmitRatingHandler, SubmitRatingResult};
pub use terminate_contract::{
    TerminateContractCommand, TerminateContractHandler, TerminationIntent,
};
