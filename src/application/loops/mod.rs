//! Background loops and the scheduler that owns them.

mod reconciliation;
mod scheduler;
mod session_completion;

pub use reconciliation::{ReconciliationLoop, ReconciliationReport};
pub use scheduler::Scheduler;
pub use session_completion::{SessionCompletionLoop, SweepReport};
