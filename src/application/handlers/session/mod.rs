//! Session use cases - monthly provisioning and tutor check-in.

mod check_in;
mod provision_month;

pub use check_in::{CheckInSessionCommand, CheckInSessionHandler};
pub use provision_month::SessionProvisioner;
