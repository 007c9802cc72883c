//! Application layer: use-case orchestration over the ports.

pub mod environments;
pub mod handlers;

pub use environments::{PaymentEnvironment, PaymentEnvironments};
