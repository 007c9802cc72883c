//! Application handlers, grouped by bounded context.

pub mod billing;
