//! Domain layer.

pub mod billing;
