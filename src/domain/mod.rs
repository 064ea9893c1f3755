//! Domain layer: pure models, error taxonomy, and port traits.

pub mod errors;
pub mod models;
pub mod ports;
