//! Adapter implementations of the domain ports.

pub mod agent;
pub mod fs;
pub mod sqlite;
