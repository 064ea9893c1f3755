//! CLI command implementations.

pub mod clear;
pub mod hunt;
pub mod init;
pub mod status;
