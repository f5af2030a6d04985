//! CLI command implementations.

pub mod check;
pub mod common;
pub mod complete;
pub mod config;
pub mod resolve;
pub mod status;
