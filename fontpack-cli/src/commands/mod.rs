//! CLI command implementations.

pub mod common;
pub mod config;
pub mod download;
pub mod status;
