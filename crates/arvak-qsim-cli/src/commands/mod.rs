//! CLI command implementations.

pub mod common;
pub mod config;
pub mod gates;
pub mod run;
pub mod version;
