//! Shared utilities for the stock screener workspace
//!
//! This crate provides the logging setup and the runtime configuration
//! shared by the screener library and its binary.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigError, LogFormat};
pub use logging::init_tracing_with;
