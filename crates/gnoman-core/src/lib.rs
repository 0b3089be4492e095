//! # gnoman-core
//!
//! Core configuration and utilities for GNOMAN.
//!
//! This crate provides shared functionality used across all GNOMAN crates:
//!
//! - **Configuration**: Loading, validation, and environment overrides for `gnoman.json5`
//! - **Paths**: Resolution of the state directory and the files kept inside it
//! - **Utilities**: Environment variable helpers and zero-on-drop secret strings

pub mod config;
pub mod env;
pub mod error;
pub mod paths;
pub mod secret;

// Re-exports for convenience
pub use config::Config;
pub use error::ConfigError;
pub use secret::SecretString;
