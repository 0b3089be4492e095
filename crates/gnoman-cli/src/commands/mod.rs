//! CLI command implementations.

pub mod audit;
pub mod backup;
pub mod config;
pub mod keyring;
pub mod secrets;
pub mod sync;
