//! Configuration management module
//!
//! Loads settings from defaults, the config file and environment
//! variables, and runs the interactive first-run setup.

pub mod init;
pub mod settings;

pub use settings::*;
