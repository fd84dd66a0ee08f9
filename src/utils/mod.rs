//! Utility functions module
//!
//! This module contains output formatting, interactive prompts, resource
//! naming, retry and verification polling, and network error helpers.

pub mod format;
pub mod interactive;
pub mod names;
pub mod network;
pub mod retry;
pub mod verify;

pub use format::*;
pub use names::*;
pub use network::*;
pub use retry::*;
pub use verify::*;
