//! azmanage - Azure resource automation
//!
//! Provisions and manages Azure virtual machines, SQL databases, storage
//! accounts and networking through Azure Resource Manager, authenticating
//! with a service principal from the environment.

pub mod arm;
pub mod auth;
pub mod cli;
pub mod compute;
pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod network;
pub mod resources;
pub mod sql;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use error::{AzmError, Result};
