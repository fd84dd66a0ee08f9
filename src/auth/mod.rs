//! Authentication module for Azure Resource Manager
//!
//! Service principal (client secret) credentials from the environment,
//! or the identity library's default credential chain.

pub mod provider;

pub use provider::*;
