//! Virtual network management module
//!
//! Provides the networking a VM needs: a virtual network with one subnet,
//! a public IP address and a network interface tying them together.

pub mod models;
pub mod operations;

pub use models::*;
pub use operations::*;
