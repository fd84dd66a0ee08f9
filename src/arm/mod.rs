//! Azure Resource Manager plumbing
//!
//! REST client and long-running operation handling shared by the
//! resource group, network, compute, SQL and storage modules.

pub mod client;
pub mod lro;

pub use client::{error_from_response, ArmClient, PendingOperation, ResourceRef};
pub use lro::{LroOptions, OperationStatus, PollStrategy};
