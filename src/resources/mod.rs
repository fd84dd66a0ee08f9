//! Resource group management module

pub mod models;
pub mod operations;

pub use models::*;
pub use operations::*;
