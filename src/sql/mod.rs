//! Azure SQL server and database management

pub mod models;
pub mod operations;

pub use models::*;
pub use operations::*;
