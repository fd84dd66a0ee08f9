//! Deployment orchestration across resource areas

pub mod provisioner;

pub use provisioner::{DeploymentSummary, Provisioner, ProvisionerOperations, SqlDeployment};
