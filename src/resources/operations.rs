//! Resource group operations

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

use super::models::{ArmResourceGroup, ResourceGroup};
use crate::arm::{ArmClient, ResourceRef};
use crate::error::Result;

pub const RESOURCES_API_VERSION: &str = "2021-04-01";
const KIND: &str = "Resource group";

/// Trait for resource group operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceGroupOperations: Send + Sync {
    /// Check whether the resource group exists
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Create or update a resource group
    async fn create_or_update(
        &self,
        name: &str,
        location: &str,
        tags: HashMap<String, String>,
    ) -> Result<ResourceGroup>;

    /// Get resource group details
    async fn get(&self, name: &str) -> Result<ResourceGroup>;

    /// Delete a resource group and everything in it
    async fn delete(&self, name: &str) -> Result<()>;
}

/// ARM-backed resource group operations
pub struct AzureResourceGroupOperations {
    arm: Arc<ArmClient>,
}

impl AzureResourceGroupOperations {
    pub fn new(arm: Arc<ArmClient>) -> Self {
        Self { arm }
    }

    fn path(&self, name: &str) -> String {
        self.arm.subscription_path(&format!("/resourcegroups/{}", name))
    }
}

#[async_trait]
impl ResourceGroupOperations for AzureResourceGroupOperations {
    async fn exists(&self, name: &str) -> Result<bool> {
        self.arm
            .exists(&self.path(name), RESOURCES_API_VERSION, ResourceRef::new(KIND, name))
            .await
    }

    async fn create_or_update(
        &self,
        name: &str,
        location: &str,
        tags: HashMap<String, String>,
    ) -> Result<ResourceGroup> {
        let body = json!({
            "location": location,
            "tags": tags,
        });

        let rg: ArmResourceGroup = self
            .arm
            .put_and_wait(
                &self.path(name),
                RESOURCES_API_VERSION,
                &body,
                ResourceRef::new(KIND, name),
            )
            .await?;
        Ok(rg.into())
    }

    async fn get(&self, name: &str) -> Result<ResourceGroup> {
        let rg: ArmResourceGroup = self
            .arm
            .get_json(&self.path(name), RESOURCES_API_VERSION, ResourceRef::new(KIND, name))
            .await?;
        Ok(rg.into())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.arm
            .delete_and_wait(&self.path(name), RESOURCES_API_VERSION, ResourceRef::new(KIND, name))
            .await
    }
}
