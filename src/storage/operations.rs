//! Storage account operations

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::models::{ArmStorageAccount, NameAvailability};
use crate::arm::{ArmClient, ResourceRef};
use crate::error::Result;

pub const STORAGE_API_VERSION: &str = "2023-01-01";

const ACCOUNT: &str = "Storage account";

/// Trait for storage account operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageOperations: Send + Sync {
    async fn check_name_availability(&self, name: &str) -> Result<NameAvailability>;
    async fn create_account(
        &self,
        resource_group: &str,
        name: &str,
        location: &str,
        sku: &str,
        kind: &str,
    ) -> Result<ArmStorageAccount>;
    async fn get_account(&self, resource_group: &str, name: &str) -> Result<ArmStorageAccount>;
    async fn delete_account(&self, resource_group: &str, name: &str) -> Result<()>;
}

/// ARM-backed storage account operations
pub struct AzureStorageOperations {
    arm: Arc<ArmClient>,
}

impl AzureStorageOperations {
    pub fn new(arm: Arc<ArmClient>) -> Self {
        Self { arm }
    }

    fn account_path(&self, resource_group: &str, name: &str) -> String {
        self.arm.resource_group_path(
            resource_group,
            &format!("Microsoft.Storage/storageAccounts/{}", name),
        )
    }
}

#[async_trait]
impl StorageOperations for AzureStorageOperations {
    async fn check_name_availability(&self, name: &str) -> Result<NameAvailability> {
        let path = self
            .arm
            .subscription_path("/providers/Microsoft.Storage/checkNameAvailability");
        let body = json!({
            "name": name,
            "type": "Microsoft.Storage/storageAccounts"
        });

        self.arm
            .post_json(&path, STORAGE_API_VERSION, &body, ResourceRef::new(ACCOUNT, name))
            .await
    }

    async fn create_account(
        &self,
        resource_group: &str,
        name: &str,
        location: &str,
        sku: &str,
        kind: &str,
    ) -> Result<ArmStorageAccount> {
        let body = json!({
            "location": location,
            "sku": { "name": sku },
            "kind": kind,
            "properties": {}
        });

        self.arm
            .put_and_wait(
                &self.account_path(resource_group, name),
                STORAGE_API_VERSION,
                &body,
                ResourceRef::new(ACCOUNT, name),
            )
            .await
    }

    async fn get_account(&self, resource_group: &str, name: &str) -> Result<ArmStorageAccount> {
        self.arm
            .get_json(
                &self.account_path(resource_group, name),
                STORAGE_API_VERSION,
                ResourceRef::new(ACCOUNT, name),
            )
            .await
    }

    async fn delete_account(&self, resource_group: &str, name: &str) -> Result<()> {
        self.arm
            .delete_and_wait(
                &self.account_path(resource_group, name),
                STORAGE_API_VERSION,
                ResourceRef::new(ACCOUNT, name),
            )
            .await
    }
}
