//! Storage account data models

use serde::{Deserialize, Serialize};
use tabled::Tabled;

fn display_option(opt: &Option<String>) -> String {
    opt.clone().unwrap_or_else(|| "-".to_string())
}

/// Answer of `checkNameAvailability`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameAvailability {
    pub name_available: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageSku {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrimaryEndpoints {
    #[serde(default)]
    pub blob: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub primary_endpoints: PrimaryEndpoints,
}

/// ARM representation of a storage account
#[derive(Debug, Clone, Deserialize)]
pub struct ArmStorageAccount {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub sku: StorageSku,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub properties: StorageAccountProperties,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct StorageAccount {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Location")]
    pub location: String,
    #[tabled(rename = "SKU")]
    pub sku: String,
    #[tabled(rename = "Kind", display_with = "display_option")]
    pub kind: Option<String>,
    #[tabled(rename = "State", display_with = "display_option")]
    pub provisioning_state: Option<String>,
    #[tabled(rename = "Blob Endpoint", display_with = "display_option")]
    pub primary_blob_endpoint: Option<String>,
    #[tabled(skip)]
    pub id: String,
}

impl From<ArmStorageAccount> for StorageAccount {
    fn from(account: ArmStorageAccount) -> Self {
        Self {
            name: account.name,
            location: account.location,
            sku: account.sku.name,
            kind: account.kind,
            provisioning_state: account.properties.provisioning_state,
            primary_blob_endpoint: account.properties.primary_endpoints.blob,
            id: account.id,
        }
    }
}
