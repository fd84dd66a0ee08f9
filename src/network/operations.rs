//! Virtual network, subnet, public IP and network interface operations

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::models::{ArmNetworkInterface, ArmPublicIpAddress, ArmSubnet, ArmVirtualNetwork};
use crate::arm::{ArmClient, ResourceRef};
use crate::error::Result;

pub const NETWORK_API_VERSION: &str = "2023-09-01";

/// Trait for network operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NetworkOperations: Send + Sync {
    async fn create_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
        location: &str,
        address_prefixes: Vec<String>,
    ) -> Result<ArmVirtualNetwork>;

    async fn create_subnet(
        &self,
        resource_group: &str,
        vnet_name: &str,
        name: &str,
        address_prefix: &str,
    ) -> Result<ArmSubnet>;

    async fn get_subnet(&self, resource_group: &str, vnet_name: &str, name: &str)
        -> Result<ArmSubnet>;

    async fn create_public_ip(
        &self,
        resource_group: &str,
        name: &str,
        location: &str,
        allocation_method: &str,
    ) -> Result<ArmPublicIpAddress>;

    async fn get_public_ip(&self, resource_group: &str, name: &str) -> Result<ArmPublicIpAddress>;

    async fn create_network_interface(
        &self,
        resource_group: &str,
        name: &str,
        location: &str,
        subnet_id: &str,
        public_ip_id: &str,
    ) -> Result<ArmNetworkInterface>;

    async fn get_network_interface(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<ArmNetworkInterface>;
}

/// ARM-backed network operations
pub struct AzureNetworkOperations {
    arm: Arc<ArmClient>,
}

impl AzureNetworkOperations {
    pub fn new(arm: Arc<ArmClient>) -> Self {
        Self { arm }
    }

    fn vnet_path(&self, resource_group: &str, name: &str) -> String {
        self.arm.resource_group_path(
            resource_group,
            &format!("Microsoft.Network/virtualNetworks/{}", name),
        )
    }

    fn subnet_path(&self, resource_group: &str, vnet_name: &str, name: &str) -> String {
        format!("{}/subnets/{}", self.vnet_path(resource_group, vnet_name), name)
    }

    fn public_ip_path(&self, resource_group: &str, name: &str) -> String {
        self.arm.resource_group_path(
            resource_group,
            &format!("Microsoft.Network/publicIPAddresses/{}", name),
        )
    }

    fn nic_path(&self, resource_group: &str, name: &str) -> String {
        self.arm.resource_group_path(
            resource_group,
            &format!("Microsoft.Network/networkInterfaces/{}", name),
        )
    }
}

#[async_trait]
impl NetworkOperations for AzureNetworkOperations {
    async fn create_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
        location: &str,
        address_prefixes: Vec<String>,
    ) -> Result<ArmVirtualNetwork> {
        let body = json!({
            "location": location,
            "properties": {
                "addressSpace": { "addressPrefixes": address_prefixes }
            }
        });

        self.arm
            .put_and_wait(
                &self.vnet_path(resource_group, name),
                NETWORK_API_VERSION,
                &body,
                ResourceRef::new("Virtual network", name),
            )
            .await
    }

    async fn create_subnet(
        &self,
        resource_group: &str,
        vnet_name: &str,
        name: &str,
        address_prefix: &str,
    ) -> Result<ArmSubnet> {
        let body = json!({
            "properties": { "addressPrefix": address_prefix }
        });

        self.arm
            .put_and_wait(
                &self.subnet_path(resource_group, vnet_name, name),
                NETWORK_API_VERSION,
                &body,
                ResourceRef::new("Subnet", name),
            )
            .await
    }

    async fn get_subnet(
        &self,
        resource_group: &str,
        vnet_name: &str,
        name: &str,
    ) -> Result<ArmSubnet> {
        self.arm
            .get_json(
                &self.subnet_path(resource_group, vnet_name, name),
                NETWORK_API_VERSION,
                ResourceRef::new("Subnet", name),
            )
            .await
    }

    async fn create_public_ip(
        &self,
        resource_group: &str,
        name: &str,
        location: &str,
        allocation_method: &str,
    ) -> Result<ArmPublicIpAddress> {
        let body = json!({
            "location": location,
            "properties": { "publicIPAllocationMethod": allocation_method }
        });

        self.arm
            .put_and_wait(
                &self.public_ip_path(resource_group, name),
                NETWORK_API_VERSION,
                &body,
                ResourceRef::new("Public IP address", name),
            )
            .await
    }

    async fn get_public_ip(&self, resource_group: &str, name: &str) -> Result<ArmPublicIpAddress> {
        self.arm
            .get_json(
                &self.public_ip_path(resource_group, name),
                NETWORK_API_VERSION,
                ResourceRef::new("Public IP address", name),
            )
            .await
    }

    async fn create_network_interface(
        &self,
        resource_group: &str,
        name: &str,
        location: &str,
        subnet_id: &str,
        public_ip_id: &str,
    ) -> Result<ArmNetworkInterface> {
        let body = json!({
            "location": location,
            "properties": {
                "ipConfigurations": [{
                    "name": name,
                    "properties": {
                        "primary": true,
                        "subnet": { "id": subnet_id },
                        "publicIPAddress": { "id": public_ip_id }
                    }
                }]
            }
        });

        self.arm
            .put_and_wait(
                &self.nic_path(resource_group, name),
                NETWORK_API_VERSION,
                &body,
                ResourceRef::new("Network interface", name),
            )
            .await
    }

    async fn get_network_interface(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<ArmNetworkInterface> {
        self.arm
            .get_json(
                &self.nic_path(resource_group, name),
                NETWORK_API_VERSION,
                ResourceRef::new("Network interface", name),
            )
            .await
    }
}
