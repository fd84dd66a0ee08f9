//! Network data models
//!
//! Wire types mirror the ARM JSON for virtual networks, subnets, public
//! IP addresses and network interfaces; summaries are what gets printed.

use serde::{Deserialize, Serialize};
use tabled::Tabled;

fn display_option(opt: &Option<String>) -> String {
    opt.clone().unwrap_or_else(|| "-".to_string())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    #[serde(default)]
    pub address_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub address_space: AddressSpace,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArmVirtualNetwork {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub properties: VirtualNetworkProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub address_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArmSubnet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub properties: SubnetProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
    #[serde(default, rename = "publicIPAllocationMethod")]
    pub allocation_method: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArmPublicIpAddress {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub properties: PublicIpProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpConfigurationProperties {
    #[serde(default, rename = "privateIPAddress")]
    pub private_ip_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArmIpConfiguration {
    pub name: String,
    #[serde(default)]
    pub properties: IpConfigurationProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub ip_configurations: Vec<ArmIpConfiguration>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArmNetworkInterface {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub properties: NetworkInterfaceProperties,
}

/// ARM id of a network interface, as referenced from a VM network profile
pub fn network_interface_id(subscription_id: &str, resource_group: &str, nic_name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/networkInterfaces/{}",
        subscription_id, resource_group, nic_name
    )
}

/// Summary row for any network resource
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct NetworkResource {
    #[tabled(rename = "Type")]
    pub kind: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "State", display_with = "display_option")]
    pub provisioning_state: Option<String>,
    #[tabled(rename = "Address", display_with = "display_option")]
    pub address: Option<String>,
    #[tabled(skip)]
    pub id: String,
}

impl From<ArmVirtualNetwork> for NetworkResource {
    fn from(vnet: ArmVirtualNetwork) -> Self {
        let prefixes = vnet.properties.address_space.address_prefixes.join(",");
        Self {
            kind: "Virtual network".to_string(),
            name: vnet.name,
            provisioning_state: vnet.properties.provisioning_state,
            address: (!prefixes.is_empty()).then_some(prefixes),
            id: vnet.id,
        }
    }
}

impl From<ArmSubnet> for NetworkResource {
    fn from(subnet: ArmSubnet) -> Self {
        Self {
            kind: "Subnet".to_string(),
            name: subnet.name,
            provisioning_state: subnet.properties.provisioning_state,
            address: subnet.properties.address_prefix,
            id: subnet.id,
        }
    }
}

impl From<ArmPublicIpAddress> for NetworkResource {
    fn from(ip: ArmPublicIpAddress) -> Self {
        Self {
            kind: "Public IP address".to_string(),
            name: ip.name,
            provisioning_state: ip.properties.provisioning_state,
            address: ip.properties.ip_address,
            id: ip.id,
        }
    }
}

impl From<ArmNetworkInterface> for NetworkResource {
    fn from(nic: ArmNetworkInterface) -> Self {
        let private_ip = nic
            .properties
            .ip_configurations
            .iter()
            .find_map(|c| c.properties.private_ip_address.clone());
        Self {
            kind: "Network interface".to_string(),
            name: nic.name,
            provisioning_state: nic.properties.provisioning_state,
            address: private_ip,
            id: nic.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_network_interface_id() {
        assert_eq!(
            network_interface_id("sub-1", "MyResourceGroup", "MyVMNIC"),
            "/subscriptions/sub-1/resourceGroups/MyResourceGroup/providers/Microsoft.Network/networkInterfaces/MyVMNIC"
        );
    }

    #[test]
    fn test_public_ip_field_names() {
        let body = json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/publicIPAddresses/MyPublicIP",
            "name": "MyPublicIP",
            "location": "centralus",
            "properties": {
                "provisioningState": "Succeeded",
                "publicIPAllocationMethod": "Dynamic"
            }
        });
        let ip: ArmPublicIpAddress = serde_json::from_value(body).unwrap();
        assert_eq!(ip.properties.allocation_method.as_deref(), Some("Dynamic"));
        assert!(ip.properties.ip_address.is_none());
    }

    #[test]
    fn test_nic_summary_uses_private_ip() {
        let body = json!({
            "id": "nic-id",
            "name": "MyVMNIC",
            "location": "centralus",
            "properties": {
                "provisioningState": "Succeeded",
                "ipConfigurations": [
                    {"name": "MyVMNIC", "properties": {"privateIPAddress": "10.0.0.4"}}
                ]
            }
        });
        let nic: NetworkResource = serde_json::from_value::<ArmNetworkInterface>(body)
            .unwrap()
            .into();
        assert_eq!(nic.address.as_deref(), Some("10.0.0.4"));
        assert_eq!(nic.kind, "Network interface");
    }
}
