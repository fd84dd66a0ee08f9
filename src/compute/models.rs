//! Virtual machine data models

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use tabled::Tabled;

use crate::config::{ImageSettings, SecretString};

fn display_option(opt: &Option<String>) -> String {
    opt.clone().unwrap_or_else(|| "-".to_string())
}

/// VM size offered in a location
#[derive(Debug, Clone, Serialize, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct VmSize {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Cores")]
    #[serde(default)]
    pub number_of_cores: u32,
    #[tabled(rename = "Memory (MB)")]
    #[serde(default, rename = "memoryInMB")]
    pub memory_in_mb: u64,
    #[tabled(rename = "Max Data Disks")]
    #[serde(default)]
    pub max_data_disk_count: u32,
}

/// Pick the preferred size when offered, else the first offered size
pub fn select_vm_size(available: &[VmSize], preferred: &str) -> Option<String> {
    if available.iter().any(|s| s.name == preferred) {
        return Some(preferred.to_string());
    }
    available.first().map(|s| s.name.clone())
}

/// Parameters for creating a virtual machine
#[derive(Clone)]
pub struct VmCreateRequest {
    pub location: String,
    pub vm_size: String,
    pub image: ImageSettings,
    pub os_disk_name: String,
    pub computer_name: String,
    pub admin_username: String,
    pub admin_password: SecretString,
    pub nic_id: String,
}

impl VmCreateRequest {
    /// ARM request body
    pub fn to_body(&self) -> Value {
        json!({
            "location": self.location,
            "properties": {
                "hardwareProfile": { "vmSize": self.vm_size },
                "storageProfile": {
                    "imageReference": {
                        "publisher": self.image.publisher,
                        "offer": self.image.offer,
                        "sku": self.image.sku,
                        "version": self.image.version
                    },
                    "osDisk": {
                        "name": self.os_disk_name,
                        "createOption": "FromImage"
                    }
                },
                "osProfile": {
                    "computerName": self.computer_name,
                    "adminUsername": self.admin_username,
                    "adminPassword": self.admin_password.as_str()
                },
                "networkProfile": {
                    "networkInterfaces": [{
                        "id": self.nic_id,
                        "properties": { "primary": true }
                    }]
                }
            }
        })
    }
}

impl fmt::Debug for VmCreateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VmCreateRequest")
            .field("location", &self.location)
            .field("vm_size", &self.vm_size)
            .field("image", &self.image)
            .field("os_disk_name", &self.os_disk_name)
            .field("computer_name", &self.computer_name)
            .field("admin_username", &self.admin_username)
            .field("nic_id", &self.nic_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareProfile {
    #[serde(default)]
    pub vm_size: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub hardware_profile: HardwareProfile,
    #[serde(default)]
    pub vm_id: Option<String>,
}

/// ARM representation of a virtual machine
#[derive(Debug, Clone, Deserialize)]
pub struct ArmVirtualMachine {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub properties: VirtualMachineProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceViewStatus {
    pub code: String,
    #[serde(default)]
    pub display_status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceView {
    #[serde(default)]
    pub statuses: Vec<InstanceViewStatus>,
}

impl InstanceView {
    /// `PowerState/running` becomes `running`
    pub fn power_state(&self) -> Option<String> {
        self.statuses
            .iter()
            .find_map(|s| s.code.strip_prefix("PowerState/"))
            .map(|s| s.to_string())
    }
}

/// Virtual machine as shown to the user
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct VirtualMachine {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Location")]
    pub location: String,
    #[tabled(rename = "Size", display_with = "display_option")]
    pub vm_size: Option<String>,
    #[tabled(rename = "State", display_with = "display_option")]
    pub provisioning_state: Option<String>,
    #[tabled(rename = "Power", display_with = "display_option")]
    pub power_state: Option<String>,
    #[tabled(skip)]
    pub id: String,
}

impl From<ArmVirtualMachine> for VirtualMachine {
    fn from(vm: ArmVirtualMachine) -> Self {
        Self {
            name: vm.name,
            location: vm.location,
            vm_size: vm.properties.hardware_profile.vm_size,
            provisioning_state: vm.properties.provisioning_state,
            power_state: None,
            id: vm.id,
        }
    }
}
