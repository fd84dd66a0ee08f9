//! Virtual machine operations

use async_trait::async_trait;
use std::sync::Arc;

use super::models::{ArmVirtualMachine, InstanceView, VmCreateRequest, VmSize};
use crate::arm::{ArmClient, ResourceRef};
use crate::error::Result;

pub const COMPUTE_API_VERSION: &str = "2023-09-01";

const VM: &str = "Virtual machine";

/// Trait for virtual machine operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ComputeOperations: Send + Sync {
    async fn list_vm_sizes(&self, location: &str) -> Result<Vec<VmSize>>;
    async fn create_vm(
        &self,
        resource_group: &str,
        name: &str,
        request: VmCreateRequest,
    ) -> Result<ArmVirtualMachine>;
    async fn get_vm(&self, resource_group: &str, name: &str) -> Result<ArmVirtualMachine>;
    async fn get_instance_view(&self, resource_group: &str, name: &str) -> Result<InstanceView>;
    async fn list_vms(&self, resource_group: &str) -> Result<Vec<ArmVirtualMachine>>;
    async fn start_vm(&self, resource_group: &str, name: &str) -> Result<()>;
    async fn power_off_vm(&self, resource_group: &str, name: &str) -> Result<()>;
    async fn deallocate_vm(&self, resource_group: &str, name: &str) -> Result<()>;
    async fn restart_vm(&self, resource_group: &str, name: &str) -> Result<()>;
    async fn delete_vm(&self, resource_group: &str, name: &str) -> Result<()>;
}

/// ARM-backed virtual machine operations
pub struct AzureComputeOperations {
    arm: Arc<ArmClient>,
}

impl AzureComputeOperations {
    pub fn new(arm: Arc<ArmClient>) -> Self {
        Self { arm }
    }

    fn vm_path(&self, resource_group: &str, name: &str) -> String {
        self.arm.resource_group_path(
            resource_group,
            &format!("Microsoft.Compute/virtualMachines/{}", name),
        )
    }

    async fn action(&self, resource_group: &str, name: &str, action: &str) -> Result<()> {
        let path = format!("{}/{}", self.vm_path(resource_group, name), action);
        self.arm
            .post_and_wait(&path, COMPUTE_API_VERSION, ResourceRef::new(VM, name))
            .await
    }
}

#[async_trait]
impl ComputeOperations for AzureComputeOperations {
    async fn list_vm_sizes(&self, location: &str) -> Result<Vec<VmSize>> {
        let path = self.arm.subscription_path(&format!(
            "/providers/Microsoft.Compute/locations/{}/vmSizes",
            location
        ));
        self.arm
            .list_json(&path, COMPUTE_API_VERSION, ResourceRef::new("VM sizes", location))
            .await
    }

    async fn create_vm(
        &self,
        resource_group: &str,
        name: &str,
        request: VmCreateRequest,
    ) -> Result<ArmVirtualMachine> {
        self.arm
            .put_and_wait(
                &self.vm_path(resource_group, name),
                COMPUTE_API_VERSION,
                &request.to_body(),
                ResourceRef::new(VM, name),
            )
            .await
    }

    async fn get_vm(&self, resource_group: &str, name: &str) -> Result<ArmVirtualMachine> {
        self.arm
            .get_json(
                &self.vm_path(resource_group, name),
                COMPUTE_API_VERSION,
                ResourceRef::new(VM, name),
            )
            .await
    }

    async fn get_instance_view(&self, resource_group: &str, name: &str) -> Result<InstanceView> {
        let path = format!("{}/instanceView", self.vm_path(resource_group, name));
        self.arm
            .get_json(&path, COMPUTE_API_VERSION, ResourceRef::new(VM, name))
            .await
    }

    async fn list_vms(&self, resource_group: &str) -> Result<Vec<ArmVirtualMachine>> {
        let path = self
            .arm
            .resource_group_path(resource_group, "Microsoft.Compute/virtualMachines");
        self.arm
            .list_json(
                &path,
                COMPUTE_API_VERSION,
                ResourceRef::new("Resource group", resource_group),
            )
            .await
    }

    async fn start_vm(&self, resource_group: &str, name: &str) -> Result<()> {
        self.action(resource_group, name, "start").await
    }

    async fn power_off_vm(&self, resource_group: &str, name: &str) -> Result<()> {
        self.action(resource_group, name, "powerOff").await
    }

    async fn deallocate_vm(&self, resource_group: &str, name: &str) -> Result<()> {
        self.action(resource_group, name, "deallocate").await
    }

    async fn restart_vm(&self, resource_group: &str, name: &str) -> Result<()> {
        self.action(resource_group, name, "restart").await
    }

    async fn delete_vm(&self, resource_group: &str, name: &str) -> Result<()> {
        self.arm
            .delete_and_wait(
                &self.vm_path(resource_group, name),
                COMPUTE_API_VERSION,
                ResourceRef::new(VM, name),
            )
            .await
    }
}
