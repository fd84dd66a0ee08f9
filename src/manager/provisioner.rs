//! Deployment orchestration
//!
//! `Provisioner` runs the management calls in the order a deployment
//! needs them: resource group, networking, virtual machine, SQL server
//! and database, storage account. Each step logs its start and outcome,
//! logs failures at ERROR and hands them back to the caller.

use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::arm::ArmClient;
use crate::auth::provider::AzureAuthProvider;
use crate::compute::{
    select_vm_size, AzureComputeOperations, ComputeOperations, VirtualMachine, VmCreateRequest,
    VmSize,
};
use crate::config::{Config, SecretString};
use crate::error::{AzmError, Result};
use crate::network::{
    network_interface_id, ArmNetworkInterface, ArmPublicIpAddress, ArmSubnet, ArmVirtualNetwork,
    AzureNetworkOperations, NetworkOperations,
};
use crate::resources::{AzureResourceGroupOperations, ResourceGroup, ResourceGroupOperations};
use crate::sql::{AzureSqlOperations, SqlDatabase, SqlOperations, SqlServer};
use crate::storage::{AzureStorageOperations, StorageAccount, StorageOperations};
use crate::utils::interactive::ProgressIndicator;
use crate::utils::names::{
    generate_unique_name, validate_sql_server_name, validate_storage_account_name,
};
use crate::utils::verify::{verify_exists, VerifyOptions};

/// The operation traits a provisioner drives
#[derive(Clone)]
pub struct ProvisionerOperations {
    pub resource_groups: Arc<dyn ResourceGroupOperations>,
    pub network: Arc<dyn NetworkOperations>,
    pub compute: Arc<dyn ComputeOperations>,
    pub sql: Arc<dyn SqlOperations>,
    pub storage: Arc<dyn StorageOperations>,
}

impl ProvisionerOperations {
    /// ARM-backed operations sharing one client
    pub fn from_arm(arm: Arc<ArmClient>) -> Self {
        Self {
            resource_groups: Arc::new(AzureResourceGroupOperations::new(arm.clone())),
            network: Arc::new(AzureNetworkOperations::new(arm.clone())),
            compute: Arc::new(AzureComputeOperations::new(arm.clone())),
            sql: Arc::new(AzureSqlOperations::new(arm.clone())),
            storage: Arc::new(AzureStorageOperations::new(arm)),
        }
    }
}

/// What a SQL setup produced
#[derive(Debug, Clone, Serialize)]
pub struct SqlDeployment {
    pub server: SqlServer,
    pub database: SqlDatabase,
}

/// What a full deployment produced
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentSummary {
    pub resource_group: String,
    pub location: String,
    pub vm_name: String,
    pub vm_size: String,
    pub sql_server: String,
    pub sql_database: String,
    pub storage_account: String,
}

impl DeploymentSummary {
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("Resource group", self.resource_group.as_str()),
            ("Location", self.location.as_str()),
            ("Virtual machine", self.vm_name.as_str()),
            ("VM size", self.vm_size.as_str()),
            ("SQL server", self.sql_server.as_str()),
            ("SQL database", self.sql_database.as_str()),
            ("Storage account", self.storage_account.as_str()),
        ]
    }
}

/// Runs management calls against one subscription, resource group and location
pub struct Provisioner {
    ops: ProvisionerOperations,
    config: Config,
    verify: VerifyOptions,
    show_progress: bool,
}

impl Provisioner {
    /// Create a provisioner talking to ARM with the given credentials
    pub fn new(auth_provider: Arc<dyn AzureAuthProvider>, config: Config) -> Result<Self> {
        let arm = Arc::new(ArmClient::from_config(auth_provider, &config)?);
        Ok(Self::with_operations(config, ProvisionerOperations::from_arm(arm)))
    }

    pub fn with_operations(config: Config, ops: ProvisionerOperations) -> Self {
        let verify = VerifyOptions {
            attempts: config.operations.verify_attempts,
            interval: config.operations.verify_interval(),
        };

        Self {
            ops,
            config,
            verify,
            show_progress: false,
        }
    }

    /// Show spinners while long calls are running
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn resource_group(&self) -> &str {
        &self.config.resource_group
    }

    fn location(&self) -> &str {
        &self.config.location
    }

    async fn with_spinner<T, Fut>(&self, message: &str, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let spinner = ProgressIndicator::new(message, self.show_progress);
        let result = fut.await;
        match &result {
            Ok(_) => spinner.finish_clear(),
            Err(_) => spinner.finish_error(message),
        }
        result
    }

    // ---- resource group ----

    /// Reuse the configured resource group or create it. Returns true when created.
    pub async fn ensure_resource_group(&self, tags: HashMap<String, String>) -> Result<bool> {
        let name = self.resource_group();
        let result = async {
            info!("Checking if resource group '{}' exists...", name);
            if self.ops.resource_groups.exists(name).await? {
                info!(
                    "Resource group '{}' already exists. Using existing resource group.",
                    name
                );
                return Ok(false);
            }

            info!("Creating new resource group...");
            self.ops
                .resource_groups
                .create_or_update(name, self.location(), tags)
                .await?;
            info!("Resource group '{}' created successfully.", name);
            Ok(true)
        }
        .await;

        log_failure(result, "Error creating or using resource group")
    }

    pub async fn show_resource_group(&self) -> Result<ResourceGroup> {
        self.ops.resource_groups.get(self.resource_group()).await
    }

    /// Delete the resource group and everything in it
    pub async fn delete_resource_group(&self) -> Result<()> {
        let name = self.resource_group();
        info!("Deleting resource group '{}'...", name);
        let result = self
            .with_spinner(
                &format!("Deleting resource group '{}'", name),
                self.ops.resource_groups.delete(name),
            )
            .await;
        log_failure(result, "Error deleting resource group")?;
        info!("Resource group '{}' deleted successfully.", name);
        Ok(())
    }

    // ---- network ----

    pub async fn create_virtual_network(&self) -> Result<(ArmVirtualNetwork, ArmSubnet)> {
        let settings = &self.config.network;
        info!("Creating virtual network and subnet...");

        let result = async {
            let vnet = self
                .ops
                .network
                .create_virtual_network(
                    self.resource_group(),
                    &settings.vnet_name,
                    self.location(),
                    settings.address_prefixes.clone(),
                )
                .await?;
            let subnet = self
                .ops
                .network
                .create_subnet(
                    self.resource_group(),
                    &settings.vnet_name,
                    &settings.subnet_name,
                    &settings.subnet_prefix,
                )
                .await?;
            Ok((vnet, subnet))
        }
        .await;

        let created = log_failure(result, "Error creating virtual network or subnet")?;
        info!(
            "Virtual network '{}' and subnet '{}' created successfully.",
            settings.vnet_name, settings.subnet_name
        );
        Ok(created)
    }

    pub async fn create_public_ip(&self) -> Result<ArmPublicIpAddress> {
        let name = &self.config.network.public_ip_name;
        info!("Creating public IP address...");

        let result = async {
            self.ops
                .network
                .create_public_ip(
                    self.resource_group(),
                    name,
                    self.location(),
                    &self.config.network.public_ip_allocation,
                )
                .await?;
            info!("Public IP address '{}' creation initiated.", name);

            verify_exists("Public IP address", name, &self.verify, || {
                self.ops.network.get_public_ip(self.resource_group(), name)
            })
            .await
        }
        .await;

        log_failure(result, "Error creating public IP address")
    }

    pub async fn create_network_interface(&self) -> Result<ArmNetworkInterface> {
        let settings = &self.config.network;
        info!("Creating network interface...");

        let result = async {
            let subnet = self
                .ops
                .network
                .get_subnet(
                    self.resource_group(),
                    &settings.vnet_name,
                    &settings.subnet_name,
                )
                .await?;
            let public_ip = self
                .ops
                .network
                .get_public_ip(self.resource_group(), &settings.public_ip_name)
                .await?;

            self.ops
                .network
                .create_network_interface(
                    self.resource_group(),
                    &settings.nic_name,
                    self.location(),
                    &subnet.id,
                    &public_ip.id,
                )
                .await
        }
        .await;

        let nic = log_failure(result, "Error creating network interface")?;
        info!("Network interface '{}' created successfully.", settings.nic_name);
        Ok(nic)
    }

    // ---- compute ----

    pub async fn list_vm_sizes(&self) -> Result<Vec<VmSize>> {
        self.ops.compute.list_vm_sizes(self.location()).await
    }

    /// The preferred size when the location offers it, else the first offered
    pub async fn get_available_vm_size(&self, preferred: &str) -> Result<Option<String>> {
        let location = self.location();
        info!(
            "Checking availability of VM size '{}' in location '{}'...",
            preferred, location
        );

        let sizes = self.list_vm_sizes().await?;
        let selected = select_vm_size(&sizes, preferred);
        match selected.as_deref() {
            Some(size) if size == preferred => {
                info!("Preferred VM size '{}' is available.", preferred)
            }
            _ => warn!(
                "Preferred VM size '{}' is not available. Selecting an alternative size.",
                preferred
            ),
        }
        Ok(selected)
    }

    /// Provision the group and networking, then the VM itself
    pub async fn create_virtual_machine(&self) -> Result<VirtualMachine> {
        let vm = &self.config.vm;
        let admin_password = require_secret(
            &vm.admin_password,
            "VM admin password",
            "AZURE_VM_ADMIN_PASSWORD",
        )?;

        let result = async {
            self.ensure_resource_group(HashMap::new()).await?;
            self.create_virtual_network().await?;
            self.create_public_ip().await?;
            self.create_network_interface().await?;

            info!("Deploying virtual machine...");

            let vm_size = self
                .get_available_vm_size(&vm.preferred_size)
                .await?
                .ok_or_else(|| AzmError::NoVmSizeAvailable {
                    location: self.location().to_string(),
                })?;

            let request = VmCreateRequest {
                location: self.location().to_string(),
                vm_size: vm_size.clone(),
                image: vm.image.clone(),
                os_disk_name: format!("{}_osdisk", vm.name),
                computer_name: vm.name.clone(),
                admin_username: vm.admin_username.clone(),
                admin_password,
                nic_id: network_interface_id(
                    &self.config.subscription_id,
                    self.resource_group(),
                    &self.config.network.nic_name,
                ),
            };

            let created = self
                .with_spinner(
                    &format!("Creating VM '{}'", vm.name),
                    self.ops
                        .compute
                        .create_vm(self.resource_group(), &vm.name, request),
                )
                .await;
            match created {
                Ok(_) => info!(
                    "VM '{}' deployed successfully with size '{}'.",
                    vm.name, vm_size
                ),
                Err(e) if e.is_conflict() => {
                    error!("Resource exists error while creating VM: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    error!("Failed to deploy VM: {}", e);
                    return Err(e);
                }
            }

            let verified = verify_exists("VM", &vm.name, &self.verify, || {
                self.ops.compute.get_vm(self.resource_group(), &vm.name)
            })
            .await?;
            Ok(VirtualMachine::from(verified))
        }
        .await;

        log_failure(result, "Error deploying VM")
    }

    /// VM details including its power state
    pub async fn show_vm(&self, name: &str) -> Result<VirtualMachine> {
        let vm = self.ops.compute.get_vm(self.resource_group(), name).await?;
        let view = self
            .ops
            .compute
            .get_instance_view(self.resource_group(), name)
            .await?;

        let mut summary = VirtualMachine::from(vm);
        summary.power_state = view.power_state();
        Ok(summary)
    }

    pub async fn list_vms(&self) -> Result<Vec<VirtualMachine>> {
        let vms = self.ops.compute.list_vms(self.resource_group()).await?;
        Ok(vms.into_iter().map(VirtualMachine::from).collect())
    }

    /// Start a VM. Returns false when the VM does not exist.
    pub async fn start_vm(&self, name: &str) -> Result<bool> {
        self.vm_action(name, "Starting", "started", || {
            self.ops.compute.start_vm(self.resource_group(), name)
        })
        .await
    }

    /// Power off a VM. Returns false when the VM does not exist.
    pub async fn stop_vm(&self, name: &str) -> Result<bool> {
        self.vm_action(name, "Stopping", "stopped", || {
            self.ops.compute.power_off_vm(self.resource_group(), name)
        })
        .await
    }

    pub async fn deallocate_vm(&self, name: &str) -> Result<bool> {
        self.vm_action(name, "Deallocating", "deallocated", || {
            self.ops.compute.deallocate_vm(self.resource_group(), name)
        })
        .await
    }

    pub async fn restart_vm(&self, name: &str) -> Result<bool> {
        self.vm_action(name, "Restarting", "restarted", || {
            self.ops.compute.restart_vm(self.resource_group(), name)
        })
        .await
    }

    /// Delete a VM. Returns false when the VM does not exist.
    pub async fn delete_vm(&self, name: &str) -> Result<bool> {
        self.vm_action(name, "Deleting", "deleted", || {
            self.ops.compute.delete_vm(self.resource_group(), name)
        })
        .await
    }

    async fn vm_action<F, Fut>(&self, name: &str, verb: &str, done: &str, action: F) -> Result<bool>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        info!("{} VM '{}'...", verb, name);
        let result = self
            .with_spinner(&format!("{} VM '{}'", verb, name), action())
            .await;

        match result {
            Ok(()) => {
                info!("VM '{}' {} successfully.", name, done);
                Ok(true)
            }
            Err(e) if e.is_not_found() => {
                error!("VM not found: {}", e);
                Ok(false)
            }
            Err(e) => {
                error!("Error {} VM: {}", verb.to_lowercase(), e);
                Err(e)
            }
        }
    }

    // ---- sql ----

    /// Create a uniquely named SQL server and its database
    pub async fn setup_sql_database(&self) -> Result<SqlDeployment> {
        let settings = &self.config.sql;
        let admin_password = require_secret(
            &settings.admin_password,
            "SQL admin password",
            "AZURE_SQL_ADMIN_PASSWORD",
        )?;

        let result = async {
            info!("Setting up SQL database...");

            let server_name = generate_unique_name(&settings.server_prefix);
            validate_sql_server_name(&server_name)?;
            info!("Generated unique SQL Server name: {}", server_name);

            self.with_spinner(
                &format!("Creating SQL Server '{}'", server_name),
                self.ops.sql.create_server(
                    self.resource_group(),
                    &server_name,
                    self.location(),
                    &settings.admin_login,
                    admin_password,
                ),
            )
            .await?;
            info!("SQL Server '{}' created successfully.", server_name);

            let server = verify_exists("SQL Server", &server_name, &self.verify, || {
                self.ops.sql.get_server(self.resource_group(), &server_name)
            })
            .await?;

            let database = self
                .with_spinner(
                    &format!("Creating SQL Database '{}'", settings.database_name),
                    self.ops.sql.create_database(
                        self.resource_group(),
                        &server_name,
                        &settings.database_name,
                        self.location(),
                    ),
                )
                .await?;
            info!("SQL Database '{}' setup successfully.", settings.database_name);

            Ok(SqlDeployment {
                server: server.into(),
                database: database.into(),
            })
        }
        .await;

        log_failure(result, "Failed to set up SQL database")
    }

    pub async fn show_sql_server(&self, server_name: &str) -> Result<SqlServer> {
        let server = self
            .ops
            .sql
            .get_server(self.resource_group(), server_name)
            .await?;
        Ok(server.into())
    }

    pub async fn show_sql_database(&self, server_name: &str, name: &str) -> Result<SqlDatabase> {
        let db = self
            .ops
            .sql
            .get_database(self.resource_group(), server_name, name)
            .await?;
        Ok(db.into())
    }

    pub async fn delete_sql_server(&self, server_name: &str) -> Result<()> {
        info!("Deleting SQL Server '{}'...", server_name);
        let result = self
            .with_spinner(
                &format!("Deleting SQL Server '{}'", server_name),
                self.ops.sql.delete_server(self.resource_group(), server_name),
            )
            .await;
        log_failure(result, "Error deleting SQL Server")?;
        info!("SQL Server '{}' deleted successfully.", server_name);
        Ok(())
    }

    // ---- storage ----

    /// Pick an available account name, trying fresh names when one is taken
    async fn available_storage_name(&self) -> Result<String> {
        let settings = &self.config.storage;

        for _ in 0..settings.name_attempts.max(1) {
            let candidate = generate_unique_name(&settings.account_prefix);
            validate_storage_account_name(&candidate)?;
            info!("Generated unique storage account name: {}", candidate);

            let availability = self.ops.storage.check_name_availability(&candidate).await?;
            if availability.name_available {
                return Ok(candidate);
            }

            warn!(
                "Storage account name '{}' is not available ({}). Generating another name.",
                candidate,
                availability
                    .message
                    .or(availability.reason)
                    .unwrap_or_else(|| "no reason given".to_string())
            );
        }

        Err(AzmError::exists(
            "Storage account",
            settings.account_prefix.as_str(),
            format!(
                "no available name found after {} attempts",
                settings.name_attempts.max(1)
            ),
        ))
    }

    pub async fn configure_storage_account(&self) -> Result<StorageAccount> {
        let settings = &self.config.storage;
        info!("Configuring storage account...");

        let result: Result<StorageAccount> = async {
            let name = self.available_storage_name().await?;
            let account = self
                .with_spinner(
                    &format!("Creating storage account '{}'", name),
                    self.ops.storage.create_account(
                        self.resource_group(),
                        &name,
                        self.location(),
                        &settings.sku,
                        &settings.kind,
                    ),
                )
                .await?;
            info!("Storage account '{}' configured successfully.", name);
            Ok(StorageAccount::from(account))
        }
        .await;

        match result {
            Err(e) if e.is_conflict() => {
                error!("Storage account name already taken: {}", e);
                Err(e)
            }
            other => log_failure(other, "Error configuring storage account"),
        }
    }

    pub async fn show_storage_account(&self, name: &str) -> Result<StorageAccount> {
        let account = self
            .ops
            .storage
            .get_account(self.resource_group(), name)
            .await?;
        Ok(account.into())
    }

    pub async fn delete_storage_account(&self, name: &str) -> Result<()> {
        info!("Deleting storage account '{}'...", name);
        let result = self
            .ops
            .storage
            .delete_account(self.resource_group(), name)
            .await;
        log_failure(result, "Error deleting storage account")?;
        info!("Storage account '{}' deleted successfully.", name);
        Ok(())
    }

    // ---- full deployment ----

    /// Resource group, VM with its network, SQL server and database, storage account
    pub async fn deploy_all(&self) -> Result<DeploymentSummary> {
        self.ensure_resource_group(HashMap::new()).await?;
        let vm = self.create_virtual_machine().await?;
        let sql = self.setup_sql_database().await?;
        let storage = self.configure_storage_account().await?;

        Ok(DeploymentSummary {
            resource_group: self.resource_group().to_string(),
            location: self.location().to_string(),
            vm_name: vm.name,
            vm_size: vm.vm_size.unwrap_or_default(),
            sql_server: sql.server.name,
            sql_database: sql.database.name,
            storage_account: storage.name,
        })
    }
}

fn log_failure<T>(result: Result<T>, context: &str) -> Result<T> {
    result.map_err(|e| {
        error!("{}: {}", context, e);
        e
    })
}

fn require_secret(secret: &SecretString, what: &str, env_var: &str) -> Result<SecretString> {
    if secret.is_empty() {
        return Err(AzmError::invalid_argument(format!(
            "{} is not set. Set {} or run interactively to be prompted.",
            what, env_var
        )));
    }
    Ok(secret.clone())
}
