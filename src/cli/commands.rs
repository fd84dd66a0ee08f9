//! CLI commands and argument parsing
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, subcommands, and their arguments.

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::io::IsTerminal;

use crate::auth::provider::AuthProviderFactory;
use crate::config::Config;
use crate::error::{AzmError, Result};
use crate::manager::Provisioner;
use crate::network::NetworkResource;
use crate::utils::format::{DisplayUtils, OutputFormat, TableFormatter};
use crate::utils::interactive::InteractivePrompt;

/// Get the full version string with build information
fn get_version() -> &'static str {
    env!("VERSION_WITH_GIT")
}

/// Get build information for display
pub fn get_build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("GIT_HASH"),
        git_branch: env!("GIT_BRANCH"),
        build_time: env!("BUILD_TIME"),
        full_version: env!("VERSION_WITH_GIT"),
    }
}

#[derive(Debug)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub git_branch: &'static str,
    pub build_time: &'static str,
    pub full_version: &'static str,
}

#[derive(Parser)]
#[command(name = "azm")]
#[command(about = "Provision and manage Azure virtual machines, SQL databases, storage and networking")]
#[command(version = get_version(), author)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Output format (defaults to json when output_json is set in config)
    #[arg(long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Resource group to operate on
    #[arg(short = 'g', long, global = true)]
    pub resource_group: Option<String>,

    /// Azure region, e.g. centralus
    #[arg(short = 'l', long, global = true)]
    pub location: Option<String>,

    /// Subscription ID (overrides AZURE_SUBSCRIPTION_ID)
    #[arg(long, global = true)]
    pub subscription: Option<String>,

    /// Answer yes to confirmation prompts
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy the resource group, a VM with its network, a SQL database and a storage account
    Deploy,
    /// Resource group management
    Group {
        #[command(subcommand)]
        command: GroupCommands,
    },
    /// Virtual network, subnet, public IP and network interface
    Network {
        #[command(subcommand)]
        command: NetworkCommands,
    },
    /// Virtual machine management
    Vm {
        #[command(subcommand)]
        command: VmCommands,
    },
    /// Azure SQL server and database management
    Sql {
        #[command(subcommand)]
        command: SqlCommands,
    },
    /// Storage account management
    Storage {
        #[command(subcommand)]
        command: StorageCommands,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Interactive first-run setup
    Init,
    /// Show version and build information
    Version,
}

#[derive(Subcommand)]
pub enum GroupCommands {
    /// Create the resource group unless it already exists
    Ensure {
        /// Tags in key=value format
        #[arg(short, long, value_parser = parse_key_val::<String, String>)]
        tag: Vec<(String, String)>,
    },
    /// Show resource group details
    Show,
    /// Delete the resource group and everything in it
    Delete {
        /// Delete without confirmation
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum NetworkCommands {
    /// Create the virtual network, subnet, public IP and network interface
    Create,
}

#[derive(Subcommand)]
pub enum VmCommands {
    /// Create a VM together with its resource group and network
    Create {
        /// VM name
        #[arg(short, long)]
        name: Option<String>,
        /// Preferred VM size; falls back to the first size offered in the location
        #[arg(short, long)]
        size: Option<String>,
    },
    /// Start a VM
    Start {
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Power off a VM (compute stays allocated)
    Stop {
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Stop a VM and release its compute
    Deallocate {
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Restart a VM
    Restart {
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Delete a VM
    #[command(alias = "rm")]
    Delete {
        #[arg(short, long)]
        name: Option<String>,
        /// Delete without confirmation
        #[arg(short, long)]
        force: bool,
    },
    /// Show VM details and power state
    Show {
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List VMs in the resource group
    #[command(alias = "ls")]
    List,
    /// List VM sizes offered in the location
    Sizes,
}

#[derive(Subcommand)]
pub enum SqlCommands {
    /// Create a uniquely named SQL server and its database
    Create {
        /// Database name
        #[arg(short, long)]
        database: Option<String>,
    },
    /// Show a SQL server, or one of its databases
    Show {
        /// Server name
        server: String,
        /// Database name
        #[arg(short, long)]
        database: Option<String>,
    },
    /// Delete a SQL server and its databases
    Delete {
        /// Server name
        server: String,
        /// Delete without confirmation
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum StorageCommands {
    /// Create a uniquely named storage account
    Create,
    /// Show storage account details
    Show {
        /// Storage account name
        name: String,
    },
    /// Delete a storage account
    Delete {
        /// Storage account name
        name: String,
        /// Delete without confirmation
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Set a configuration value
    Set {
        /// Configuration key, e.g. location or vm.preferred_size
        key: String,
        /// Configuration value
        value: String,
    },
    /// Interactive setup (same as 'azm init')
    Init,
}

/// Everything a command handler needs besides its own arguments
struct CommandContext {
    config: Config,
    format: OutputFormat,
    yes: bool,
    display: DisplayUtils,
}

impl CommandContext {
    fn formatter(&self) -> TableFormatter {
        TableFormatter::new(self.format, self.config.no_color)
    }

    fn show_progress(&self) -> bool {
        self.format == OutputFormat::Table && std::io::stderr().is_terminal()
    }

    fn provisioner(&self) -> Result<Provisioner> {
        self.config.validate()?;
        let auth_provider = AuthProviderFactory::from_config(&self.config)?;
        Ok(Provisioner::new(auth_provider, self.config.clone())?.with_progress(self.show_progress()))
    }

    fn vm_name(&self, name: Option<String>) -> String {
        name.unwrap_or_else(|| self.config.vm.name.clone())
    }

    /// Ask before deleting. Returns false when the user declines.
    fn confirm_destructive(&self, message: &str, force: bool) -> Result<bool> {
        if force || self.yes {
            return Ok(true);
        }
        if !InteractivePrompt::is_interactive() {
            return Err(AzmError::invalid_argument(
                "Refusing to delete without confirmation. Pass --yes or --force.",
            ));
        }

        let confirmed = InteractivePrompt::new().confirm(message, false)?;
        if !confirmed {
            self.display.print_info("Deletion cancelled.")?;
        }
        Ok(confirmed)
    }

    /// Fill in missing admin passwords from a hidden prompt when possible
    fn prompt_for_passwords(&mut self, vm: bool, sql: bool) -> Result<()> {
        if !InteractivePrompt::is_interactive() {
            return Ok(());
        }

        let prompt = InteractivePrompt::new();
        if vm && self.config.vm.admin_password.is_empty() {
            self.config.vm.admin_password = prompt.password(&format!(
                "Admin password for VM user '{}'",
                self.config.vm.admin_username
            ))?;
        }
        if sql && self.config.sql.admin_password.is_empty() {
            self.config.sql.admin_password = prompt.password(&format!(
                "Admin password for SQL login '{}'",
                self.config.sql.admin_login
            ))?;
        }
        Ok(())
    }
}

impl Cli {
    /// Layer command-line flags over the loaded configuration
    pub fn apply_overrides(&self, mut config: Config) -> Config {
        if self.debug {
            config.debug = true;
        }
        if self.no_color {
            config.no_color = true;
        }
        if let Some(resource_group) = &self.resource_group {
            config.resource_group = resource_group.clone();
        }
        if let Some(location) = &self.location {
            config.location = location.clone();
        }
        if let Some(subscription) = &self.subscription {
            config.subscription_id = subscription.clone();
        }
        config
    }

    pub async fn execute(self, config: Config) -> Result<()> {
        let format = self.format.unwrap_or(if config.output_json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        });
        let display = DisplayUtils::new(config.no_color);
        let ctx = CommandContext {
            config,
            format,
            yes: self.yes,
            display,
        };

        match self.command {
            Commands::Deploy => execute_deploy(ctx).await,
            Commands::Group { command } => execute_group_command(command, ctx).await,
            Commands::Network { command } => execute_network_command(command, ctx).await,
            Commands::Vm { command } => execute_vm_command(command, ctx).await,
            Commands::Sql { command } => execute_sql_command(command, ctx).await,
            Commands::Storage { command } => execute_storage_command(command, ctx).await,
            Commands::Config { command } => execute_config_command(command, ctx).await,
            Commands::Init => execute_init_command(ctx).await,
            Commands::Version => execute_version_command(),
        }
    }
}

async fn execute_deploy(mut ctx: CommandContext) -> Result<()> {
    ctx.prompt_for_passwords(true, true)?;
    let provisioner = ctx.provisioner()?;

    let summary = provisioner.deploy_all().await?;

    if ctx.format == OutputFormat::Table {
        ctx.display.print_success("Deployment completed")?;
    }
    println!("{}", ctx.formatter().format_summary(&summary, &summary.pairs())?);
    Ok(())
}

async fn execute_group_command(command: GroupCommands, ctx: CommandContext) -> Result<()> {
    let provisioner = ctx.provisioner()?;
    let name = ctx.config.resource_group.clone();

    match command {
        GroupCommands::Ensure { tag } => {
            let tags: HashMap<String, String> = tag.into_iter().collect();
            if provisioner.ensure_resource_group(tags).await? {
                ctx.display
                    .print_success(&format!("Resource group '{name}' created"))?;
            } else {
                ctx.display.print_info(&format!(
                    "Resource group '{name}' already exists. Using existing resource group."
                ))?;
            }
        }
        GroupCommands::Show => {
            let group = provisioner.show_resource_group().await?;
            println!("{}", ctx.formatter().format_item(&group)?);
        }
        GroupCommands::Delete { force } => {
            let message = format!(
                "Delete resource group '{name}' and every resource in it? This cannot be undone."
            );
            if ctx.confirm_destructive(&message, force)? {
                provisioner.delete_resource_group().await?;
                ctx.display
                    .print_success(&format!("Resource group '{name}' deleted"))?;
            }
        }
    }
    Ok(())
}

async fn execute_network_command(command: NetworkCommands, ctx: CommandContext) -> Result<()> {
    let provisioner = ctx.provisioner()?;

    match command {
        NetworkCommands::Create => {
            provisioner.ensure_resource_group(HashMap::new()).await?;
            let (vnet, subnet) = provisioner.create_virtual_network().await?;
            let public_ip = provisioner.create_public_ip().await?;
            let nic = provisioner.create_network_interface().await?;

            let resources: Vec<NetworkResource> =
                vec![vnet.into(), subnet.into(), public_ip.into(), nic.into()];
            println!("{}", ctx.formatter().format_table(&resources)?);
        }
    }
    Ok(())
}

async fn execute_vm_command(command: VmCommands, mut ctx: CommandContext) -> Result<()> {
    match command {
        VmCommands::Create { name, size } => {
            if let Some(name) = name {
                ctx.config.vm.name = name;
            }
            if let Some(size) = size {
                ctx.config.vm.preferred_size = size;
            }
            ctx.prompt_for_passwords(true, false)?;

            let vm = ctx.provisioner()?.create_virtual_machine().await?;
            println!("{}", ctx.formatter().format_item(&vm)?);
        }
        VmCommands::Start { name } => {
            let name = ctx.vm_name(name);
            let found = ctx.provisioner()?.start_vm(&name).await?;
            report_vm_action(&ctx, &name, "started", found)?;
        }
        VmCommands::Stop { name } => {
            let name = ctx.vm_name(name);
            let found = ctx.provisioner()?.stop_vm(&name).await?;
            report_vm_action(&ctx, &name, "stopped", found)?;
        }
        VmCommands::Deallocate { name } => {
            let name = ctx.vm_name(name);
            let found = ctx.provisioner()?.deallocate_vm(&name).await?;
            report_vm_action(&ctx, &name, "deallocated", found)?;
        }
        VmCommands::Restart { name } => {
            let name = ctx.vm_name(name);
            let found = ctx.provisioner()?.restart_vm(&name).await?;
            report_vm_action(&ctx, &name, "restarted", found)?;
        }
        VmCommands::Delete { name, force } => {
            let name = ctx.vm_name(name);
            let provisioner = ctx.provisioner()?;
            if ctx.confirm_destructive(&format!("Delete VM '{name}'?"), force)? {
                let found = provisioner.delete_vm(&name).await?;
                report_vm_action(&ctx, &name, "deleted", found)?;
            }
        }
        VmCommands::Show { name } => {
            let name = ctx.vm_name(name);
            let vm = ctx.provisioner()?.show_vm(&name).await?;
            println!("{}", ctx.formatter().format_item(&vm)?);
        }
        VmCommands::List => {
            let vms = ctx.provisioner()?.list_vms().await?;
            if vms.is_empty() && ctx.format == OutputFormat::Table {
                ctx.display.print_info(&format!(
                    "No VMs found in resource group '{}'.",
                    ctx.config.resource_group
                ))?;
                return Ok(());
            }
            println!("{}", ctx.formatter().format_table(&vms)?);
        }
        VmCommands::Sizes => {
            let sizes = ctx.provisioner()?.list_vm_sizes().await?;
            println!("{}", ctx.formatter().format_table(&sizes)?);
        }
    }
    Ok(())
}

fn report_vm_action(ctx: &CommandContext, name: &str, done: &str, found: bool) -> Result<()> {
    if found {
        ctx.display.print_success(&format!("VM '{name}' {done}"))
    } else {
        ctx.display.print_warning(&format!(
            "VM '{}' not found in resource group '{}'",
            name, ctx.config.resource_group
        ))
    }
}

async fn execute_sql_command(command: SqlCommands, mut ctx: CommandContext) -> Result<()> {
    match command {
        SqlCommands::Create { database } => {
            if let Some(database) = database {
                ctx.config.sql.database_name = database;
            }
            ctx.prompt_for_passwords(false, true)?;

            let deployment = ctx.provisioner()?.setup_sql_database().await?;
            let server_fqdn = deployment.server.fqdn.clone().unwrap_or_default();
            let pairs = [
                ("SQL server", deployment.server.name.as_str()),
                ("FQDN", server_fqdn.as_str()),
                ("Database", deployment.database.name.as_str()),
            ];
            println!("{}", ctx.formatter().format_summary(&deployment, &pairs)?);
        }
        SqlCommands::Show { server, database } => {
            let provisioner = ctx.provisioner()?;
            match database {
                Some(database) => {
                    let db = provisioner.show_sql_database(&server, &database).await?;
                    println!("{}", ctx.formatter().format_item(&db)?);
                }
                None => {
                    let server = provisioner.show_sql_server(&server).await?;
                    println!("{}", ctx.formatter().format_item(&server)?);
                }
            }
        }
        SqlCommands::Delete { server, force } => {
            let provisioner = ctx.provisioner()?;
            let message = format!("Delete SQL server '{server}' and all of its databases?");
            if ctx.confirm_destructive(&message, force)? {
                provisioner.delete_sql_server(&server).await?;
                ctx.display
                    .print_success(&format!("SQL server '{server}' deleted"))?;
            }
        }
    }
    Ok(())
}

async fn execute_storage_command(command: StorageCommands, ctx: CommandContext) -> Result<()> {
    let provisioner = ctx.provisioner()?;

    match command {
        StorageCommands::Create => {
            let account = provisioner.configure_storage_account().await?;
            println!("{}", ctx.formatter().format_item(&account)?);
        }
        StorageCommands::Show { name } => {
            let account = provisioner.show_storage_account(&name).await?;
            println!("{}", ctx.formatter().format_item(&account)?);
        }
        StorageCommands::Delete { name, force } => {
            if ctx.confirm_destructive(&format!("Delete storage account '{name}'?"), force)? {
                provisioner.delete_storage_account(&name).await?;
                ctx.display
                    .print_success(&format!("Storage account '{name}' deleted"))?;
            }
        }
    }
    Ok(())
}

async fn execute_config_command(command: ConfigCommands, ctx: CommandContext) -> Result<()> {
    match command {
        ConfigCommands::Show => execute_config_show(&ctx),
        ConfigCommands::Path => {
            let config_path = Config::get_config_path()?;
            println!("{}", config_path.display());
            Ok(())
        }
        ConfigCommands::Set { key, value } => execute_config_set(&key, &value, ctx).await,
        ConfigCommands::Init => execute_init_command(ctx).await,
    }
}

fn execute_config_show(ctx: &CommandContext) -> Result<()> {
    use serde::Serialize;
    use tabled::Tabled;

    #[derive(Tabled, Serialize)]
    struct ConfigItem {
        #[tabled(rename = "Setting")]
        key: String,
        #[tabled(rename = "Value")]
        value: String,
    }

    let items: Vec<ConfigItem> = ctx
        .config
        .display_pairs()
        .into_iter()
        .map(|(key, value)| ConfigItem {
            key,
            value: if value.is_empty() {
                "<not set>".to_string()
            } else {
                value
            },
        })
        .collect();

    println!("{}", ctx.formatter().format_table(&items)?);
    Ok(())
}

async fn execute_config_set(key: &str, value: &str, ctx: CommandContext) -> Result<()> {
    // Start from the file and defaults only so env values are not persisted
    let path = Config::get_config_path()?;
    let mut config = crate::config::load_config_from(&path, |_| None).await?;
    config.set_value(key, value)?;
    config.save().await?;

    ctx.display
        .print_success(&format!("Configuration updated: {key} = {value}"))?;
    Ok(())
}

async fn execute_init_command(ctx: CommandContext) -> Result<()> {
    use crate::config::init::ConfigInitializer;

    let initializer = ConfigInitializer::new(ctx.config.no_color);
    let new_config = initializer.run_interactive_setup(ctx.config).await?;
    initializer.show_setup_summary(&new_config)?;

    Ok(())
}

fn execute_version_command() -> Result<()> {
    let build_info = get_build_info();

    println!("azm (azmanage)");
    println!("==============");
    println!("Version:      {}", build_info.version);
    println!("Full Version: {}", build_info.full_version);
    println!("Git Hash:     {}", build_info.git_hash);
    println!("Git Branch:   {}", build_info.git_branch);
    println!("Built:        {}", build_info.build_time);

    Ok(())
}

/// Parse a single key-value pair
fn parse_key_val<T, U>(
    s: &str,
) -> std::result::Result<(T, U), Box<dyn std::error::Error + Send + Sync + 'static>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    U: std::str::FromStr,
    U::Err: std::error::Error + Send + Sync + 'static,
{
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{s}`"))?;
    Ok((s[..pos].parse()?, s[pos + 1..].parse()?))
}
