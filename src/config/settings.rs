//! Configuration settings management
//!
//! This module handles loading configuration from multiple sources,
//! validation, and persistence.

use crate::error::{AzmError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zeroize::Zeroizing;

/// Secret string that is wiped on drop and never written back to disk
pub type SecretString = Zeroizing<String>;

pub const DEFAULT_LOG_FILE: &str = "azure_management.log";
pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

/// How credentials are chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Service principal when all three AZURE_* variables are present, else the default chain
    #[default]
    Auto,
    ClientSecret,
    Default,
}

impl std::str::FromStr for AuthMethod {
    type Err = AzmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "auto" => Ok(Self::Auto),
            "client_secret" | "clientsecret" | "service_principal" => Ok(Self::ClientSecret),
            "default" | "defaultazurecredential" => Ok(Self::Default),
            other => Err(AzmError::config(format!(
                "Unsupported authentication method: {other}"
            ))),
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::ClientSecret => "client_secret",
            Self::Default => "default",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub vnet_name: String,
    pub address_prefixes: Vec<String>,
    pub subnet_name: String,
    pub subnet_prefix: String,
    pub public_ip_name: String,
    pub public_ip_allocation: String,
    pub nic_name: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            vnet_name: "MyVNet".to_string(),
            address_prefixes: vec!["10.0.0.0/16".to_string()],
            subnet_name: "MySubnet".to_string(),
            subnet_prefix: "10.0.0.0/24".to_string(),
            public_ip_name: "MyPublicIP".to_string(),
            public_ip_allocation: "Dynamic".to_string(),
            nic_name: "MyVMNIC".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageSettings {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
    pub version: String,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            publisher: "Canonical".to_string(),
            offer: "UbuntuServer".to_string(),
            sku: "18.04-LTS".to_string(),
            version: "latest".to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VmSettings {
    pub name: String,
    pub preferred_size: String,
    pub admin_username: String,
    #[serde(skip_serializing)]
    pub admin_password: SecretString,
    pub image: ImageSettings,
}

impl Default for VmSettings {
    fn default() -> Self {
        Self {
            name: "MyVM".to_string(),
            preferred_size: "Standard_B1s".to_string(),
            admin_username: "azureuser".to_string(),
            admin_password: SecretString::default(),
            image: ImageSettings::default(),
        }
    }
}

impl fmt::Debug for VmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VmSettings")
            .field("name", &self.name)
            .field("preferred_size", &self.preferred_size)
            .field("admin_username", &self.admin_username)
            .field("admin_password", &redacted(&self.admin_password))
            .field("image", &self.image)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlSettings {
    pub server_prefix: String,
    pub database_name: String,
    pub admin_login: String,
    #[serde(skip_serializing)]
    pub admin_password: SecretString,
}

impl Default for SqlSettings {
    fn default() -> Self {
        Self {
            server_prefix: "myserver".to_string(),
            database_name: "mydatabase".to_string(),
            admin_login: "sqladmin".to_string(),
            admin_password: SecretString::default(),
        }
    }
}

impl fmt::Debug for SqlSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlSettings")
            .field("server_prefix", &self.server_prefix)
            .field("database_name", &self.database_name)
            .field("admin_login", &self.admin_login)
            .field("admin_password", &redacted(&self.admin_password))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub account_prefix: String,
    pub sku: String,
    pub kind: String,
    pub name_attempts: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            account_prefix: "mystorageacct".to_string(),
            sku: "Standard_LRS".to_string(),
            kind: "StorageV2".to_string(),
            name_attempts: 5,
        }
    }
}

/// Timing of long-running operation polling and post-create verification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationSettings {
    pub poll_interval_secs: u64,
    pub lro_timeout_secs: u64,
    pub verify_attempts: usize,
    pub verify_interval_secs: u64,
}

impl Default for OperationSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            lro_timeout_secs: 1800,
            verify_attempts: 10,
            verify_interval_secs: 5,
        }
    }
}

impl OperationSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn lro_timeout(&self) -> Duration {
        Duration::from_secs(self.lro_timeout_secs)
    }

    pub fn verify_interval(&self) -> Duration {
        Duration::from_secs(self.verify_interval_secs)
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debug: bool,
    pub subscription_id: String,
    pub tenant_id: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: SecretString,
    pub auth_method: AuthMethod,
    pub management_endpoint: String,
    pub resource_group: String,
    pub location: String,
    pub log_file: PathBuf,
    pub output_json: bool,
    pub no_color: bool,
    pub network: NetworkSettings,
    pub vm: VmSettings,
    pub sql: SqlSettings,
    pub storage: StorageSettings,
    pub operations: OperationSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            subscription_id: String::new(),
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: SecretString::default(),
            auth_method: AuthMethod::Auto,
            management_endpoint: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
            resource_group: "MyResourceGroup".to_string(),
            location: "centralus".to_string(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            output_json: false,
            no_color: false,
            network: NetworkSettings::default(),
            vm: VmSettings::default(),
            sql: SqlSettings::default(),
            storage: StorageSettings::default(),
            operations: OperationSettings::default(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("debug", &self.debug)
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &redacted(&self.client_secret))
            .field("auth_method", &self.auth_method)
            .field("management_endpoint", &self.management_endpoint)
            .field("resource_group", &self.resource_group)
            .field("location", &self.location)
            .field("log_file", &self.log_file)
            .field("network", &self.network)
            .field("vm", &self.vm)
            .field("sql", &self.sql)
            .field("storage", &self.storage)
            .field("operations", &self.operations)
            .finish()
    }
}

fn redacted(secret: &SecretString) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.subscription_id.is_empty() {
            return Err(AzmError::config(
                "Azure subscription ID is not set. Please set the AZURE_SUBSCRIPTION_ID environment variable.",
            ));
        }

        if self.resource_group.is_empty() {
            return Err(AzmError::config("Resource group is required"));
        }

        if self.location.is_empty() {
            return Err(AzmError::config("Location is required"));
        }

        if self.operations.verify_attempts == 0 {
            return Err(AzmError::config("operations.verify_attempts must be at least 1"));
        }

        Ok(())
    }

    /// True when tenant, client id and client secret are all present
    pub fn has_service_principal(&self) -> bool {
        !self.tenant_id.is_empty() && !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    pub fn get_config_path() -> Result<PathBuf> {
        // XDG layout on Linux and macOS, platform config dir elsewhere
        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            use std::env;
            let config_dir = if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
                PathBuf::from(xdg_config_home)
            } else {
                let home_dir = env::var("HOME")
                    .map_err(|_| AzmError::config("HOME environment variable not set"))?;
                PathBuf::from(home_dir).join(".config")
            };
            Ok(config_dir.join("azm").join("azm.toml"))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            let config_dir = dirs::config_dir()
                .ok_or_else(|| AzmError::config("Unable to determine config directory"))?;
            Ok(config_dir.join("azm").join("azm.toml"))
        }
    }

    pub async fn save(&self) -> Result<()> {
        save_config(self).await
    }

    /// Set a single configuration key from its string form
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "subscription_id" => self.subscription_id = value.to_string(),
            "tenant_id" => self.tenant_id = value.to_string(),
            "client_id" => self.client_id = value.to_string(),
            "auth_method" => self.auth_method = value.parse()?,
            "management_endpoint" => {
                url::Url::parse(value).map_err(|e| {
                    AzmError::invalid_argument(format!("Invalid management endpoint: {e}"))
                })?;
                self.management_endpoint = value.trim_end_matches('/').to_string();
            }
            "resource_group" => self.resource_group = value.to_string(),
            "location" => self.location = value.to_string(),
            "log_file" => self.log_file = PathBuf::from(value),
            "debug" => self.debug = parse_bool(key, value)?,
            "output_json" => self.output_json = parse_bool(key, value)?,
            "no_color" => self.no_color = parse_bool(key, value)?,
            "network.vnet_name" => self.network.vnet_name = value.to_string(),
            "network.subnet_name" => self.network.subnet_name = value.to_string(),
            "network.subnet_prefix" => self.network.subnet_prefix = value.to_string(),
            "network.address_prefixes" => {
                self.network.address_prefixes = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }
            "network.public_ip_name" => self.network.public_ip_name = value.to_string(),
            "network.public_ip_allocation" => {
                self.network.public_ip_allocation = value.to_string()
            }
            "network.nic_name" => self.network.nic_name = value.to_string(),
            "vm.name" => self.vm.name = value.to_string(),
            "vm.preferred_size" => self.vm.preferred_size = value.to_string(),
            "vm.admin_username" => self.vm.admin_username = value.to_string(),
            "sql.server_prefix" => self.sql.server_prefix = value.to_string(),
            "sql.database_name" => self.sql.database_name = value.to_string(),
            "sql.admin_login" => self.sql.admin_login = value.to_string(),
            "storage.account_prefix" => self.storage.account_prefix = value.to_string(),
            "storage.sku" => self.storage.sku = value.to_string(),
            "storage.kind" => self.storage.kind = value.to_string(),
            "operations.poll_interval_secs" => {
                self.operations.poll_interval_secs = parse_number(key, value)?
            }
            "operations.lro_timeout_secs" => {
                self.operations.lro_timeout_secs = parse_number(key, value)?
            }
            "operations.verify_attempts" => {
                self.operations.verify_attempts = parse_number(key, value)?
            }
            "operations.verify_interval_secs" => {
                self.operations.verify_interval_secs = parse_number(key, value)?
            }
            _ => {
                return Err(AzmError::invalid_argument(format!(
                    "Unknown or read-only configuration key: {key}"
                )))
            }
        }
        Ok(())
    }

    /// Key/value pairs for display, secrets redacted
    pub fn display_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("subscription_id".into(), self.subscription_id.clone()),
            ("tenant_id".into(), self.tenant_id.clone()),
            ("client_id".into(), self.client_id.clone()),
            ("client_secret".into(), redacted(&self.client_secret).into()),
            ("auth_method".into(), self.auth_method.to_string()),
            ("management_endpoint".into(), self.management_endpoint.clone()),
            ("resource_group".into(), self.resource_group.clone()),
            ("location".into(), self.location.clone()),
            ("log_file".into(), self.log_file.display().to_string()),
            ("network.vnet_name".into(), self.network.vnet_name.clone()),
            (
                "network.address_prefixes".into(),
                self.network.address_prefixes.join(","),
            ),
            ("network.subnet_name".into(), self.network.subnet_name.clone()),
            ("network.subnet_prefix".into(), self.network.subnet_prefix.clone()),
            ("network.public_ip_name".into(), self.network.public_ip_name.clone()),
            ("network.nic_name".into(), self.network.nic_name.clone()),
            ("vm.name".into(), self.vm.name.clone()),
            ("vm.preferred_size".into(), self.vm.preferred_size.clone()),
            ("vm.admin_username".into(), self.vm.admin_username.clone()),
            ("sql.server_prefix".into(), self.sql.server_prefix.clone()),
            ("sql.database_name".into(), self.sql.database_name.clone()),
            ("sql.admin_login".into(), self.sql.admin_login.clone()),
            ("storage.account_prefix".into(), self.storage.account_prefix.clone()),
            ("storage.sku".into(), self.storage.sku.clone()),
            ("storage.kind".into(), self.storage.kind.clone()),
        ]
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(AzmError::invalid_argument(format!(
            "Invalid boolean for {key}: {value}"
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| AzmError::invalid_argument(format!("Invalid number for {key}: {value}")))
}

/// Load configuration from multiple sources with priority order:
/// 1. Command-line flags (applied by the CLI afterwards)
/// 2. Environment variables
/// 3. Configuration file
/// 4. Default values
///
/// Not validated here; commands that reach Azure call `Config::validate`.
pub async fn load_config_no_validation() -> Result<Config> {
    let config_path = Config::get_config_path()?;
    load_config_from(&config_path, |name| std::env::var(name).ok()).await
}

/// Load from an explicit file path and environment lookup
pub async fn load_config_from<F>(path: &Path, env: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = if path.exists() {
        load_from_file(path).await?
    } else {
        Config::default()
    };

    apply_env(&mut config, env)?;
    Ok(config)
}

async fn load_from_file(path: &Path) -> Result<Config> {
    let contents = tokio::fs::read_to_string(path).await?;

    // TOML first, JSON as fallback
    match toml::from_str::<Config>(&contents) {
        Ok(config) => Ok(config),
        Err(toml_err) => serde_json::from_str::<Config>(&contents).map_err(|_| toml_err.into()),
    }
}

fn apply_env<F>(config: &mut Config, env: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = env("DEBUG") {
        config.debug = value.to_lowercase() == "true" || value == "1";
    }

    if let Some(value) = env("AZURE_SUBSCRIPTION_ID") {
        config.subscription_id = value;
    }

    if let Some(value) = env("AZURE_TENANT_ID") {
        config.tenant_id = value;
    }

    if let Some(value) = env("AZURE_CLIENT_ID") {
        config.client_id = value;
    }

    if let Some(value) = env("AZURE_CLIENT_SECRET") {
        config.client_secret = value.into();
    }

    if let Some(value) = env("AZMANAGE_AUTH_METHOD") {
        config.auth_method = value.parse().map_err(|_: AzmError| {
            AzmError::config(format!(
                "Unsupported AZMANAGE_AUTH_METHOD '{}' (expected auto, client_secret or default)",
                value
            ))
        })?;
    }

    if let Some(value) = env("AZURE_RESOURCE_GROUP") {
        config.resource_group = value;
    }

    if let Some(value) = env("AZURE_LOCATION") {
        config.location = value;
    }

    if let Some(value) = env("AZMANAGE_LOG_FILE") {
        config.log_file = PathBuf::from(value);
    }

    if let Some(value) = env("AZURE_VM_ADMIN_PASSWORD") {
        config.vm.admin_password = value.into();
    }

    if let Some(value) = env("AZURE_SQL_ADMIN_PASSWORD") {
        config.sql.admin_password = value.into();
    }

    Ok(())
}

pub async fn save_config(config: &Config) -> Result<()> {
    let config_path = Config::get_config_path()?;
    save_config_to(config, &config_path).await
}

pub async fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let contents = toml::to_string_pretty(config)?;
    tokio::fs::write(path, contents).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_match_deployment_layout() {
        let config = Config::default();
        assert_eq!(config.resource_group, "MyResourceGroup");
        assert_eq!(config.location, "centralus");
        assert_eq!(config.vm.preferred_size, "Standard_B1s");
        assert_eq!(config.network.address_prefixes, vec!["10.0.0.0/16"]);
        assert_eq!(config.network.subnet_prefix, "10.0.0.0/24");
        assert_eq!(config.log_file, PathBuf::from("azure_management.log"));
    }

    #[tokio::test]
    async fn test_invalid_auth_method_env_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let err = load_config_from(&path, env_from(&[("AZMANAGE_AUTH_METHOD", "kerberos")]))
            .await
            .unwrap_err();
        assert!(matches!(err, AzmError::ConfigError(_)));
        assert!(err.to_string().contains("AZMANAGE_AUTH_METHOD"));
        assert!(err.to_string().contains("kerberos"));
    }

    #[tokio::test]
    async fn test_auth_method_env_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let config = load_config_from(
            &path,
            env_from(&[("AZMANAGE_AUTH_METHOD", "client-secret")]),
        )
        .await
        .unwrap();
        assert_eq!(config.auth_method, AuthMethod::ClientSecret);
    }

    #[test]
    fn test_validate_requires_subscription() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("AZURE_SUBSCRIPTION_ID"));
    }

    #[tokio::test]
    async fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("azm.toml");
        tokio::fs::write(
            &path,
            "subscription_id = \"from-file\"\nlocation = \"westeurope\"\n[vm]\nname = \"FileVM\"\n",
        )
        .await
        .unwrap();

        let config = load_config_from(
            &path,
            env_from(&[
                ("AZURE_SUBSCRIPTION_ID", "from-env"),
                ("AZURE_CLIENT_SECRET", "s3cret"),
            ]),
        )
        .await
        .unwrap();

        assert_eq!(config.subscription_id, "from-env");
        assert_eq!(config.location, "westeurope");
        assert_eq!(config.vm.name, "FileVM");
        assert_eq!(config.vm.preferred_size, "Standard_B1s");
        assert_eq!(config.client_secret.as_str(), "s3cret");
    }

    #[tokio::test]
    async fn test_json_config_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("azm.toml");
        tokio::fs::write(&path, r#"{"subscription_id": "json-sub"}"#)
            .await
            .unwrap();

        let config = load_config_from(&path, env_from(&[])).await.unwrap();
        assert_eq!(config.subscription_id, "json-sub");
    }

    #[tokio::test]
    async fn test_secrets_are_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("azm.toml");

        let mut config = Config::default();
        config.client_secret = "top-secret".to_string().into();
        config.vm.admin_password = "vm-secret".to_string().into();
        save_config_to(&config, &path).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(!contents.contains("top-secret"));
        assert!(!contents.contains("vm-secret"));

        let reloaded = load_config_from(&path, env_from(&[])).await.unwrap();
        assert!(reloaded.client_secret.is_empty());
    }

    #[test]
    fn test_set_value() {
        let mut config = Config::default();
        config.set_value("vm.name", "OtherVM").unwrap();
        config.set_value("auth_method", "client-secret").unwrap();
        config.set_value("network.address_prefixes", "10.1.0.0/16, 10.2.0.0/16").unwrap();
        config.set_value("operations.verify_attempts", "3").unwrap();

        assert_eq!(config.vm.name, "OtherVM");
        assert_eq!(config.auth_method, AuthMethod::ClientSecret);
        assert_eq!(config.network.address_prefixes.len(), 2);
        assert_eq!(config.operations.verify_attempts, 3);
        assert!(config.set_value("client_secret", "x").is_err());
        assert!(config.set_value("operations.verify_attempts", "many").is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = Config::default();
        config.client_secret = "hunter2".to_string().into();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
