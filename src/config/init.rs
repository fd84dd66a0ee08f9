//! Interactive first-run setup
//!
//! Walks the user through subscription, identity, resource group and
//! location, optionally creates the resource group, and writes the
//! result to the config file.

use std::collections::HashMap;

use crate::auth::provider::AuthProviderFactory;
use crate::config::settings::{save_config_to, Config};
use crate::error::{AzmError, Result};
use crate::manager::Provisioner;
use crate::utils::format::DisplayUtils;
use crate::utils::interactive::{InteractivePrompt, ProgressIndicator, SetupHelper};

const TOTAL_STEPS: u8 = 5;

/// Interactive configuration initialization
pub struct ConfigInitializer {
    prompt: InteractivePrompt,
    display: DisplayUtils,
}

/// Answers collected during initialization
#[derive(Debug, Clone)]
pub struct InitConfig {
    pub subscription_id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub resource_group: String,
    pub location: String,
    pub create_resource_group: bool,
}

impl ConfigInitializer {
    pub fn new(no_color: bool) -> Self {
        Self {
            prompt: InteractivePrompt::new(),
            display: DisplayUtils::new(no_color),
        }
    }

    /// Run the complete interactive initialization process
    pub async fn run_interactive_setup(&self, current: Config) -> Result<Config> {
        if !InteractivePrompt::is_interactive() {
            return Err(AzmError::config(
                "azm init needs an interactive terminal. Use 'azm config set' instead.",
            ));
        }

        self.display.print_header("azm setup")?;

        self.prompt.step(1, TOTAL_STEPS, "Subscription");
        let subscription_id = self.prompt.input_text_validated(
            "Azure subscription ID",
            non_empty(&current.subscription_id),
            SetupHelper::validate_subscription_id,
        )?;

        self.prompt.step(2, TOTAL_STEPS, "Service principal");
        let (tenant_id, client_id) = self.configure_identity(&current)?;

        self.prompt.step(3, TOTAL_STEPS, "Resource group");
        let resource_group = self.prompt.input_text_validated(
            "Resource group",
            non_empty(&current.resource_group),
            SetupHelper::validate_resource_group_name,
        )?;

        self.prompt.step(4, TOTAL_STEPS, "Location");
        let location = self.prompt.input_text_validated(
            "Location",
            non_empty(&current.location),
            SetupHelper::validate_location,
        )?;

        self.prompt.step(5, TOTAL_STEPS, "Resource group creation");
        let create_resource_group = self.prompt.confirm(
            &format!("Create resource group '{resource_group}' now if it does not exist?"),
            false,
        )?;

        let answers = InitConfig {
            subscription_id: subscription_id.trim().to_string(),
            tenant_id,
            client_id,
            resource_group,
            location,
            create_resource_group,
        };

        let config = build_config(&answers, current);
        if answers.create_resource_group {
            self.create_resource_group(&config).await?;
        }

        let path = Config::get_config_path()?;
        let progress = ProgressIndicator::on_stderr("Saving configuration...");
        save_config_to(&config, &path).await?;
        progress.finish_success(&format!("Configuration saved to {}", path.display()));

        Ok(config)
    }

    fn configure_identity(&self, current: &Config) -> Result<(String, String)> {
        let use_service_principal = self.prompt.confirm(
            "Authenticate with a service principal (AZURE_CLIENT_ID / AZURE_CLIENT_SECRET / AZURE_TENANT_ID)?",
            current.has_service_principal(),
        )?;

        if !use_service_principal {
            self.display
                .print_info("Using the default credential chain (environment, managed identity, Azure CLI).")?;
            return Ok((current.tenant_id.clone(), current.client_id.clone()));
        }

        let tenant_id = self.prompt.input_text_validated(
            "Tenant ID",
            non_empty(&current.tenant_id),
            SetupHelper::validate_tenant_id,
        )?;
        let client_id = self.prompt.input_text_validated(
            "Client ID",
            non_empty(&current.client_id),
            SetupHelper::validate_client_id,
        )?;

        if current.client_secret.is_empty() {
            self.display.print_warning(
                "The client secret is never written to the config file. Export AZURE_CLIENT_SECRET before running azm.",
            )?;
        }

        Ok((tenant_id, client_id))
    }

    async fn create_resource_group(&self, config: &Config) -> Result<()> {
        let progress = ProgressIndicator::on_stderr(&format!(
            "Ensuring resource group '{}'...",
            config.resource_group
        ));

        let result = async {
            let auth_provider = AuthProviderFactory::from_config(config)?;
            let provisioner = Provisioner::new(auth_provider, config.clone())?;
            provisioner.ensure_resource_group(HashMap::new()).await
        }
        .await;

        match result {
            Ok(true) => {
                progress.finish_success(&format!("Created resource group '{}'", config.resource_group));
                Ok(())
            }
            Ok(false) => {
                progress.finish_success(&format!(
                    "Resource group '{}' already exists",
                    config.resource_group
                ));
                Ok(())
            }
            Err(e) => {
                progress.finish_error("Could not ensure resource group");
                Err(e)
            }
        }
    }

    pub fn show_setup_summary(&self, config: &Config) -> Result<()> {
        println!();
        self.display.print_success("Setup complete")?;

        let auth = if config.client_id.is_empty() {
            "default credential chain".to_string()
        } else {
            format!("service principal {}", config.client_id)
        };
        println!(
            "{}",
            self.display.format_key_value_pairs(&[
                ("Subscription", config.subscription_id.as_str()),
                ("Authentication", auth.as_str()),
                ("Resource group", config.resource_group.as_str()),
                ("Location", config.location.as_str()),
            ])
        );

        println!();
        self.display.print_info("Next steps:")?;
        println!("  • Deploy everything: azm deploy");
        println!("  • Create just the VM: azm vm create");
        println!("  • Get help: azm --help");

        Ok(())
    }
}

/// Fold setup answers into an existing configuration
pub fn build_config(answers: &InitConfig, mut base: Config) -> Config {
    base.subscription_id = answers.subscription_id.clone();
    base.tenant_id = answers.tenant_id.clone();
    base.client_id = answers.client_id.clone();
    base.resource_group = answers.resource_group.clone();
    base.location = answers.location.clone();
    base
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_keeps_other_settings() {
        let mut base = Config::default();
        base.vm.preferred_size = "Standard_B2s".to_string();

        let answers = InitConfig {
            subscription_id: "12345678-1234-1234-1234-123456789012".to_string(),
            tenant_id: String::new(),
            client_id: String::new(),
            resource_group: "rg-demo".to_string(),
            location: "westus2".to_string(),
            create_resource_group: false,
        };

        let config = build_config(&answers, base);
        assert_eq!(config.resource_group, "rg-demo");
        assert_eq!(config.location, "westus2");
        assert_eq!(config.vm.preferred_size, "Standard_B2s");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_empty_default() {
        assert_eq!(non_empty(""), None);
        assert_eq!(non_empty("centralus"), Some("centralus"));
    }
}
