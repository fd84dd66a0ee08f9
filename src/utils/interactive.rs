//! Interactive input utilities for prompts, confirmations and spinners

use crate::config::SecretString;
use crate::error::{AzmError, Result};
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

/// Interactive prompt utilities
pub struct InteractivePrompt {
    theme: ColorfulTheme,
}

impl InteractivePrompt {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    /// True when stdin is attached to a terminal
    pub fn is_interactive() -> bool {
        std::io::stdin().is_terminal()
    }

    /// Prompt for yes/no confirmation with a default value. Esc or `q` cancels.
    pub fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(message)
            .default(default)
            .interact_opt()?
            .ok_or(AzmError::Cancelled)
    }

    /// Prompt for text input with validation function
    pub fn input_text_validated<F>(
        &self,
        message: &str,
        default: Option<&str>,
        validator: F,
    ) -> Result<String>
    where
        F: Fn(&str) -> std::result::Result<(), String> + 'static,
    {
        let mut input = Input::with_theme(&self.theme)
            .with_prompt(message)
            .validate_with(move |input: &String| validator(input.as_str()));

        if let Some(default_value) = default {
            input = input.default(default_value.to_string());
        }

        Ok(input.interact_text()?)
    }

    /// Prompt for a password without echo
    pub fn password(&self, message: &str) -> Result<SecretString> {
        let value = rpassword::prompt_password(format!("{message}: "))?;
        if value.is_empty() {
            return Err(AzmError::invalid_argument(format!(
                "{message} cannot be empty"
            )));
        }
        Ok(value.into())
    }

    pub fn step(&self, step_number: u8, total_steps: u8, title: &str) {
        println!();
        println!("Step {step_number}/{total_steps}: {title}");
    }
}

impl Default for InteractivePrompt {
    fn default() -> Self {
        Self::new()
    }
}

/// Spinner for long-running operations
pub struct ProgressIndicator {
    bar: ProgressBar,
}

impl ProgressIndicator {
    /// Start a spinner; hidden when `enabled` is false
    pub fn new(message: &str, enabled: bool) -> Self {
        let bar = if enabled {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
                    .template("{spinner:.blue} {msg} [{elapsed}]")
                    .expect("Progress bar template should be valid"),
            );
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            ProgressBar::hidden()
        };
        bar.set_message(message.to_string());

        Self { bar }
    }

    /// Start a spinner that only draws when stderr is a terminal
    pub fn on_stderr(message: &str) -> Self {
        Self::new(message, std::io::stderr().is_terminal())
    }

    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    pub fn finish_success(&self, message: &str) {
        self.bar.finish_with_message(format!("✓ {message}"));
    }

    pub fn finish_error(&self, message: &str) {
        self.bar.finish_with_message(format!("✗ {message}"));
    }

    pub fn finish_clear(&self) {
        self.bar.finish_and_clear();
    }
}

/// Validators used by the interactive setup
pub struct SetupHelper;

impl SetupHelper {
    /// Validate Azure subscription ID format
    pub fn validate_subscription_id(subscription_id: &str) -> std::result::Result<(), String> {
        validate_guid(subscription_id, "Subscription ID")
    }

    /// Directory (tenant) ID of the service principal
    pub fn validate_tenant_id(tenant_id: &str) -> std::result::Result<(), String> {
        validate_guid(tenant_id, "Tenant ID")
    }

    /// Application (client) ID of the service principal
    pub fn validate_client_id(client_id: &str) -> std::result::Result<(), String> {
        validate_guid(client_id, "Client ID")
    }

    pub fn validate_resource_group_name(name: &str) -> std::result::Result<(), String> {
        crate::utils::names::validate_resource_group_name(name).map_err(|e| e.to_string())
    }

    /// Azure region names are lowercase alphanumerics, e.g. `centralus`
    pub fn validate_location(location: &str) -> std::result::Result<(), String> {
        if !location.is_empty()
            && location
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            Ok(())
        } else {
            Err(format!("'{location}' is not a valid Azure region name"))
        }
    }
}

fn validate_guid(value: &str, what: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{what} cannot be empty"));
    }

    if uuid::Uuid::parse_str(value.trim()).is_err() {
        return Err(format!("{what} must be a valid GUID format"));
    }

    Ok(())
}
