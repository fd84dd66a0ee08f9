//! Authentication provider trait and implementations
//!
//! This module defines the authentication provider trait and provides
//! implementations for the two ways azmanage authenticates: an explicit
//! service principal (client secret) and the DefaultAzureCredential chain.

use async_trait::async_trait;
use azure_core::auth::{AccessToken, TokenCredential};
use azure_identity::{ClientSecretCredential, DefaultAzureCredential, TokenCredentialOptions};
use std::sync::Arc;
use tracing::debug;

use crate::config::{AuthMethod, Config};
use crate::error::{AzmError, Result};

/// Authority host used for service principal token requests
pub const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Trait for Azure authentication providers
#[async_trait]
pub trait AzureAuthProvider: Send + Sync {
    /// Get an access token for the specified scopes
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken>;

    /// Get the tenant ID, when known
    fn get_tenant_id(&self) -> Option<String>;

    /// Get the client ID (if applicable)
    fn get_client_id(&self) -> Option<String>;

    /// Get the underlying token credential for Azure SDK usage
    fn get_token_credential(&self) -> Arc<dyn TokenCredential>;
}

/// Default Azure Credential Provider using DefaultAzureCredential
pub struct DefaultAzureCredentialProvider {
    credential: Arc<DefaultAzureCredential>,
    tenant_id: Option<String>,
}

impl DefaultAzureCredentialProvider {
    /// Create a new DefaultAzureCredentialProvider
    pub fn new(tenant_id: Option<String>) -> Result<Self> {
        let credential = Arc::new(
            DefaultAzureCredential::create(TokenCredentialOptions::default()).map_err(|e| {
                AzmError::authentication(format!(
                    "Failed to create DefaultAzureCredential: {}",
                    e
                ))
            })?,
        );

        Ok(Self {
            credential,
            tenant_id,
        })
    }
}

#[async_trait]
impl AzureAuthProvider for DefaultAzureCredentialProvider {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        self.credential
            .get_token(scopes)
            .await
            .map_err(|e| AzmError::authentication(format!("Failed to get token: {}", e)))
    }

    fn get_tenant_id(&self) -> Option<String> {
        self.tenant_id.clone()
    }

    fn get_client_id(&self) -> Option<String> {
        // The credential chain does not expose which identity answered
        None
    }

    fn get_token_credential(&self) -> Arc<dyn TokenCredential> {
        self.credential.clone()
    }
}

/// Client Secret Authentication Provider for a service principal
pub struct ClientSecretProvider {
    credential: Arc<ClientSecretCredential>,
    tenant_id: String,
    client_id: String,
}

impl ClientSecretProvider {
    /// Create a new ClientSecretProvider
    pub fn new(tenant_id: String, client_id: String, client_secret: String) -> Result<Self> {
        let authority_url = url::Url::parse(AUTHORITY_HOST)
            .map_err(|e| AzmError::config(format!("Invalid authority URL: {}", e)))?;

        let credential = Arc::new(ClientSecretCredential::new(
            azure_core::new_http_client(),
            authority_url,
            tenant_id.clone(),
            client_id.clone(),
            client_secret,
        ));

        Ok(Self {
            credential,
            tenant_id,
            client_id,
        })
    }
}

#[async_trait]
impl AzureAuthProvider for ClientSecretProvider {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        self.credential.get_token(scopes).await.map_err(|e| {
            AzmError::authentication(format!(
                "Failed to get token for service principal '{}': {}",
                self.client_id, e
            ))
        })
    }

    fn get_tenant_id(&self) -> Option<String> {
        Some(self.tenant_id.clone())
    }

    fn get_client_id(&self) -> Option<String> {
        Some(self.client_id.clone())
    }

    fn get_token_credential(&self) -> Arc<dyn TokenCredential> {
        self.credential.clone()
    }
}

/// Which provider a configuration resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    ClientSecret,
    Default,
}

/// Authentication provider factory
pub struct AuthProviderFactory;

impl AuthProviderFactory {
    /// Decide which provider the configuration asks for without building it
    pub fn resolve_kind(config: &Config) -> Result<ProviderKind> {
        match config.auth_method {
            AuthMethod::Default => Ok(ProviderKind::Default),
            AuthMethod::ClientSecret => {
                Self::require_service_principal(config)?;
                Ok(ProviderKind::ClientSecret)
            }
            AuthMethod::Auto => {
                if config.has_service_principal() {
                    Ok(ProviderKind::ClientSecret)
                } else {
                    Ok(ProviderKind::Default)
                }
            }
        }
    }

    /// Create an authentication provider based on configuration
    pub fn from_config(config: &Config) -> Result<Arc<dyn AzureAuthProvider>> {
        let tenant_id = (!config.tenant_id.is_empty()).then(|| config.tenant_id.clone());

        match Self::resolve_kind(config)? {
            ProviderKind::ClientSecret => {
                debug!(client_id = %config.client_id, "using service principal credentials");
                Ok(Arc::new(ClientSecretProvider::new(
                    config.tenant_id.clone(),
                    config.client_id.clone(),
                    config.client_secret.to_string(),
                )?))
            }
            ProviderKind::Default => {
                debug!("using DefaultAzureCredential chain");
                Ok(Arc::new(DefaultAzureCredentialProvider::new(tenant_id)?))
            }
        }
    }

    fn require_service_principal(config: &Config) -> Result<()> {
        let missing = [
            ("AZURE_TENANT_ID", config.tenant_id.is_empty()),
            ("AZURE_CLIENT_ID", config.client_id.is_empty()),
            ("AZURE_CLIENT_SECRET", config.client_secret.is_empty()),
        ];

        if let Some((name, _)) = missing.iter().find(|(_, is_missing)| *is_missing) {
            return Err(AzmError::config(format!(
                "{} is required for client secret authentication",
                name
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp_config() -> Config {
        let mut config = Config::default();
        config.tenant_id = "11111111-1111-1111-1111-111111111111".to_string();
        config.client_id = "22222222-2222-2222-2222-222222222222".to_string();
        config.client_secret = "shh".to_string().into();
        config
    }

    #[test]
    fn test_auto_prefers_service_principal() {
        let config = sp_config();
        assert_eq!(
            AuthProviderFactory::resolve_kind(&config).unwrap(),
            ProviderKind::ClientSecret
        );
    }

    #[test]
    fn test_auto_falls_back_to_default_chain() {
        let mut config = sp_config();
        config.client_secret = String::new().into();
        assert_eq!(
            AuthProviderFactory::resolve_kind(&config).unwrap(),
            ProviderKind::Default
        );
    }

    #[test]
    fn test_client_secret_names_missing_variable() {
        let mut config = sp_config();
        config.auth_method = AuthMethod::ClientSecret;
        config.client_id.clear();

        let err = AuthProviderFactory::resolve_kind(&config).unwrap_err();
        assert!(err.to_string().contains("AZURE_CLIENT_ID"));
    }

    #[test]
    fn test_service_principal_provider_reports_ids() {
        let provider = ClientSecretProvider::new(
            "tenant".to_string(),
            "client".to_string(),
            "secret".to_string(),
        )
        .unwrap();
        assert_eq!(provider.get_tenant_id().as_deref(), Some("tenant"));
        assert_eq!(provider.get_client_id().as_deref(), Some("client"));
    }
}
