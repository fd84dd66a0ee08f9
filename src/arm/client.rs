//! Azure Resource Manager REST client
//!
//! Thin authenticated wrapper over the ARM REST surface shared by every
//! resource area. Handles bearer tokens, error bodies, transient retries
//! and long-running operation completion.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};
use uuid::Uuid;

use super::lro::{
    operation_error_message, provisioning_state, retry_after, select_strategy, LroOptions,
    OperationStatus, PollStrategy,
};
use crate::auth::provider::AzureAuthProvider;
use crate::config::Config;
use crate::error::{AzmError, Result};
use crate::utils::network::{classify_network_error, create_http_client, NetworkConfig};
use crate::utils::retry::{retry_with_backoff, AttemptError, RetryOptions};

const CLIENT_REQUEST_ID: &str = "x-ms-client-request-id";

/// One page of an ARM list response
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Page<T> {
    #[serde(default)]
    value: Vec<T>,
    #[serde(default, rename = "nextLink")]
    next_link: Option<String>,
}

/// A request that has been accepted by ARM but may still be running
#[derive(Debug, Clone)]
pub struct PendingOperation {
    pub method: Method,
    pub url: String,
    pub strategy: PollStrategy,
    pub first_delay: Option<std::time::Duration>,
    pub body: Value,
}

impl PendingOperation {
    pub fn is_done(&self) -> bool {
        self.strategy == PollStrategy::Done
    }
}

/// Names the resource a request addresses, for error messages
#[derive(Debug, Clone, Copy)]
pub struct ResourceRef<'a> {
    pub kind: &'a str,
    pub name: &'a str,
}

impl<'a> ResourceRef<'a> {
    pub fn new(kind: &'a str, name: &'a str) -> Self {
        Self { kind, name }
    }
}

/// Map a non-success ARM response to an error
pub fn error_from_response(status: u16, body: &str, resource: ResourceRef<'_>) -> AzmError {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    let code = error
        .and_then(|e| e.get("code"))
        .and_then(|c| c.as_str())
        .unwrap_or("");
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(|m| m.to_string())
        .unwrap_or_else(|| body.trim().to_string());

    let conflict_code = code.ends_with("AlreadyExists")
        || code == "StorageAccountAlreadyTaken"
        || code == "ServerAlreadyExists"
        || code == "Conflict";

    match status {
        404 => AzmError::not_found(resource.kind, resource.name),
        409 => AzmError::exists(resource.kind, resource.name, message),
        _ if conflict_code => AzmError::exists(resource.kind, resource.name, message),
        _ => {
            let code = if code.is_empty() { "Unknown" } else { code };
            AzmError::azure_api(format!("HTTP {} ({}): {}", status, code, message))
        }
    }
}

/// Authenticated ARM client bound to one subscription
pub struct ArmClient {
    auth_provider: Arc<dyn AzureAuthProvider>,
    http_client: Client,
    subscription_id: String,
    endpoint: String,
    retry_options: RetryOptions,
    lro_options: LroOptions,
}

impl ArmClient {
    pub fn new(
        auth_provider: Arc<dyn AzureAuthProvider>,
        subscription_id: String,
        endpoint: &str,
    ) -> Result<Self> {
        let http_client = create_http_client(&NetworkConfig::default())?;

        Ok(Self {
            auth_provider,
            http_client,
            subscription_id,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            retry_options: RetryOptions::default(),
            lro_options: LroOptions::default(),
        })
    }

    /// Build a client from loaded configuration
    pub fn from_config(auth_provider: Arc<dyn AzureAuthProvider>, config: &Config) -> Result<Self> {
        Ok(Self::new(
            auth_provider,
            config.subscription_id.clone(),
            &config.management_endpoint,
        )?
        .with_lro_options(LroOptions {
            poll_interval: config.operations.poll_interval(),
            timeout: config.operations.lro_timeout(),
        }))
    }

    pub fn with_retry_options(mut self, options: RetryOptions) -> Self {
        self.retry_options = options;
        self
    }

    pub fn with_lro_options(mut self, options: LroOptions) -> Self {
        self.lro_options = options;
        self
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// `/subscriptions/{id}{suffix}`
    pub fn subscription_path(&self, suffix: &str) -> String {
        format!("/subscriptions/{}{}", self.subscription_id, suffix)
    }

    /// `/subscriptions/{id}/resourceGroups/{rg}/providers/{provider_path}`
    pub fn resource_group_path(&self, resource_group: &str, provider_path: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}",
            self.subscription_id, resource_group, provider_path
        )
    }

    /// Full URL for an ARM path with its api-version
    pub fn url(&self, path: &str, api_version: &str) -> String {
        let separator = if path.contains('?') { '&' } else { '?' };
        format!(
            "{}{}{}api-version={}",
            self.endpoint, path, separator, api_version
        )
    }

    fn scope(&self) -> String {
        format!("{}/.default", self.endpoint)
    }

    async fn create_headers(&self) -> Result<HeaderMap> {
        let scope = self.scope();
        let token = self.auth_provider.get_token(&[scope.as_str()]).await?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token.token.secret())).map_err(|e| {
                AzmError::authentication(format!("Invalid token format: {}", e))
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(request_id) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
            headers.insert(CLIENT_REQUEST_ID, request_id);
        }
        Ok(headers)
    }

    async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Response> {
        let headers = self.create_headers().await?;
        debug!("{} {}", method, url);

        let mut request = self.http_client.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.json(body);
        }

        request
            .send()
            .await
            .map_err(|e| classify_network_error(&e, url))
    }

    /// Send and map non-success statuses, retrying transient failures
    async fn send_checked(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        resource: ResourceRef<'_>,
    ) -> Result<(u16, HeaderMap, Value)> {
        retry_with_backoff(
            || {
                let method = method.clone();
                async move {
                    let response = self.send(method, url, body).await?;
                    let server_delay = retry_after(response.headers());
                    read_response(response, url, resource)
                        .await
                        .map_err(|error| AttemptError::with_retry_after(error, server_delay))
                }
            },
            self.retry_options.clone(),
        )
        .await
    }

    /// GET a resource and deserialize it
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
        resource: ResourceRef<'_>,
    ) -> Result<T> {
        let url = self.url(path, api_version);
        let (_, _, body) = self.send_checked(Method::GET, &url, None, resource).await?;
        deserialize(body, resource)
    }

    /// GET a collection, following `nextLink` until exhausted
    pub async fn list_json<T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
        resource: ResourceRef<'_>,
    ) -> Result<Vec<T>> {
        let mut next = Some(self.url(path, api_version));
        let mut items = Vec::new();

        while let Some(url) = next.take() {
            let (_, _, body) = self.send_checked(Method::GET, &url, None, resource).await?;
            let page: Page<T> = deserialize(body, resource)?;
            items.extend(page.value);
            next = page.next_link.filter(|link| !link.is_empty());
        }

        Ok(items)
    }

    /// HEAD a resource: 2xx means it exists, 404 that it does not
    pub async fn exists(&self, path: &str, api_version: &str, resource: ResourceRef<'_>) -> Result<bool> {
        let url = self.url(path, api_version);
        match self.send_checked(Method::HEAD, &url, None, resource).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// POST an action that answers synchronously with JSON
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
        body: &Value,
        resource: ResourceRef<'_>,
    ) -> Result<T> {
        let url = self.url(path, api_version);
        let (_, _, response) = self
            .send_checked(Method::POST, &url, Some(body), resource)
            .await?;
        deserialize(response, resource)
    }

    /// Send a request that may start a long-running operation
    async fn start(
        &self,
        method: Method,
        path: &str,
        api_version: &str,
        body: Option<&Value>,
        resource: ResourceRef<'_>,
    ) -> Result<PendingOperation> {
        let url = self.url(path, api_version);
        let (status, headers, initial) = self
            .send_checked(method.clone(), &url, body, resource)
            .await?;
        let strategy = select_strategy(&method, status, &headers, &initial);

        Ok(PendingOperation {
            method,
            url,
            strategy,
            first_delay: retry_after(&headers),
            body: initial,
        })
    }

    /// PUT a resource without waiting for provisioning to finish
    pub async fn put_json(
        &self,
        path: &str,
        api_version: &str,
        body: &Value,
        resource: ResourceRef<'_>,
    ) -> Result<PendingOperation> {
        self.start(Method::PUT, path, api_version, Some(body), resource)
            .await
    }

    /// DELETE a resource without waiting for removal
    pub async fn delete(
        &self,
        path: &str,
        api_version: &str,
        resource: ResourceRef<'_>,
    ) -> Result<PendingOperation> {
        self.start(Method::DELETE, path, api_version, None, resource)
            .await
    }

    /// POST an action (start, powerOff, ...) without waiting
    pub async fn post(
        &self,
        path: &str,
        api_version: &str,
        resource: ResourceRef<'_>,
    ) -> Result<PendingOperation> {
        self.start(Method::POST, path, api_version, None, resource)
            .await
    }

    /// Poll a started operation until it reaches a terminal state
    pub async fn wait_for(&self, pending: &PendingOperation, resource: ResourceRef<'_>) -> Result<()> {
        self.wait(
            &pending.method,
            pending.strategy.clone(),
            &pending.url,
            pending.first_delay,
            resource,
        )
        .await
    }

    /// PUT a resource and wait until it is provisioned; returns the final resource
    pub async fn put_and_wait<T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
        body: &Value,
        resource: ResourceRef<'_>,
    ) -> Result<T> {
        let pending = self.put_json(path, api_version, body, resource).await?;
        if pending.is_done() && !pending.body.is_null() {
            return deserialize(pending.body, resource);
        }

        self.wait_for(&pending, resource).await?;
        self.get_json(path, api_version, resource).await
    }

    /// DELETE a resource and wait until it is gone
    pub async fn delete_and_wait(
        &self,
        path: &str,
        api_version: &str,
        resource: ResourceRef<'_>,
    ) -> Result<()> {
        let pending = self.delete(path, api_version, resource).await?;
        self.wait_for(&pending, resource).await
    }

    /// POST an action and wait for it to finish
    pub async fn post_and_wait(
        &self,
        path: &str,
        api_version: &str,
        resource: ResourceRef<'_>,
    ) -> Result<()> {
        let pending = self.post(path, api_version, resource).await?;
        self.wait_for(&pending, resource).await
    }

    async fn wait(
        &self,
        method: &Method,
        strategy: PollStrategy,
        resource_url: &str,
        first_delay: Option<std::time::Duration>,
        resource: ResourceRef<'_>,
    ) -> Result<()> {
        if strategy == PollStrategy::Done {
            return Ok(());
        }

        let operation = format!("{} {} '{}'", method, resource.kind, resource.name);
        let deadline = Instant::now() + self.lro_options.timeout;
        let mut delay = first_delay.unwrap_or(self.lro_options.poll_interval);
        info!("Waiting for {} to complete...", operation);

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(AzmError::timeout(format!(
                    "{} did not complete within {}s",
                    operation,
                    self.lro_options.timeout.as_secs()
                )));
            }
            // Never sleep past the deadline, so there is always one last poll
            sleep(delay.min(deadline - now)).await;

            let (next_delay, status) = match &strategy {
                PollStrategy::AsyncOperation(monitor_url) => {
                    let (_, headers, body) = self
                        .send_checked(Method::GET, monitor_url, None, resource)
                        .await?;
                    let status = body
                        .get("status")
                        .and_then(|s| s.as_str())
                        .map(OperationStatus::parse)
                        .unwrap_or_else(|| OperationStatus::InProgress("Unknown".to_string()));
                    if matches!(status, OperationStatus::Failed | OperationStatus::Canceled) {
                        return Err(AzmError::operation_failed(
                            operation,
                            status.as_str(),
                            operation_error_message(&body),
                        ));
                    }
                    (retry_after(&headers), status)
                }
                PollStrategy::Location(location_url) => {
                    let (code, headers, _) = self
                        .send_checked(Method::GET, location_url, None, resource)
                        .await?;
                    let status = if code == 202 {
                        OperationStatus::InProgress("Accepted".to_string())
                    } else {
                        OperationStatus::Succeeded
                    };
                    (retry_after(&headers), status)
                }
                PollStrategy::ProvisioningState => {
                    match self
                        .send_checked(Method::GET, resource_url, None, resource)
                        .await
                    {
                        Err(e) if e.is_not_found() && *method == Method::DELETE => {
                            (None, OperationStatus::Succeeded)
                        }
                        Err(e) => return Err(e),
                        Ok((_, headers, body)) => {
                            let status = provisioning_state(&body)
                                .map(OperationStatus::parse)
                                .unwrap_or_else(|| {
                                    if *method == Method::DELETE {
                                        OperationStatus::InProgress("Deleting".to_string())
                                    } else {
                                        OperationStatus::Succeeded
                                    }
                                });
                            if matches!(status, OperationStatus::Failed | OperationStatus::Canceled) {
                                return Err(AzmError::operation_failed(
                                    operation,
                                    status.as_str(),
                                    format!("provisioningState is {}", status.as_str()),
                                ));
                            }
                            (retry_after(&headers), status)
                        }
                    }
                }
                PollStrategy::Done => return Ok(()),
            };

            if status.is_terminal() {
                debug!("{} finished with {}", operation, status.as_str());
                return Ok(());
            }

            debug!("{} still {}", operation, status.as_str());
            delay = next_delay.unwrap_or(self.lro_options.poll_interval);
        }
    }
}

async fn read_response(
    response: Response,
    url: &str,
    resource: ResourceRef<'_>,
) -> Result<(u16, HeaderMap, Value)> {
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let text = response
        .text()
        .await
        .map_err(|e| classify_network_error(&e, url))?;

    if !(200..300).contains(&status) {
        return Err(error_from_response(status, &text, resource));
    }

    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).map_err(|e| {
            AzmError::serialization(format!(
                "Failed to parse response for {} '{}': {}",
                resource.kind, resource.name, e
            ))
        })?
    };

    Ok((status, headers, body))
}

fn deserialize<T: DeserializeOwned>(body: Value, resource: ResourceRef<'_>) -> Result<T> {
    serde_json::from_value(body).map_err(|e| {
        AzmError::serialization(format!(
            "Unexpected response shape for {} '{}': {}",
            resource.kind, resource.name, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_mapping() {
        let body = r#"{"error":{"code":"ResourceNotFound","message":"gone"}}"#;
        let err = error_from_response(404, body, ResourceRef::new("Virtual machine", "MyVM"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_conflict_mapping() {
        let body = r#"{"error":{"code":"StorageAccountAlreadyTaken","message":"The storage account named x is already taken."}}"#;
        let err = error_from_response(409, body, ResourceRef::new("Storage account", "x"));
        match err {
            AzmError::ResourceExists { message, .. } => assert!(message.contains("already taken")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_page_of_items_without_default() {
        #[derive(Debug, Deserialize)]
        struct Item {
            name: String,
        }

        let page: Page<Item> = serde_json::from_str(
            r#"{"value":[{"name":"Standard_B1s"}],"nextLink":"https://management.azure.com/next"}"#,
        )
        .unwrap();
        assert_eq!(page.value[0].name, "Standard_B1s");
        assert_eq!(page.next_link.as_deref(), Some("https://management.azure.com/next"));

        let last: Page<Item> = serde_json::from_str("{}").unwrap();
        assert!(last.value.is_empty());
        assert!(last.next_link.is_none());
    }

    #[test]
    fn test_any_conflict_status_is_resource_exists() {
        let body = r#"{"error":{"code":"PropertyChangeNotAllowed","message":"Changing property 'osDisk.name' is not allowed."}}"#;
        let err = error_from_response(409, body, ResourceRef::new("Virtual machine", "MyVM"));
        assert!(err.is_conflict());
        assert_eq!(
            err.to_string(),
            "Virtual machine 'MyVM' already exists: Changing property 'osDisk.name' is not allowed."
        );
    }

    #[test]
    fn test_generic_mapping_keeps_status_and_code() {
        let body = r#"{"error":{"code":"SkuNotAvailable","message":"Standard_B1s is not available"}}"#;
        let err = error_from_response(400, body, ResourceRef::new("Virtual machine", "MyVM"));
        assert_eq!(
            err.to_string(),
            "Azure API error: HTTP 400 (SkuNotAvailable): Standard_B1s is not available"
        );
    }

    #[test]
    fn test_non_json_body() {
        let err = error_from_response(502, "Bad Gateway", ResourceRef::new("Subnet", "MySubnet"));
        assert_eq!(err.to_string(), "Azure API error: HTTP 502 (Unknown): Bad Gateway");
        assert!(crate::utils::network::is_retryable_error(&err));
    }
}
