use crate::error::{AzmError, Result};
use reqwest::Client;
use std::time::Duration;

/// Configuration for HTTP client with proper timeouts and user-friendly error handling
pub struct NetworkConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            user_agent: format!("azmanage/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create a properly configured HTTP client with timeouts
pub fn create_http_client(config: &NetworkConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .user_agent(&config.user_agent)
        .build()
        .map_err(|e| AzmError::network(format!("Failed to create HTTP client: {}", e)))
}

/// Turn a transport-level reqwest failure into a user-facing error
pub fn classify_network_error(error: &reqwest::Error, url: &str) -> AzmError {
    let host = extract_host_from_url(url);

    if error.is_timeout() {
        return AzmError::connection_timeout(format!(
            "Request to '{}' timed out. This might be due to network issues or the endpoint being unreachable.",
            host
        ));
    }

    if error.is_connect() {
        if is_dns_resolution_error(error) {
            return AzmError::dns_resolution(
                host.clone(),
                format!("Unable to resolve '{}'. Please check the management endpoint and your DNS settings.", host),
            );
        }

        return AzmError::network(format!(
            "Failed to connect to '{}'. Please check your network connection.",
            host
        ));
    }

    let message = error.to_string().to_lowercase();
    if message.contains("ssl") || message.contains("tls") || message.contains("certificate") {
        return AzmError::network(format!(
            "TLS error when contacting '{}'. This may be due to certificate issues or network security policies.",
            host
        ));
    }

    if error.is_body() || error.is_decode() {
        return AzmError::network(format!(
            "Connection to '{}' was interrupted while reading the response.",
            host
        ));
    }

    AzmError::network(format!("Network error when contacting '{}': {}", host, error))
}

fn is_dns_resolution_error(error: &reqwest::Error) -> bool {
    let error_msg = error.to_string().to_lowercase();
    let dns_indicators = [
        "dns",
        "name resolution",
        "failed to lookup",
        "name or service not known",
        "nodename nor servname provided",
        "temporary failure in name resolution",
        "no such host",
        "host not found",
        "getaddrinfo failed",
        "could not resolve host",
    ];

    dns_indicators
        .iter()
        .any(|&indicator| error_msg.contains(indicator))
}

/// Host part of a URL, used to name the endpoint in error messages
pub fn extract_host_from_url(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| "unknown-host".to_string())
}

/// Check if an error is transient and worth retrying
pub fn is_retryable_error(error: &AzmError) -> bool {
    match error {
        AzmError::ConnectionTimeout(_) => true,
        AzmError::NetworkError(msg) => {
            let msg_lower = msg.to_lowercase();
            msg_lower.contains("timeout")
                || msg_lower.contains("temporar")
                || msg_lower.contains("interrupted")
        }
        AzmError::AzureApiError(msg) => {
            let msg_lower = msg.to_lowercase();
            msg_lower.contains("http 429")
                || msg_lower.contains("http 500")
                || msg_lower.contains("http 502")
                || msg_lower.contains("http 503")
                || msg_lower.contains("http 504")
                || msg_lower.contains("throttl")
                || msg_lower.contains("toomanyrequests")
        }
        AzmError::DnsResolutionError { .. } => false,
        _ => false,
    }
}
