use thiserror::Error;

/// Main error type for azmanage operations
#[derive(Debug, Error)]
pub enum AzmError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Azure API error: {0}")]
    AzureApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{kind} '{name}' not found")]
    ResourceNotFound { kind: String, name: String },

    #[error("{kind} '{name}' already exists: {message}")]
    ResourceExists {
        kind: String,
        name: String,
        message: String,
    },

    #[error("Operation '{operation}' finished with status {status}: {message}")]
    OperationFailed {
        operation: String,
        status: String,
        message: String,
    },

    #[error("{kind} '{name}' could not be verified after creation ({attempts} attempts)")]
    VerificationFailed {
        kind: String,
        name: String,
        attempts: usize,
    },

    #[error("No available VM sizes found in the specified location.")]
    NoVmSizeAvailable { location: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    #[error("DNS resolution failed for '{host}': {details}")]
    DnsResolutionError { host: String, details: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl AzmError {
    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        Self::AuthenticationError(msg.into())
    }

    pub fn azure_api<S: Into<String>>(msg: S) -> Self {
        Self::AzureApiError(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found<K: Into<String>, N: Into<String>>(kind: K, name: N) -> Self {
        Self::ResourceNotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn exists<K: Into<String>, N: Into<String>, M: Into<String>>(
        kind: K,
        name: N,
        message: M,
    ) -> Self {
        Self::ResourceExists {
            kind: kind.into(),
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn operation_failed<O: Into<String>, S: Into<String>, M: Into<String>>(
        operation: O,
        status: S,
        message: M,
    ) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            status: status.into(),
            message: message.into(),
        }
    }

    pub fn verification_failed<K: Into<String>, N: Into<String>>(
        kind: K,
        name: N,
        attempts: usize,
    ) -> Self {
        Self::VerificationFailed {
            kind: kind.into(),
            name: name.into(),
            attempts,
        }
    }

    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::NetworkError(msg.into())
    }

    pub fn connection_timeout<S: Into<String>>(msg: S) -> Self {
        Self::ConnectionTimeout(msg.into())
    }

    pub fn dns_resolution<S: Into<String>>(host: S, details: S) -> Self {
        Self::DnsResolutionError {
            host: host.into(),
            details: details.into(),
        }
    }

    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::SerializationError(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }

    /// True when the error means the addressed resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
    }

    /// True when the error is a create conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ResourceExists { .. })
    }
}

/// Result type alias for azmanage operations
pub type Result<T> = std::result::Result<T, AzmError>;

/// Convert Azure Core errors to AzmError
impl From<azure_core::Error> for AzmError {
    fn from(error: azure_core::Error) -> Self {
        Self::AzureApiError(error.to_string())
    }
}

impl From<toml::de::Error> for AzmError {
    fn from(error: toml::de::Error) -> Self {
        Self::ConfigError(format!("Invalid TOML: {error}"))
    }
}

impl From<toml::ser::Error> for AzmError {
    fn from(error: toml::ser::Error) -> Self {
        Self::SerializationError(error.to_string())
    }
}

impl From<serde_yaml::Error> for AzmError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::SerializationError(error.to_string())
    }
}

impl From<dialoguer::Error> for AzmError {
    fn from(error: dialoguer::Error) -> Self {
        Self::InvalidArgument(format!("Failed to read user input: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = AzmError::not_found("Virtual machine", "MyVM");
        assert_eq!(err.to_string(), "Virtual machine 'MyVM' not found");
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_verification_failed_display() {
        let err = AzmError::verification_failed("Public IP address", "MyPublicIP", 10);
        assert!(err.to_string().contains("could not be verified after creation"));
    }
}
