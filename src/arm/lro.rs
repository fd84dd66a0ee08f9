//! Long-running operation tracking
//!
//! ARM answers many writes with 201/202 and leaves the caller to poll.
//! The initial response decides how: an `Azure-AsyncOperation` status
//! monitor, a `Location` URL that stops returning 202, or the resource's
//! own `provisioningState`.

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

pub const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";
pub const LOCATION: &str = "location";

const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct LroOptions {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for LroOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(1800),
        }
    }
}

/// How completion of an accepted request is observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStrategy {
    AsyncOperation(String),
    Location(String),
    ProvisioningState,
    Done,
}

/// Status reported by an operation monitor or a provisioning state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    InProgress(String),
    Succeeded,
    Failed,
    Canceled,
}

impl OperationStatus {
    pub fn parse(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::InProgress(status.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::InProgress(s) => s,
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// `properties.provisioningState` of an ARM resource body
pub fn provisioning_state(body: &Value) -> Option<&str> {
    body.get("properties")
        .and_then(|p| p.get("provisioningState"))
        .and_then(|s| s.as_str())
}

/// Pick the polling strategy from the initial response
pub fn select_strategy(method: &Method, status: u16, headers: &HeaderMap, body: &Value) -> PollStrategy {
    if let Some(url) = header_str(headers, AZURE_ASYNC_OPERATION) {
        return PollStrategy::AsyncOperation(url.to_string());
    }

    if matches!(status, 201 | 202) {
        if let Some(url) = header_str(headers, LOCATION) {
            return PollStrategy::Location(url.to_string());
        }
    }

    if *method == Method::PUT || *method == Method::PATCH {
        if let Some(state) = provisioning_state(body) {
            if !OperationStatus::parse(state).is_terminal() {
                return PollStrategy::ProvisioningState;
            }
        }
    }

    if status == 202 && *method == Method::DELETE {
        // Accepted without a monitor: watch the resource disappear
        return PollStrategy::ProvisioningState;
    }

    PollStrategy::Done
}

/// `Retry-After` in seconds, capped to keep a misbehaving server from stalling us
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    header_str(headers, RETRY_AFTER.as_str())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}

/// Error message carried by a failed operation monitor body
pub fn operation_error_message(body: &Value) -> String {
    body.get("error")
        .and_then(|e| {
            let code = e.get("code").and_then(|c| c.as_str());
            let message = e.get("message").and_then(|m| m.as_str());
            match (code, message) {
                (Some(code), Some(message)) => Some(format!("{code}: {message}")),
                (None, Some(message)) => Some(message.to_string()),
                (Some(code), None) => Some(code.to_string()),
                (None, None) => None,
            }
        })
        .unwrap_or_else(|| "no error details returned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_async_operation_header_wins() {
        let h = headers(&[
            ("azure-asyncoperation", "https://example/op/1"),
            ("location", "https://example/loc/1"),
        ]);
        assert_eq!(
            select_strategy(&Method::PUT, 201, &h, &Value::Null),
            PollStrategy::AsyncOperation("https://example/op/1".to_string())
        );
    }

    #[test]
    fn test_location_only_on_accepted() {
        let h = headers(&[("location", "https://example/loc/1")]);
        assert_eq!(
            select_strategy(&Method::POST, 202, &h, &Value::Null),
            PollStrategy::Location("https://example/loc/1".to_string())
        );
        assert_eq!(
            select_strategy(&Method::POST, 200, &h, &Value::Null),
            PollStrategy::Done
        );
    }

    #[test]
    fn test_provisioning_state_polling() {
        let creating = json!({"properties": {"provisioningState": "Creating"}});
        let done = json!({"properties": {"provisioningState": "Succeeded"}});
        let h = HeaderMap::new();

        assert_eq!(
            select_strategy(&Method::PUT, 201, &h, &creating),
            PollStrategy::ProvisioningState
        );
        assert_eq!(select_strategy(&Method::PUT, 200, &h, &done), PollStrategy::Done);
        assert_eq!(
            select_strategy(&Method::DELETE, 202, &h, &Value::Null),
            PollStrategy::ProvisioningState
        );
        assert_eq!(
            select_strategy(&Method::DELETE, 204, &h, &Value::Null),
            PollStrategy::Done
        );
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(OperationStatus::parse("Succeeded"), OperationStatus::Succeeded);
        assert_eq!(OperationStatus::parse("failed"), OperationStatus::Failed);
        assert_eq!(OperationStatus::parse("Canceled"), OperationStatus::Canceled);
        assert!(!OperationStatus::parse("InProgress").is_terminal());
        assert_eq!(OperationStatus::parse("Updating").as_str(), "Updating");
    }

    #[test]
    fn test_retry_after() {
        assert_eq!(
            retry_after(&headers(&[("retry-after", "7")])),
            Some(Duration::from_secs(7))
        );
        assert_eq!(
            retry_after(&headers(&[("retry-after", "3600")])),
            Some(Duration::from_secs(60))
        );
        assert_eq!(retry_after(&headers(&[("retry-after", "soon")])), None);
        assert_eq!(retry_after(&HeaderMap::new()), None);
    }

    #[test]
    fn test_operation_error_message() {
        let body = json!({"status": "Failed", "error": {"code": "SkuNotAvailable", "message": "Size not available"}});
        assert_eq!(operation_error_message(&body), "SkuNotAvailable: Size not available");
        assert_eq!(operation_error_message(&json!({})), "no error details returned");
    }
}
