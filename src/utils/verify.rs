//! Post-create verification polling
//!
//! ARM can acknowledge a create before the resource is readable. These
//! helpers re-read a resource until it shows up.

use crate::error::{AzmError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct VerifyOptions {
    pub attempts: usize,
    pub interval: Duration,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval: Duration::from_secs(5),
        }
    }
}

/// Re-run `fetch` while it reports `ResourceNotFound`.
///
/// Any other error is returned immediately. When every attempt misses,
/// the result is `VerificationFailed`.
pub async fn verify_exists<T, F, Fut>(
    kind: &str,
    name: &str,
    options: &VerifyOptions,
    mut fetch: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for attempt in 1..=options.attempts {
        match fetch().await {
            Ok(resource) => {
                info!("{} '{}' has been created successfully.", kind, name);
                return Ok(resource);
            }
            Err(err) if err.is_not_found() => {
                warn!("{} '{}' not found yet. Retrying...", kind, name);
                if attempt < options.attempts {
                    sleep(options.interval).await;
                }
            }
            Err(err) => return Err(err),
        }
    }

    Err(AzmError::verification_failed(kind, name, options.attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quick(attempts: usize) -> VerifyOptions {
        VerifyOptions {
            attempts,
            interval: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_found_after_misses() {
        let calls = AtomicUsize::new(0);
        let value = verify_exists("Virtual machine", "MyVM", &quick(10), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 3 {
                Err(AzmError::not_found("Virtual machine", "MyVM"))
            } else {
                Ok(42)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_verification_failure() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = verify_exists("SQL Server", "myserverabc123", &quick(4), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AzmError::not_found("SQL Server", "myserverabc123"))
        })
        .await;

        match result {
            Err(AzmError::VerificationFailed { attempts, name, .. }) => {
                assert_eq!(attempts, 4);
                assert_eq!(name, "myserverabc123");
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_other_errors_stop_immediately() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = verify_exists("Public IP address", "MyPublicIP", &quick(10), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AzmError::authentication("token expired"))
        })
        .await;

        assert!(matches!(result, Err(AzmError::AuthenticationError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
