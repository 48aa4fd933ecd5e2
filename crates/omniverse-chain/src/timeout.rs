//! Per-call deadlines.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{ChainError, Result};

/// Run a chain call with a deadline.
///
/// An elapsed deadline becomes [`ChainError::Timeout`], which is transient:
/// the call may not have reached the chain, and retrying it is safe.
pub async fn call_with_timeout<T, F>(chain: &str, timeout: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(chain, ?timeout, "chain call timed out");
            Err(ChainError::Timeout {
                chain: chain.to_string(),
                after: timeout,
            })
        }
    }
}
