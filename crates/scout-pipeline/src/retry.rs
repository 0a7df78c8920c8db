//! Bounded retries with linear backoff for calls to external services.

use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
  /// Total attempts including the first; values below 1 are treated as 1.
  pub max_attempts: u32,
  /// Delay before attempt `n + 1` is `n * backoff_ms`.
  pub backoff_ms:   u64,
}

impl Default for RetryPolicy {
  fn default() -> Self { Self { max_attempts: 3, backoff_ms: 500 } }
}

impl RetryPolicy {
  fn delay_after(&self, attempt: u32) -> Duration {
    Duration::from_millis(self.backoff_ms.saturating_mul(u64::from(attempt)))
  }
}

/// Call `op` until it succeeds or the policy's attempts are used up.
///
/// The last failure is surfaced as [`Error::RetriesExhausted`].
pub async fn with_retry<T, E, F, Fut>(label: &str, policy: &RetryPolicy, mut op: F) -> Result<T>
where
  E: std::error::Error + Send + Sync + 'static,
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, E>>,
{
  let max_attempts = policy.max_attempts.max(1);
  let mut attempt = 1;
  loop {
    match op().await {
      Ok(value) => return Ok(value),
      Err(e) if attempt >= max_attempts => {
        return Err(Error::RetriesExhausted {
          label:    label.to_owned(),
          attempts: attempt,
          source:   Box::new(e),
        });
      }
      Err(e) => {
        let delay = policy.delay_after(attempt);
        warn!(label, attempt, error = %e, delay_ms = delay.as_millis() as u64, "attempt failed; retrying");
        tokio::time::sleep(delay).await;
        attempt += 1;
      }
    }
  }
}
