use backoff::{backoff::Backoff, ExponentialBackoffBuilder};
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::error::{CreatorError, Result};
use crate::metrics::{Metrics, Timer};

/// Backoff policy for idempotent RPC reads. Transactions are never retried.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_millis(200),
            max_interval: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }
}

pub async fn with_retry<T, F, Fut>(method: &str, operation: F, config: &RetryConfig) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut backoff = ExponentialBackoffBuilder::new()
        .with_initial_interval(config.initial_interval)
        .with_max_interval(config.max_interval)
        .with_multiplier(config.multiplier)
        .with_max_elapsed_time(Some(config.max_interval * config.max_attempts.max(1)))
        .build();

    let timer = Timer::new();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                Metrics::record_rpc_call(method, true, timer.elapsed());
                return Ok(value);
            }
            Err(e) => {
                if attempt >= config.max_attempts {
                    Metrics::record_rpc_call(method, false, timer.elapsed());
                    return Err(e);
                }

                let next_backoff = backoff
                    .next_backoff()
                    .ok_or_else(|| CreatorError::RPC(format!("{}: retry limit exceeded", method)))?;

                warn!(method, attempt, error = %e, delay = ?next_backoff, "RPC call failed, retrying");
                sleep(next_backoff).await;
            }
        }
    }
}
