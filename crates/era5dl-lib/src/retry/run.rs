use super::policy::RetryPolicy;
use super::sleeper::Sleeper;
use std::fmt::Display;
use std::future::Future;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Succeeded<T> {
    pub value: T,
    pub attempts: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("gave up after {attempts} attempts: {last_error}")]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Runs `op` until it succeeds or `policy.max_attempts` attempts have failed.
///
/// `op` receives the 1-based attempt number. Between attempts the task waits
/// for [`RetryPolicy::backoff_delay`] on `sleeper`.
pub async fn run_with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut op: F,
) -> Result<Succeeded<T>, Exhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(Succeeded { value, attempts: attempt }),
            Err(err) => {
                warn!(
                    "Attempt {}/{} failed: {}",
                    attempt, max_attempts, err
                );
                if attempt >= max_attempts {
                    return Err(Exhausted {
                        attempts: attempt,
                        last_error: err,
                    });
                }

                let delay = policy.backoff_delay(attempt, &mut rand::rng());
                info!(wait_secs = delay.as_secs(), "Retrying in {}s...", delay.as_secs());
                sleeper.sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
