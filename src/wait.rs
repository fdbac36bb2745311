//! Polling helpers

use std::future::Future;

use crate::config::PollPolicy;

/// Returned when a poll runs out of time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTimeout;

/// Evaluate `condition` immediately and then every `policy.interval` until
/// it returns true or `policy.timeout` elapses.
pub async fn poll_immediate<F, Fut>(policy: &PollPolicy, mut condition: F) -> Result<(), PollTimeout>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + policy.timeout;

    loop {
        if condition().await {
            return Ok(());
        }
        if tokio::time::Instant::now() + policy.interval > deadline {
            return Err(PollTimeout);
        }
        tokio::time::sleep(policy.interval).await;
    }
}
