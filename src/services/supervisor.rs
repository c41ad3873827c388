//! Restart loop for long-running background tasks

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, warn};

/// Exponential restart delay: `base * 2^min(restarts, 5)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

impl RestartPolicy {
    pub fn delay(&self, restart_count: u32) -> Duration {
        self.base
            .saturating_mul(2u32.saturating_pow(restart_count.min(5)))
            .min(self.max)
    }
}

/// Runs the task produced by `run` forever, restarting it with backoff
/// whenever it returns, fails or panics.
pub async fn supervise<F, Fut, E>(task: &'static str, policy: RestartPolicy, mut run: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let mut restart_count: u32 = 0;
    loop {
        match tokio::spawn(run()).await {
            Ok(Ok(())) => warn!(task, "task stopped; restarting"),
            Ok(Err(err)) => error!(task, error = %err, "task failed; restarting"),
            Err(join_error) if join_error.is_panic() => error!(task, "task panicked; restarting"),
            Err(join_error) => error!(task, error = %join_error, "task aborted; restarting"),
        }

        let backoff = policy.delay(restart_count);
        restart_count = restart_count.saturating_add(1);
        warn!(
            task,
            restart_count,
            backoff_ms = backoff.as_millis() as u64,
            "task restart backoff"
        );
        sleep(backoff).await;
    }
}
