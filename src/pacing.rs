//! Fixed delays between transport actions.
//!
//! The transport is a single stateful UI session that throttles or
//! flags rapid consecutive actions, and its client-side sync has no
//! completion signal. These sleeps are the only safe pacing mechanism.

use crate::config::Pacing;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct Pacer {
    initial: Duration,
    action: Duration,
    settle: Duration,
}

impl Pacer {
    pub fn new(pacing: &Pacing) -> Self {
        Self {
            initial: pacing.initial_delay(),
            action: pacing.action_delay(),
            settle: pacing.settle_delay(),
        }
    }

    /// One-time warm-up, called right after the session opens.
    pub async fn wait_initial(&self) {
        sleep(self.initial).await;
    }

    /// Called after every successful send + delivery ack.
    pub async fn wait_after_action(&self) {
        sleep(self.action).await;
    }

    /// Called once per task, whatever its outcome.
    pub async fn wait_after_task(&self) {
        sleep(self.settle).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn pacer(initial: u64, action: u64, settle: u64) -> Pacer {
        Pacer::new(&Pacing {
            initial_delay_seconds: initial,
            action_delay_seconds: action,
            settle_delay_seconds: settle,
            ack_timeout_seconds: 60,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn waits_configured_durations() {
        let pacer = pacer(5, 2, 1);

        let start = Instant::now();
        pacer.wait_initial().await;
        assert_eq!(start.elapsed(), Duration::from_secs(5));

        let start = Instant::now();
        pacer.wait_after_action().await;
        assert_eq!(start.elapsed(), Duration::from_secs(2));

        let start = Instant::now();
        pacer.wait_after_task().await;
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delays_return_immediately() {
        let pacer = pacer(0, 0, 0);
        let start = Instant::now();
        pacer.wait_initial().await;
        pacer.wait_after_action().await;
        pacer.wait_after_task().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
