//! Periodic background maintenance (job retention, cache expiry).

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// A task that runs `tick` every `interval` until shut down or dropped.
///
/// The first run happens one full interval after spawning.
#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    join: JoinHandle<()>,
}

impl PeriodicTask {
    pub fn spawn<F, Fut>(name: &'static str, interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let period = interval.max(Duration::from_millis(1));
        let join = tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // `interval` fires immediately; skip it.
            timer.tick().await;
            loop {
                timer.tick().await;
                debug!(task = name, "maintenance tick");
                tick().await;
            }
        });

        info!(task = name, interval_secs = period.as_secs_f64(), "maintenance task started");
        Self { name, join }
    }

    /// Stop the task. Any in-flight tick is cancelled.
    pub fn shutdown(self) {
        // Drop does the abort.
        info!(task = self.name, "maintenance task stopped");
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.join.abort();
    }
}
