//! Termination flag and idle wait loop

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Smallest poll interval the idle loop will use.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Process-wide termination request.
///
/// Cloning shares the flag. Hand one clone to whatever raises the request
/// (an interrupt listener, a test) and another to the idle loop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request termination. Returns `true` for the first request.
    pub fn trigger(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Set the flag when the process receives an interrupt (Ctrl+C).
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn listen_for_interrupt(&self) -> JoinHandle<()> {
        let signal = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received");
                    signal.trigger();
                }
                Err(err) => error!("Failed to listen for interrupt signal: {err}"),
            }
        })
    }

    /// Idle until the flag is set, checking it every `poll_interval`.
    ///
    /// The loop does no work of its own. Once the flag is set it returns
    /// within one poll interval.
    pub async fn wait(&self, poll_interval: Duration) {
        let poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        while !self.is_triggered() {
            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn first_trigger_wins() {
        let signal = ShutdownSignal::new();
        let observer = signal.clone();
        assert!(!observer.is_triggered());
        assert!(signal.trigger());
        assert!(!signal.trigger());
        assert!(observer.is_triggered());
    }

    #[tokio::test]
    async fn returns_immediately_when_already_triggered() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        tokio::time::timeout(Duration::from_millis(50), signal.wait(Duration::from_secs(10)))
            .await
            .expect("wait should not sleep once triggered");
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_latency_is_bounded_by_poll_interval() {
        for poll_ms in [10u64, 100, 1000] {
            let poll = Duration::from_millis(poll_ms);
            let trigger_after = poll * 2 + poll / 3;
            let signal = ShutdownSignal::new();

            let trigger = signal.clone();
            tokio::spawn(async move {
                tokio::time::sleep(trigger_after).await;
                trigger.trigger();
            });

            let start = Instant::now();
            signal.wait(poll).await;
            let elapsed = start.elapsed();

            assert!(elapsed >= trigger_after, "returned before trigger at {poll_ms}ms");
            assert!(
                elapsed - trigger_after <= poll,
                "latency {:?} exceeded poll interval {poll_ms}ms",
                elapsed - trigger_after
            );
        }
    }
}
