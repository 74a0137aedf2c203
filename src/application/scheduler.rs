use crate::application::credit::CreditService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Recurring background task that settles due installments.
///
/// Runs one sweep immediately on startup, then once per interval. Stopping is
/// cooperative: [`PaymentScheduler::stop`] prevents the next tick and waits
/// for an in-flight sweep to finish; it never cancels a sweep midway.
pub struct PaymentScheduler {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PaymentScheduler {
    pub fn start(credits: Arc<CreditService>, interval: Duration) -> Self {
        let (shutdown, mut stopped) = watch::channel(false);

        let handle = tokio::spawn(async move {
            tracing::info!(interval = ?interval, "payment scheduler started");

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick resolves immediately: the startup sweep.
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = credits.settle_due_installments().await {
                            tracing::error!(%err, "payment sweep failed");
                        }
                    }
                    _ = stopped.changed() => {
                        tracing::info!("payment scheduler stopped");
                        return;
                    }
                }
            }
        });

        Self { shutdown, handle }
    }

    /// Signals the task to stop and waits for it to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}
