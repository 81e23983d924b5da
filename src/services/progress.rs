use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::services::queue::{JobQueue, JobUpdate};

/// How often the estimator publishes a fresh value.
const REPORT_INTERVAL: Duration = Duration::from_secs(2);

/// Periodic progress estimator for one long pipeline stage.
///
/// Publishes `base + span * min(elapsed / estimate, 1.0)` every tick, so the
/// bar keeps moving while a multi-model fan-out is in flight. The value is an
/// extrapolation from a fixed duration estimate and carries no accuracy
/// guarantee; it is capped at `base + span`, below the stage's next hard
/// checkpoint. Purely cosmetic: it never blocks or gates the real work.
///
/// The owning stage must call [`ProgressReporter::finish`] before writing its
/// own authoritative progress, otherwise a stale estimate could land after
/// the real value.
pub struct ProgressReporter {
    handle: JoinHandle<()>,
    token: CancellationToken,
}

impl ProgressReporter {
    pub fn spawn(
        queue: Arc<JobQueue>,
        job_id: Uuid,
        base: u8,
        span: u8,
        estimate: Duration,
        message: String,
    ) -> Self {
        let token = CancellationToken::new();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(REPORT_INTERVAL);

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let fraction =
                            (started.elapsed().as_secs_f64() / estimate.as_secs_f64()).min(1.0);
                        let estimated = base.saturating_add((span as f64 * fraction) as u8);
                        if queue
                            .update(job_id, JobUpdate::progress(estimated, message.clone()))
                            .await
                            .is_err()
                        {
                            tracing::warn!(job_id = %job_id, "Progress estimate write failed, stopping reporter");
                            break;
                        }
                    }
                }
            }
        });

        Self { handle, token }
    }

    /// Stop the estimator and wait for it to exit.
    pub async fn finish(self) {
        self.token.cancel();
        let _ = self.handle.await;
    }
}
