use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::Instrument;

use super::entry::{JobEntry, JobStatus};
use super::registry::JobRegistry;
use super::traits::QueueProvider;
use super::JobError;

/// Generic job processor that polls any [`QueueProvider`] and dispatches
/// to handlers registered in a [`JobRegistry`].
///
/// The worker owns the state-transition logic: on success it marks the
/// entry completed with its result, on failure it marks the entry failed
/// with the error message. Jobs are never re-run.
///
/// ```ignore
/// let registry = JobRegistry::new()
///     .register::<RunCampaign<AppState>>()
///     .register::<DeliverEmail<AppState>>();
///
/// Worker::new(queue, registry, app_state)
///     .concurrency(8)
///     .poll_interval(Duration::from_millis(500))
///     .start();
/// ```
pub struct Worker<Q: QueueProvider, S: Send + Sync + 'static> {
    queue: Q,
    registry: Arc<JobRegistry<S>>,
    ctx: Arc<S>,
    concurrency: usize,
    poll_interval: Duration,
    worker_id: String,
}

impl<Q: QueueProvider, S: Send + Sync + 'static> Worker<Q, S> {
    pub fn new(queue: Q, registry: JobRegistry<S>, ctx: S) -> Self {
        Self {
            queue,
            registry: Arc::new(registry),
            ctx: Arc::new(ctx),
            concurrency: 4,
            poll_interval: Duration::from_secs(1),
            worker_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Maximum number of jobs processed in parallel (default: 4).
    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    /// How often to poll when idle (default: 1s). Backs off slightly during
    /// idle streaks.
    pub fn poll_interval(mut self, d: Duration) -> Self {
        self.poll_interval = d;
        self
    }

    /// Claim and run a single eligible job to completion on the current
    /// task. Returns `Ok(false)` when no eligible job exists.
    ///
    /// This is the synchronous-execution hook: tests (or embedded callers)
    /// drive the queue to quiescence with
    /// `while worker.process_next().await? {}` instead of spawning the
    /// polling loop.
    pub async fn process_next(&self) -> Result<bool, JobError> {
        match self.queue.claim_next(&self.worker_id).await? {
            Some(entry) => {
                run_entry(&self.queue, &self.registry, self.ctx.clone(), entry).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Start the worker loop. Spawns a background tokio task and returns
    /// immediately.
    pub fn start(self) {
        let queue = self.queue;
        let registry = self.registry;
        let ctx = self.ctx;
        let concurrency = self.concurrency;
        let poll_interval = self.poll_interval;
        let worker_id = self.worker_id;

        tokio::spawn(async move {
            let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency));
            let mut idle_streak: u32 = 0;

            loop {
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    break;
                };

                let entry = match queue.claim_next(&worker_id).await {
                    Ok(Some(e)) => e,
                    Ok(None) => {
                        drop(permit);
                        idle_streak = idle_streak.saturating_add(1);
                        let backoff = poll_interval
                            .mul_f64((1.5_f64).min(1.0 + idle_streak as f64 * 0.1));
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    Err(e) => {
                        drop(permit);
                        tracing::error!(error = %e, "failed to poll queue");
                        tokio::time::sleep(poll_interval).await;
                        continue;
                    }
                };

                idle_streak = 0;

                let queue2 = queue.clone();
                let registry2 = registry.clone();
                let ctx2 = ctx.clone();

                tokio::spawn(async move {
                    let _permit = permit;
                    run_entry(&queue2, &registry2, ctx2, entry).await;
                });
            }
        });

        tracing::info!("worker running");
    }
}

/// Execute one claimed entry and write its terminal state back to the queue.
async fn run_entry<Q: QueueProvider, S: Send + Sync + 'static>(
    queue: &Q,
    registry: &JobRegistry<S>,
    ctx: Arc<S>,
    mut entry: JobEntry,
) {
    let job_id = entry.id;
    let job_type = entry.job_type.clone();

    let span = tracing::info_span!("job", %job_id, %job_type);
    let outcome = registry
        .dispatch(&job_type, entry.payload.clone(), ctx)
        .instrument(span)
        .await;

    entry.completed_at = Some(OffsetDateTime::now_utc());

    match outcome {
        None => {
            tracing::error!(%job_id, %job_type, "no handler registered");
            entry.status = JobStatus::Failed;
            entry.last_error = Some("unknown job type".to_string());
        }
        Some(Ok(result)) => {
            tracing::info!(%job_id, %job_type, "job completed");
            entry.status = JobStatus::Completed;
            entry.result = result;
        }
        Some(Err(e)) => {
            let error_msg = e.to_string();
            tracing::error!(%job_id, %job_type, %error_msg, "job failed");
            entry.status = JobStatus::Failed;
            entry.last_error = Some(error_msg);
        }
    }

    if let Err(e) = queue.update(&entry).await {
        tracing::error!(%job_id, error = %e, "failed to persist job outcome");
    }
}
