use std::time::Duration;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use super::traits::{Job, QueueProvider};
use super::{JobError, JobOpts};

/// Interval scheduling on top of any [`QueueProvider`].
///
/// The scheduler serializes each job once and enqueues a fresh
/// [`JobEntry`](super::JobEntry) on every trigger. Actual execution still
/// happens on a [`Worker`](super::Worker).
///
/// ```ignore
/// let mut scheduler = Scheduler::new(queue.clone()).await?;
/// scheduler.repeat(Duration::from_secs(60), PromoteDueCampaigns::new()).await?;
/// scheduler.start().await?;
/// ```
pub struct Scheduler<Q: QueueProvider> {
    queue: Q,
    inner: JobScheduler,
}

impl<Q: QueueProvider> Scheduler<Q> {
    pub async fn new(queue: Q) -> Result<Self, JobError> {
        let inner = JobScheduler::new().await?;
        Ok(Self { queue, inner })
    }

    /// Enqueue a job at a fixed interval.
    pub async fn repeat<J: Job>(
        &mut self,
        interval: impl TryInto<Duration>,
        job: J,
    ) -> Result<(), JobError> {
        let interval = interval.try_into().map_err(|_| JobError::InvalidDuration)?;

        let payload = serde_json::to_value(&job)?;
        let job_type = J::JOB_TYPE;
        let queue = self.queue.clone();

        let repeated_job = CronJob::new_repeated_async(interval, move |_uuid, _lock| {
            let payload = payload.clone();
            let queue = queue.clone();
            Box::pin(async move {
                let entry = super::build_entry(job_type, payload, &JobOpts::default());
                if let Err(e) = queue.insert(&entry).await {
                    tracing::error!(error = %e, %job_type, "failed to enqueue repeated job");
                }
            })
        })?;

        self.inner.add(repeated_job).await?;
        Ok(())
    }

    /// Start the scheduler. This must be called after registering all
    /// repeated jobs.
    pub async fn start(self) -> Result<(), JobError> {
        self.inner.start().await?;
        tracing::info!("scheduler running");
        Ok(())
    }
}
