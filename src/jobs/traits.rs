use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use super::entry::JobEntry;
use super::JobError;

/// A serializable job with typed execution logic.
///
/// Implement this trait for each job type in your application. The job's
/// fields become the serialized payload, and `perform` defines the
/// execution logic.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct SendWelcome { to: String }
///
/// #[async_trait]
/// impl Job for SendWelcome {
///     const JOB_TYPE: &'static str = "send_welcome";
///     type Context = AppState;
///
///     async fn perform(self, ctx: &AppState) -> JobResult {
///         ctx.mailer.send(&welcome_email(&self.to)).await?;
///         Ok(None)
///     }
/// }
/// ```
#[async_trait]
pub trait Job: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Unique identifier for this job type (e.g. `"deliver_email"`).
    const JOB_TYPE: &'static str;

    /// Application state provided at execution time.
    type Context: Send + Sync + 'static;

    /// Execute the job. Return `Ok(Some(value))` to store an outcome for
    /// observability, or `Ok(None)` when there is nothing to record.
    ///
    /// An `Err` marks the entry failed; it is never re-run.
    async fn perform(
        self,
        ctx: &Self::Context,
    ) -> Result<Option<serde_json::Value>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Convenience alias for the return type of [`Job::perform`].
pub type JobResult = Result<Option<serde_json::Value>, Box<dyn std::error::Error + Send + Sync>>;

/// Backend-agnostic queue storage.
///
/// Implement this trait to plug in any persistence layer (in-memory,
/// Postgres, Redis, SQS, etc.). The [`Worker`](super::Worker) polls a
/// `QueueProvider`, handles the state transitions, and calls `update` with
/// the modified entry.
#[async_trait]
pub trait QueueProvider: Send + Sync + Clone + 'static {
    /// Insert a new job entry into the queue.
    async fn insert(&self, entry: &JobEntry) -> Result<(), JobError>;

    /// Atomically claim the next eligible job (status=pending, run_at <= now).
    ///
    /// The implementation must:
    /// - Select a pending job with `run_at <= now`
    /// - Set `status` to `Running`, `locked_at` to now, and `locked_by` to
    ///   the worker id
    /// - Return `None` when no eligible jobs exist
    ///
    /// For Postgres, this is the `SELECT ... FOR UPDATE SKIP LOCKED` pattern.
    async fn claim_next(&self, worker_id: &str) -> Result<Option<JobEntry>, JobError>;

    /// Persist an updated job entry. The [`Worker`](super::Worker) sets all
    /// fields (status, result, timestamps, etc.) before calling this — the
    /// implementation only needs to write the entry back by id.
    async fn update(&self, entry: &JobEntry) -> Result<(), JobError>;
}
