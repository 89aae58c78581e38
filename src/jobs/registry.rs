use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::traits::{Job, JobResult};

type HandlerFn<S> =
    dyn Fn(serde_json::Value, Arc<S>) -> Pin<Box<dyn Future<Output = JobResult> + Send>>
        + Send
        + Sync;

type BoxedHandler<S> = Arc<HandlerFn<S>>;

/// Maps job type strings to deserialization + execution logic.
///
/// Register each [`Job`] type before passing the registry to a
/// [`Worker`](super::Worker).
pub struct JobRegistry<S: Send + Sync + 'static> {
    handlers: HashMap<&'static str, BoxedHandler<S>>,
}

impl<S: Send + Sync + 'static> JobRegistry<S> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a [`Job`] type so the worker can deserialize and execute it.
    pub fn register<J: Job<Context = S>>(mut self) -> Self {
        let handler: BoxedHandler<S> = Arc::new(move |payload, ctx| {
            Box::pin(async move {
                let job: J = serde_json::from_value(payload)?;
                job.perform(&ctx).await
            })
        });
        self.handlers.insert(J::JOB_TYPE, handler);
        self
    }

    /// Deserialize and execute one payload, or `None` when no handler is
    /// registered for `job_type`.
    pub(crate) async fn dispatch(
        &self,
        job_type: &str,
        payload: serde_json::Value,
        ctx: Arc<S>,
    ) -> Option<JobResult> {
        let handler = self.handlers.get(job_type)?;
        Some(handler(payload, ctx).await)
    }
}

impl<S: Send + Sync + 'static> Default for JobRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
