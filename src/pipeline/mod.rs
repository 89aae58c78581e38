//! The campaign delivery pipeline.
//!
//! Five jobs drive a campaign from `scheduled` to `completed`:
//!
//! 1. [`PromoteDueCampaigns`] — periodic sweep that picks up campaigns whose
//!    scheduled time has passed and enqueues a [`RunCampaign`] for each.
//! 2. [`RunCampaign`] — marks the campaign in-progress and fans out one
//!    pending [`DeliveryRecord`](crate::model::DeliveryRecord) plus one
//!    [`DeliverEmail`] job per subscribed recipient.
//! 3. [`DeliverEmail`] — one unretried send attempt; resolves its record to
//!    `sent` or `failed`.
//! 4. [`CheckCompletion`] — polls the ledger until no record is pending,
//!    then completes the campaign and enqueues the report.
//! 5. [`GenerateReport`] — mails a CSV of per-recipient outcomes to the
//!    administrative address.
//!
//! All five are generic over a [`PipelineContext`], the application state
//! that hands them the stores, the queue, and the mailer. Waiting is always
//! modeled by enqueuing a delayed job, never by blocking.

mod deliver;
mod monitor;
mod promote;
mod report;
mod run;

pub use deliver::DeliverEmail;
pub use monitor::CheckCompletion;
pub use promote::PromoteDueCampaigns;
pub use report::GenerateReport;
pub use run::RunCampaign;

use serde::Serialize;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::jobs::{JobError, JobRegistry, QueueProvider, Scheduler};
use crate::mail::Mailer;
use crate::model::DeliveryStatus;
use crate::store::{CampaignStore, DeliveryLedger, RecipientStore, StoreError};

/// Application state consumed by the pipeline jobs.
///
/// Implement this on your app state to wire the pipeline up:
///
/// ```ignore
/// #[derive(Clone)]
/// struct AppState {
///     queue: MemoryQueue,
///     mailer: SmtpMailer,
///     campaigns: MemoryCampaignStore,
///     recipients: MemoryRecipientStore,
///     ledger: MemoryLedger,
///     config: PipelineConfig,
/// }
///
/// impl PipelineContext for AppState {
///     type Queue = MemoryQueue;
///     // ...
///     fn queue(&self) -> &MemoryQueue { &self.queue }
///     // ...
/// }
/// ```
pub trait PipelineContext: Send + Sync + 'static {
    type Queue: QueueProvider;
    type Mailer: Mailer;
    type Campaigns: CampaignStore;
    type Recipients: RecipientStore;
    type Ledger: DeliveryLedger;

    fn queue(&self) -> &Self::Queue;
    fn mailer(&self) -> &Self::Mailer;
    fn campaigns(&self) -> &Self::Campaigns;
    fn recipients(&self) -> &Self::Recipients;
    fn ledger(&self) -> &Self::Ledger;
    fn config(&self) -> &PipelineConfig;
}

/// A [`JobRegistry`] with every pipeline job registered.
pub fn registry<S: PipelineContext>() -> JobRegistry<S> {
    JobRegistry::new()
        .register::<PromoteDueCampaigns<S>>()
        .register::<RunCampaign<S>>()
        .register::<DeliverEmail<S>>()
        .register::<CheckCompletion<S>>()
        .register::<GenerateReport<S>>()
}

/// Wire the periodic due-campaign sweep onto a [`Scheduler`] at the
/// configured cadence.
pub async fn schedule_trigger<S: PipelineContext, Q: QueueProvider>(
    scheduler: &mut Scheduler<Q>,
    config: &PipelineConfig,
) -> Result<(), JobError> {
    scheduler
        .repeat(config.promote_interval(), PromoteDueCampaigns::<S>::new())
        .await
}

/// Per-campaign delivery counters, as shown on a dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CampaignStats {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub pending: usize,
}

/// Summarize a campaign's ledger.
pub async fn campaign_stats<L: DeliveryLedger>(
    ledger: &L,
    campaign_id: Uuid,
) -> Result<CampaignStats, StoreError> {
    let sent = ledger
        .count_by_status(campaign_id, DeliveryStatus::Sent)
        .await?;
    let failed = ledger
        .count_by_status(campaign_id, DeliveryStatus::Failed)
        .await?;
    let pending = ledger
        .count_by_status(campaign_id, DeliveryStatus::Pending)
        .await?;

    Ok(CampaignStats {
        total: sent + failed + pending,
        sent,
        failed,
        pending,
    })
}
