use std::marker::PhantomData;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{CheckCompletion, DeliverEmail, PipelineContext};
use crate::jobs::{enqueue, enqueue_with, Job, JobOpts, JobResult};
use crate::model::{CampaignStatus, DeliveryRecord, DeliveryStatus};
use crate::store::{CampaignStore, DeliveryLedger, RecipientStore};

/// Fan a campaign out to its recipients.
///
/// Marks the campaign in-progress, creates one pending
/// [`DeliveryRecord`] per currently-subscribed recipient (a snapshot:
/// later subscription changes do not alter the record set), enqueues one
/// [`DeliverEmail`] per pending record, and schedules the first
/// [`CheckCompletion`].
///
/// Safe to re-run for the same campaign: record creation ignores
/// (campaign, recipient) conflicts, pre-existing pending records from a
/// prior partial run are re-enqueued, and the delivery worker is a no-op
/// on resolved records.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunCampaign<S = ()> {
    pub campaign_id: Uuid,
    #[serde(skip)]
    _marker: PhantomData<S>,
}

impl<S> RunCampaign<S> {
    pub fn new(campaign_id: Uuid) -> Self {
        Self {
            campaign_id,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<S: PipelineContext> Job for RunCampaign<S> {
    const JOB_TYPE: &'static str = "run_campaign";
    type Context = S;

    async fn perform(self, ctx: &S) -> JobResult {
        // Deleted before processing; not an error.
        let Some(mut campaign) = ctx.campaigns().get(self.campaign_id).await? else {
            tracing::warn!(campaign_id = %self.campaign_id, "campaign not found, skipping run");
            return Ok(Some(json!(format!(
                "campaign {} not found",
                self.campaign_id
            ))));
        };

        campaign.status = CampaignStatus::InProgress;
        ctx.campaigns().save(&campaign).await?;

        let recipients = ctx.recipients().list_subscribed().await?;
        let records: Vec<DeliveryRecord> = recipients
            .iter()
            .map(|recipient| DeliveryRecord::pending(campaign.id, recipient))
            .collect();
        let created = ctx.ledger().insert_ignore_conflicts(&records).await?;

        // Pre-existing pending records from a prior partial run are picked
        // up here as well.
        let pending = ctx
            .ledger()
            .list_by_status(campaign.id, DeliveryStatus::Pending)
            .await?;
        for record in &pending {
            enqueue(ctx.queue(), DeliverEmail::<S>::new(record.id)).await?;
        }

        enqueue_with(
            ctx.queue(),
            CheckCompletion::<S>::new(campaign.id),
            JobOpts::delayed(ctx.config().check_delay()),
        )
        .await?;

        tracing::info!(
            campaign_id = %campaign.id,
            created,
            queued = pending.len(),
            "campaign fan-out complete"
        );

        Ok(Some(json!(format!(
            "created {created} records, queued {} deliveries",
            pending.len()
        ))))
    }
}
