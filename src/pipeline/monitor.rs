use std::marker::PhantomData;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{GenerateReport, PipelineContext};
use crate::jobs::{enqueue, enqueue_with, Job, JobOpts, JobResult};
use crate::model::{CampaignStatus, DeliveryStatus};
use crate::store::{CampaignStore, DeliveryLedger};

/// Poll a campaign's ledger until every delivery attempt has resolved.
///
/// When no record is still pending the campaign is marked `completed` —
/// completed means "all attempts resolved", not "all succeeded" — and a
/// [`GenerateReport`] is enqueued. Otherwise the check re-enqueues itself
/// after the configured delay. Terminal record states are sticky, so the
/// loop terminates once every queued delivery job has run.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckCompletion<S = ()> {
    pub campaign_id: Uuid,
    #[serde(skip)]
    _marker: PhantomData<S>,
}

impl<S> CheckCompletion<S> {
    pub fn new(campaign_id: Uuid) -> Self {
        Self {
            campaign_id,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<S: PipelineContext> Job for CheckCompletion<S> {
    const JOB_TYPE: &'static str = "check_completion";
    type Context = S;

    async fn perform(self, ctx: &S) -> JobResult {
        let Some(mut campaign) = ctx.campaigns().get(self.campaign_id).await? else {
            tracing::warn!(campaign_id = %self.campaign_id, "campaign not found, skipping check");
            return Ok(Some(json!(format!(
                "campaign {} not found",
                self.campaign_id
            ))));
        };

        let pending = ctx
            .ledger()
            .count_by_status(campaign.id, DeliveryStatus::Pending)
            .await?;

        if pending == 0 {
            campaign.status = CampaignStatus::Completed;
            ctx.campaigns().save(&campaign).await?;
            enqueue(ctx.queue(), GenerateReport::<S>::new(campaign.id)).await?;

            tracing::info!(campaign_id = %campaign.id, "campaign completed");
            Ok(Some(json!(format!("campaign '{}' completed", campaign.name))))
        } else {
            enqueue_with(
                ctx.queue(),
                CheckCompletion::<S>::new(campaign.id),
                JobOpts::delayed(ctx.config().check_delay()),
            )
            .await?;

            Ok(Some(json!(format!("{pending} deliveries still pending"))))
        }
    }
}
