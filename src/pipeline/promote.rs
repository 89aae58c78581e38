use std::marker::PhantomData;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;

use super::{PipelineContext, RunCampaign};
use crate::jobs::{enqueue, Job, JobResult};
use crate::store::CampaignStore;

/// Periodic sweep that promotes due campaigns.
///
/// Finds every campaign with status `scheduled` whose scheduled time has
/// passed and enqueues a [`RunCampaign`] for it. Campaigns are processed
/// independently: a failure to enqueue one is logged and does not stop
/// the sweep.
///
/// Intended to run on a timer via
/// [`pipeline::schedule_trigger`](super::schedule_trigger).
#[derive(Debug, Serialize, Deserialize)]
pub struct PromoteDueCampaigns<S = ()> {
    #[serde(skip)]
    _marker: PhantomData<S>,
}

impl<S> PromoteDueCampaigns<S> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<S> Default for PromoteDueCampaigns<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: PipelineContext> Job for PromoteDueCampaigns<S> {
    const JOB_TYPE: &'static str = "promote_due_campaigns";
    type Context = S;

    async fn perform(self, ctx: &S) -> JobResult {
        let now = OffsetDateTime::now_utc();
        let due = ctx.campaigns().list_due(now).await?;
        let found = due.len();

        for campaign in due {
            if let Err(e) = enqueue(ctx.queue(), RunCampaign::<S>::new(campaign.id)).await {
                tracing::error!(
                    campaign_id = %campaign.id,
                    error = %e,
                    "failed to enqueue campaign run"
                );
            }
        }

        Ok(Some(json!(format!(
            "checked for due campaigns at {now}; found {found}"
        ))))
    }
}
