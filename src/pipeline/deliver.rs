use std::marker::PhantomData;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use super::PipelineContext;
use crate::jobs::{Job, JobResult};
use crate::mail::{Email, Mailer};
use crate::model::{DeliveryRecord, DeliveryStatus};
use crate::store::{CampaignStore, DeliveryLedger};

/// One unretried delivery attempt for one ledger record.
///
/// The record transitions from `pending` to exactly one of `sent` or
/// `failed` and is never touched again; a job that finds its record
/// already resolved is a no-op, which makes re-enqueuing deliveries safe.
///
/// Failure handling is two-phase. Before the record is loaded, nothing
/// can be written back, so errors simply fail the job. Once the record is
/// in hand, any failure — missing campaign, unbuildable message, sender
/// rejection — resolves the record to `failed` with a diagnostic reason.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeliverEmail<S = ()> {
    pub record_id: Uuid,
    #[serde(skip)]
    _marker: PhantomData<S>,
}

impl<S> DeliverEmail<S> {
    pub fn new(record_id: Uuid) -> Self {
        Self {
            record_id,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<S: PipelineContext> Job for DeliverEmail<S> {
    const JOB_TYPE: &'static str = "deliver_email";
    type Context = S;

    async fn perform(self, ctx: &S) -> JobResult {
        let Some(mut record) = ctx.ledger().get(self.record_id).await? else {
            tracing::warn!(record_id = %self.record_id, "delivery record not found");
            return Ok(Some(json!(format!(
                "delivery record {} not found",
                self.record_id
            ))));
        };

        // Idempotence guard: prevents double-send.
        if record.resolved() {
            tracing::info!(record_id = %record.id, status = %record.status, "already resolved");
            return Ok(Some(json!(format!(
                "delivery record {} already resolved",
                record.id
            ))));
        }

        match attempt_send(ctx, &record).await {
            Ok(()) => {
                record.status = DeliveryStatus::Sent;
                record.sent_at = Some(OffsetDateTime::now_utc());
                ctx.ledger().save(&record).await?;
                Ok(Some(json!(format!(
                    "email to {} sent successfully",
                    record.recipient_email
                ))))
            }
            Err(reason) => {
                tracing::warn!(
                    record_id = %record.id,
                    recipient = %record.recipient_email,
                    %reason,
                    "delivery failed"
                );
                record.status = DeliveryStatus::Failed;
                record.failure_reason = Some(reason.clone());
                ctx.ledger().save(&record).await?;
                Ok(Some(json!(format!(
                    "failed to send email for record {}: {reason}",
                    record.id
                ))))
            }
        }
    }
}

/// Everything that can go wrong after the record is loaded, collapsed to
/// a diagnostic string for the ledger.
async fn attempt_send<S: PipelineContext>(
    ctx: &S,
    record: &DeliveryRecord,
) -> Result<(), String> {
    let campaign = ctx
        .campaigns()
        .get(record.campaign_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("campaign {} no longer exists", record.campaign_id))?;

    let email = Email::builder()
        .to(record.recipient_email.as_str())
        .subject(campaign.subject.as_str())
        .html(campaign.body.as_str())
        .build()
        .map_err(|e| e.to_string())?;

    ctx.mailer().send(&email).await.map_err(|e| e.to_string())
}
