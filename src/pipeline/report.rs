use std::marker::PhantomData;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::macros::format_description;
use uuid::Uuid;

use super::PipelineContext;
use crate::jobs::{Job, JobResult};
use crate::mail::{Email, Mailer};
use crate::model::DeliveryRecord;
use crate::store::{CampaignStore, DeliveryLedger};

/// Build and mail the delivery report for a completed campaign.
///
/// The report is a CSV with one row per delivery record, in record-creation
/// order, attached to a single email addressed to the configured
/// administrative address. Fire-and-forget: nothing is persisted, and a
/// send failure fails the job without retry.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateReport<S = ()> {
    pub campaign_id: Uuid,
    #[serde(skip)]
    _marker: PhantomData<S>,
}

impl<S> GenerateReport<S> {
    pub fn new(campaign_id: Uuid) -> Self {
        Self {
            campaign_id,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<S: PipelineContext> Job for GenerateReport<S> {
    const JOB_TYPE: &'static str = "generate_report";
    type Context = S;

    async fn perform(self, ctx: &S) -> JobResult {
        let Some(campaign) = ctx.campaigns().get(self.campaign_id).await? else {
            tracing::warn!(campaign_id = %self.campaign_id, "campaign not found, skipping report");
            return Ok(Some(json!(format!(
                "campaign {} not found",
                self.campaign_id
            ))));
        };

        let records = ctx.ledger().list(campaign.id).await?;
        let csv = render_report(&records)?;

        let email = Email::builder()
            .to(ctx.config().admin_email.as_str())
            .subject(format!("Campaign Report: {}", campaign.name))
            .text(format!(
                "Attached is the delivery report for the campaign '{}'.",
                campaign.name
            ))
            .attachment(format!("{}_report.csv", campaign.name), "text/csv", csv)
            .build()?;

        ctx.mailer().send(&email).await?;

        tracing::info!(
            campaign_id = %campaign.id,
            rows = records.len(),
            to = %ctx.config().admin_email,
            "delivery report sent"
        );

        Ok(Some(json!(format!(
            "report for campaign '{}' sent to {}",
            campaign.name,
            ctx.config().admin_email
        ))))
    }
}

/// Render delivery records as the report CSV.
///
/// Header: `Recipient Email, Status, Sent At, Failure Reason`. Timestamps
/// are `YYYY-MM-DD HH:MM:SS`; absent sent-time and failure-reason render
/// as empty strings.
pub fn render_report(
    records: &[DeliveryRecord],
) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
    let timestamp = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Recipient Email", "Status", "Sent At", "Failure Reason"])?;

    for record in records {
        let sent_at = match record.sent_at {
            Some(t) => t.format(&timestamp)?,
            None => String::new(),
        };
        writer.write_record([
            record.recipient_email.as_str(),
            &record.status.to_string(),
            &sent_at,
            record.failure_reason.as_deref().unwrap_or(""),
        ])?;
    }

    writer.into_inner().map_err(|e| e.to_string().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeliveryStatus, Recipient};
    use time::macros::datetime;

    fn record(email: &str) -> DeliveryRecord {
        DeliveryRecord::pending(Uuid::new_v4(), &Recipient::new("Test", email))
    }

    #[test]
    fn sent_timestamp_is_formatted() {
        let mut sent = record("ada@example.com");
        sent.status = DeliveryStatus::Sent;
        sent.sent_at = Some(datetime!(2024-03-05 09:07:02 UTC));

        let csv = String::from_utf8(render_report(&[sent]).unwrap()).unwrap();
        let mut lines = csv.lines();

        assert_eq!(
            lines.next().unwrap(),
            "Recipient Email,Status,Sent At,Failure Reason"
        );
        assert_eq!(
            lines.next().unwrap(),
            "ada@example.com,sent,2024-03-05 09:07:02,"
        );
    }

    #[test]
    fn pending_record_renders_empty_fields() {
        let csv = String::from_utf8(render_report(&[record("bob@example.com")]).unwrap())
            .unwrap();

        assert!(csv.lines().any(|l| l == "bob@example.com,pending,,"));
    }

    #[test]
    fn failure_reason_is_included() {
        let mut failed = record("eve@example.com");
        failed.status = DeliveryStatus::Failed;
        failed.failure_reason = Some("mailbox full".to_string());

        let csv = String::from_utf8(render_report(&[failed]).unwrap()).unwrap();

        assert!(csv.lines().any(|l| l == "eve@example.com,failed,,mailbox full"));
    }

    #[test]
    fn rows_follow_input_order() {
        let first = record("a@example.com");
        let second = record("b@example.com");

        let csv = String::from_utf8(render_report(&[first, second]).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert!(lines[1].starts_with("a@example.com"));
        assert!(lines[2].starts_with("b@example.com"));
    }
}
