//! Domain types: recipients, campaigns, and the delivery ledger entries
//! that track per-recipient outcomes.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Whether a recipient currently wants to receive campaigns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Subscribed,
    Unsubscribed,
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Subscribed => write!(f, "subscribed"),
            Self::Unsubscribed => write!(f, "unsubscribed"),
        }
    }
}

/// A person campaigns can be addressed to. Identity is the email address,
/// which is unique within a [`RecipientStore`](crate::store::RecipientStore).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub status: SubscriptionStatus,
    pub created_at: OffsetDateTime,
}

impl Recipient {
    /// New recipient, subscribed by default.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            status: SubscriptionStatus::Subscribed,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Lifecycle status of a campaign.
///
/// The pipeline drives `scheduled → in_progress → completed`. `Failed` is
/// representable for external tooling (manual intervention) but never
/// produced by the pipeline itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    InProgress,
    Completed,
    Failed,
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Scheduled => write!(f, "scheduled"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// For sqlx-style backends: CampaignStatus <-> String conversion
impl TryFrom<String> for CampaignStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "draft" => Ok(Self::Draft),
            "scheduled" => Ok(Self::Scheduled),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown campaign status: {other}")),
        }
    }
}

/// A single broadcast email definition with schedule and lifecycle status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub subject: String,
    /// Plain text or HTML body.
    pub body: String,
    pub scheduled_at: OffsetDateTime,
    pub status: CampaignStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Campaign {
    /// New campaign in `Scheduled` state, ready for promotion once
    /// `scheduled_at` passes.
    pub fn scheduled(
        name: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        scheduled_at: OffsetDateTime,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            subject: subject.into(),
            body: body.into(),
            scheduled_at,
            status: CampaignStatus::Scheduled,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Sent => write!(f, "sent"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl TryFrom<String> for DeliveryStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown delivery status: {other}")),
        }
    }
}

/// One delivery attempt for one (campaign, recipient) pair.
///
/// At most one record exists per pair. A record is created `Pending` at
/// fan-out and resolved exactly once to `Sent` or `Failed`; both are
/// terminal. The recipient's email is denormalized here so the delivery
/// worker and report generator never consult the recipient store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub recipient_id: Uuid,
    pub recipient_email: String,
    pub status: DeliveryStatus,
    /// Set iff `status == Sent`.
    pub sent_at: Option<OffsetDateTime>,
    /// Set iff `status == Failed`. Free-text diagnostic.
    pub failure_reason: Option<String>,
    pub created_at: OffsetDateTime,
}

impl DeliveryRecord {
    /// Fresh pending record for one recipient of a campaign.
    pub fn pending(campaign_id: Uuid, recipient: &Recipient) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            recipient_id: recipient.id,
            recipient_email: recipient.email.clone(),
            status: DeliveryStatus::Pending,
            sent_at: None,
            failure_reason: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Whether this record has reached a terminal state.
    pub fn resolved(&self) -> bool {
        self.status != DeliveryStatus::Pending
    }
}
