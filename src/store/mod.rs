//! Storage traits for campaigns, recipients, and the delivery ledger.
//!
//! Each trait maps to a handful of single-statement queries on a SQL
//! backend. [`MemoryCampaignStore`], [`MemoryRecipientStore`], and
//! [`MemoryLedger`] provide non-durable implementations for development
//! and testing.

mod memory;

pub use memory::{MemoryCampaignStore, MemoryLedger, MemoryRecipientStore};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::model::{Campaign, DeliveryRecord, DeliveryStatus, Recipient};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Campaign content, schedule, and lifecycle status.
#[async_trait]
pub trait CampaignStore: Send + Sync + Clone + 'static {
    async fn get(&self, id: Uuid) -> Result<Option<Campaign>, StoreError>;

    /// Campaigns with status `Scheduled` and `scheduled_at <= now`.
    async fn list_due(&self, now: OffsetDateTime) -> Result<Vec<Campaign>, StoreError>;

    /// Insert or update by id. Implementations refresh `updated_at`.
    async fn save(&self, campaign: &Campaign) -> Result<(), StoreError>;
}

/// Recipient identity and subscription state. Email is unique.
#[async_trait]
pub trait RecipientStore: Send + Sync + Clone + 'static {
    async fn list_subscribed(&self) -> Result<Vec<Recipient>, StoreError>;

    /// Insert a batch, silently skipping recipients whose email is already
    /// known. Returns the number actually inserted.
    async fn insert_ignore_conflicts(
        &self,
        recipients: &[Recipient],
    ) -> Result<usize, StoreError>;
}

/// One record per (campaign, recipient) pair tracking delivery outcome.
///
/// Uniqueness of the pair is the store's responsibility
/// (insert-or-ignore on fan-out). `save` overwrites by record id; callers
/// must only resolve records they have observed as `Pending`, so the
/// pending → terminal transition behaves as a compare-and-set.
#[async_trait]
pub trait DeliveryLedger: Send + Sync + Clone + 'static {
    async fn get(&self, id: Uuid) -> Result<Option<DeliveryRecord>, StoreError>;

    /// Insert a batch, silently skipping records whose (campaign, recipient)
    /// pair already exists. Returns the number actually inserted.
    async fn insert_ignore_conflicts(
        &self,
        records: &[DeliveryRecord],
    ) -> Result<usize, StoreError>;

    /// All records for a campaign, in creation order.
    async fn list(&self, campaign_id: Uuid) -> Result<Vec<DeliveryRecord>, StoreError>;

    /// Records for a campaign with the given status, in creation order.
    async fn list_by_status(
        &self,
        campaign_id: Uuid,
        status: DeliveryStatus,
    ) -> Result<Vec<DeliveryRecord>, StoreError>;

    async fn count_by_status(
        &self,
        campaign_id: Uuid,
        status: DeliveryStatus,
    ) -> Result<usize, StoreError>;

    /// Persist an updated record by id.
    async fn save(&self, record: &DeliveryRecord) -> Result<(), StoreError>;
}
