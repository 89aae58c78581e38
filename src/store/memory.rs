//! In-memory store implementations for development and testing.
//!
//! All three are `Vec`s behind a mutex. Not durable — everything is lost
//! on restart.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CampaignStore, DeliveryLedger, RecipientStore, StoreError};
use crate::model::{Campaign, CampaignStatus, DeliveryRecord, DeliveryStatus, Recipient};

/// In-memory [`CampaignStore`].
#[derive(Clone, Default)]
pub struct MemoryCampaignStore {
    campaigns: Arc<Mutex<Vec<Campaign>>>,
}

impl MemoryCampaignStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CampaignStore for MemoryCampaignStore {
    async fn get(&self, id: Uuid) -> Result<Option<Campaign>, StoreError> {
        let campaigns = self.campaigns.lock().await;
        Ok(campaigns.iter().find(|c| c.id == id).cloned())
    }

    async fn list_due(&self, now: OffsetDateTime) -> Result<Vec<Campaign>, StoreError> {
        let campaigns = self.campaigns.lock().await;
        Ok(campaigns
            .iter()
            .filter(|c| c.status == CampaignStatus::Scheduled && c.scheduled_at <= now)
            .cloned()
            .collect())
    }

    async fn save(&self, campaign: &Campaign) -> Result<(), StoreError> {
        let mut campaigns = self.campaigns.lock().await;
        let mut campaign = campaign.clone();
        campaign.updated_at = OffsetDateTime::now_utc();
        if let Some(existing) = campaigns.iter_mut().find(|c| c.id == campaign.id) {
            *existing = campaign;
        } else {
            campaigns.push(campaign);
        }
        Ok(())
    }
}

/// In-memory [`RecipientStore`].
#[derive(Clone, Default)]
pub struct MemoryRecipientStore {
    recipients: Arc<Mutex<Vec<Recipient>>>,
}

impl MemoryRecipientStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the subscription state of the recipient with this email.
    pub async fn set_status(&self, email: &str, status: crate::model::SubscriptionStatus) {
        let mut recipients = self.recipients.lock().await;
        if let Some(r) = recipients.iter_mut().find(|r| r.email == email) {
            r.status = status;
        }
    }
}

#[async_trait]
impl RecipientStore for MemoryRecipientStore {
    async fn list_subscribed(&self) -> Result<Vec<Recipient>, StoreError> {
        let recipients = self.recipients.lock().await;
        Ok(recipients
            .iter()
            .filter(|r| r.status == crate::model::SubscriptionStatus::Subscribed)
            .cloned()
            .collect())
    }

    async fn insert_ignore_conflicts(
        &self,
        batch: &[Recipient],
    ) -> Result<usize, StoreError> {
        let mut recipients = self.recipients.lock().await;
        let mut inserted = 0;
        for recipient in batch {
            if recipients.iter().any(|r| r.email == recipient.email) {
                continue;
            }
            recipients.push(recipient.clone());
            inserted += 1;
        }
        Ok(inserted)
    }
}

/// In-memory [`DeliveryLedger`]. Preserves insertion order, which doubles
/// as record-creation order for `list`.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    records: Arc<Mutex<Vec<DeliveryRecord>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryLedger for MemoryLedger {
    async fn get(&self, id: Uuid) -> Result<Option<DeliveryRecord>, StoreError> {
        let records = self.records.lock().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn insert_ignore_conflicts(
        &self,
        batch: &[DeliveryRecord],
    ) -> Result<usize, StoreError> {
        let mut records = self.records.lock().await;
        let mut inserted = 0;
        for record in batch {
            let exists = records.iter().any(|r| {
                r.campaign_id == record.campaign_id && r.recipient_id == record.recipient_id
            });
            if exists {
                continue;
            }
            records.push(record.clone());
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn list(&self, campaign_id: Uuid) -> Result<Vec<DeliveryRecord>, StoreError> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|r| r.campaign_id == campaign_id)
            .cloned()
            .collect())
    }

    async fn list_by_status(
        &self,
        campaign_id: Uuid,
        status: DeliveryStatus,
    ) -> Result<Vec<DeliveryRecord>, StoreError> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|r| r.campaign_id == campaign_id && r.status == status)
            .cloned()
            .collect())
    }

    async fn count_by_status(
        &self,
        campaign_id: Uuid,
        status: DeliveryStatus,
    ) -> Result<usize, StoreError> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|r| r.campaign_id == campaign_id && r.status == status)
            .count())
    }

    async fn save(&self, record: &DeliveryRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        if let Some(existing) = records.iter_mut().find(|r| r.id == record.id) {
            *existing = record.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ledger_ignores_duplicate_pairs() {
        let ledger = MemoryLedger::new();
        let recipient = Recipient::new("Ada", "ada@example.com");
        let campaign_id = Uuid::new_v4();

        let first = DeliveryRecord::pending(campaign_id, &recipient);
        let second = DeliveryRecord::pending(campaign_id, &recipient);

        assert_eq!(ledger.insert_ignore_conflicts(&[first]).await.unwrap(), 1);
        assert_eq!(ledger.insert_ignore_conflicts(&[second]).await.unwrap(), 0);
        assert_eq!(ledger.list(campaign_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn recipient_store_dedupes_by_email() {
        let store = MemoryRecipientStore::new();
        let batch = vec![
            Recipient::new("Ada", "ada@example.com"),
            Recipient::new("Ada again", "ada@example.com"),
        ];
        assert_eq!(store.insert_ignore_conflicts(&batch).await.unwrap(), 1);
    }
}
