//! End-to-end pipeline tests against the in-memory backends.
//!
//! Jobs are driven to quiescence with `Worker::process_next` and a zero
//! completion-check delay, so every test is deterministic.

use std::sync::Arc;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

use mailcast::jobs::{enqueue, JobStatus, MemoryQueue, Worker};
use mailcast::mail::{Email, MailError, Mailer};
use mailcast::model::{
    Campaign, CampaignStatus, DeliveryRecord, DeliveryStatus, Recipient, SubscriptionStatus,
};
use mailcast::pipeline::{
    self, CheckCompletion, DeliverEmail, PipelineContext, PromoteDueCampaigns, RunCampaign,
};
use mailcast::store::{
    CampaignStore, DeliveryLedger, MemoryCampaignStore, MemoryLedger, MemoryRecipientStore,
    RecipientStore,
};
use mailcast::PipelineConfig;

/// Mailer double: successful sends are recorded; any recipient address
/// containing `failmail` is rejected.
#[derive(Clone, Default)]
struct MockMailer {
    sent: Arc<Mutex<Vec<Email>>>,
}

impl MockMailer {
    async fn sent(&self) -> Vec<Email> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        if email.to.iter().any(|to| to.contains("failmail")) {
            return Err(MailError::Smtp(
                "simulated email failure for testing purposes".to_string(),
            ));
        }
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}

#[derive(Clone)]
struct TestState {
    queue: MemoryQueue,
    mailer: MockMailer,
    campaigns: MemoryCampaignStore,
    recipients: MemoryRecipientStore,
    ledger: MemoryLedger,
    config: PipelineConfig,
}

impl TestState {
    fn new() -> Self {
        let mut config = PipelineConfig::new("admin@example.com");
        config.check_delay_secs = 0;
        Self {
            queue: MemoryQueue::new(),
            mailer: MockMailer::default(),
            campaigns: MemoryCampaignStore::new(),
            recipients: MemoryRecipientStore::new(),
            ledger: MemoryLedger::new(),
            config,
        }
    }

    fn worker(&self) -> Worker<MemoryQueue, TestState> {
        Worker::new(self.queue.clone(), pipeline::registry(), self.clone())
    }

    async fn drain(&self) {
        let worker = self.worker();
        while worker.process_next().await.unwrap() {}
    }

    async fn add_recipient(&self, name: &str, email: &str) -> Recipient {
        let recipient = Recipient::new(name, email);
        self.recipients
            .insert_ignore_conflicts(std::slice::from_ref(&recipient))
            .await
            .unwrap();
        recipient
    }

    async fn add_due_campaign(&self, name: &str) -> Campaign {
        let campaign = Campaign::scheduled(
            name,
            "Big news",
            "<p>Hello!</p>",
            OffsetDateTime::now_utc() - Duration::minutes(5),
        );
        self.campaigns.save(&campaign).await.unwrap();
        campaign
    }

    async fn reports(&self) -> Vec<Email> {
        self.mailer
            .sent()
            .await
            .into_iter()
            .filter(|e| e.subject.starts_with("Campaign Report:"))
            .collect()
    }
}

impl PipelineContext for TestState {
    type Queue = MemoryQueue;
    type Mailer = MockMailer;
    type Campaigns = MemoryCampaignStore;
    type Recipients = MemoryRecipientStore;
    type Ledger = MemoryLedger;

    fn queue(&self) -> &MemoryQueue {
        &self.queue
    }
    fn mailer(&self) -> &MockMailer {
        &self.mailer
    }
    fn campaigns(&self) -> &MemoryCampaignStore {
        &self.campaigns
    }
    fn recipients(&self) -> &MemoryRecipientStore {
        &self.recipients
    }
    fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }
    fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

#[tokio::test]
async fn end_to_end_campaign_delivery() {
    let state = TestState::new();
    state.add_recipient("Alice", "alice@example.com").await;
    state.add_recipient("Bob", "bob@failmail.example.com").await;
    let campaign = state.add_due_campaign("Launch").await;

    enqueue(&state.queue, PromoteDueCampaigns::<TestState>::new())
        .await
        .unwrap();
    state.drain().await;

    // Per-recipient outcomes
    let records = state.ledger.list(campaign.id).await.unwrap();
    assert_eq!(records.len(), 2);

    let alice = records
        .iter()
        .find(|r| r.recipient_email == "alice@example.com")
        .unwrap();
    assert_eq!(alice.status, DeliveryStatus::Sent);
    assert!(alice.sent_at.is_some());
    assert!(alice.failure_reason.is_none());

    let bob = records
        .iter()
        .find(|r| r.recipient_email == "bob@failmail.example.com")
        .unwrap();
    assert_eq!(bob.status, DeliveryStatus::Failed);
    assert!(bob.sent_at.is_none());
    assert!(!bob.failure_reason.as_deref().unwrap_or("").is_empty());

    // Campaign resolved even though one delivery failed
    let campaign = state.campaigns.get(campaign.id).await.unwrap().unwrap();
    assert_eq!(campaign.status, CampaignStatus::Completed);

    // Exactly one report, with one row per record
    let reports = state.reports().await;
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.to, vec!["admin@example.com"]);
    assert_eq!(report.subject, "Campaign Report: Launch");
    assert_eq!(report.attachments.len(), 1);
    assert_eq!(report.attachments[0].filename, "Launch_report.csv");

    let csv = String::from_utf8(report.attachments[0].content.clone()).unwrap();
    assert!(csv.starts_with("Recipient Email,Status,Sent At,Failure Reason"));
    assert!(csv.lines().any(|l| l.starts_with("alice@example.com,sent,2")));
    assert!(csv
        .lines()
        .any(|l| l.starts_with("bob@failmail.example.com,failed,,")));
}

#[tokio::test]
async fn fanout_is_unique_per_recipient_even_when_run_twice() {
    let state = TestState::new();
    let recipient = state.add_recipient("Alice", "alice@example.com").await;
    let campaign = state.add_due_campaign("Launch").await;

    enqueue(&state.queue, RunCampaign::<TestState>::new(campaign.id))
        .await
        .unwrap();
    enqueue(&state.queue, RunCampaign::<TestState>::new(campaign.id))
        .await
        .unwrap();
    state.drain().await;

    let records = state.ledger.list(campaign.id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].recipient_id, recipient.id);

    // Double fan-out still sends one email: the second delivery job hits
    // the idempotence guard.
    let delivered: Vec<Email> = state
        .mailer
        .sent()
        .await
        .into_iter()
        .filter(|e| e.to == vec!["alice@example.com".to_string()])
        .collect();
    assert_eq!(delivered.len(), 1);
}

#[tokio::test]
async fn delivery_worker_is_idempotent() {
    let state = TestState::new();
    let recipient = state.add_recipient("Alice", "alice@example.com").await;
    let campaign = state.add_due_campaign("Launch").await;

    let record = DeliveryRecord::pending(campaign.id, &recipient);
    state
        .ledger
        .insert_ignore_conflicts(std::slice::from_ref(&record))
        .await
        .unwrap();

    enqueue(&state.queue, DeliverEmail::<TestState>::new(record.id))
        .await
        .unwrap();
    enqueue(&state.queue, DeliverEmail::<TestState>::new(record.id))
        .await
        .unwrap();
    state.drain().await;

    assert_eq!(state.mailer.sent().await.len(), 1);

    let entries = state.queue.entries().await;
    assert!(entries.iter().all(|e| e.status == JobStatus::Completed));
    assert!(entries.iter().any(|e| e
        .result
        .as_ref()
        .is_some_and(|r| r.as_str().unwrap_or("").contains("already resolved"))));
}

#[tokio::test]
async fn fanout_snapshots_subscription_state() {
    let state = TestState::new();
    state.add_recipient("Alice", "alice@example.com").await;
    let bob = state.add_recipient("Bob", "bob@example.com").await;
    state
        .recipients
        .set_status("bob@example.com", SubscriptionStatus::Unsubscribed)
        .await;
    let campaign = state.add_due_campaign("Launch").await;

    enqueue(&state.queue, RunCampaign::<TestState>::new(campaign.id))
        .await
        .unwrap();
    state.drain().await;

    let records = state.ledger.list(campaign.id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].recipient_email, "alice@example.com");

    // Subscribing afterwards does not retroactively add Bob.
    state
        .recipients
        .set_status("bob@example.com", SubscriptionStatus::Subscribed)
        .await;
    state.drain().await;

    let records = state.ledger.list(campaign.id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records.iter().all(|r| r.recipient_id != bob.id));
}

#[tokio::test]
async fn unsubscribing_after_fanout_does_not_withdraw_delivery() {
    let state = TestState::new();
    state.add_recipient("Alice", "alice@example.com").await;
    let campaign = state.add_due_campaign("Launch").await;

    enqueue(&state.queue, RunCampaign::<TestState>::new(campaign.id))
        .await
        .unwrap();
    // Fan out, then unsubscribe before the delivery job runs.
    let worker = state.worker();
    assert!(worker.process_next().await.unwrap());
    state
        .recipients
        .set_status("alice@example.com", SubscriptionStatus::Unsubscribed)
        .await;
    state.drain().await;

    let records = state.ledger.list(campaign.id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, DeliveryStatus::Sent);
}

#[tokio::test]
async fn completed_campaign_stays_completed() {
    let state = TestState::new();
    state.add_recipient("Alice", "alice@example.com").await;
    let campaign = state.add_due_campaign("Launch").await;

    enqueue(&state.queue, RunCampaign::<TestState>::new(campaign.id))
        .await
        .unwrap();
    state.drain().await;

    let loaded = state.campaigns.get(campaign.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, CampaignStatus::Completed);

    // A stray completion check never moves the campaign backwards.
    enqueue(&state.queue, CheckCompletion::<TestState>::new(campaign.id))
        .await
        .unwrap();
    state.drain().await;

    let loaded = state.campaigns.get(campaign.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, CampaignStatus::Completed);
}

#[tokio::test]
async fn resolved_records_are_never_mutated_again() {
    let state = TestState::new();
    let recipient = state
        .add_recipient("Bob", "bob@failmail.example.com")
        .await;
    let campaign = state.add_due_campaign("Launch").await;

    let record = DeliveryRecord::pending(campaign.id, &recipient);
    state
        .ledger
        .insert_ignore_conflicts(std::slice::from_ref(&record))
        .await
        .unwrap();

    enqueue(&state.queue, DeliverEmail::<TestState>::new(record.id))
        .await
        .unwrap();
    state.drain().await;

    let failed = state.ledger.get(record.id).await.unwrap().unwrap();
    assert_eq!(failed.status, DeliveryStatus::Failed);
    let reason = failed.failure_reason.clone();

    for _ in 0..2 {
        enqueue(&state.queue, DeliverEmail::<TestState>::new(record.id))
            .await
            .unwrap();
    }
    state.drain().await;

    let still_failed = state.ledger.get(record.id).await.unwrap().unwrap();
    assert_eq!(still_failed.status, DeliveryStatus::Failed);
    assert_eq!(still_failed.failure_reason, reason);
    assert!(still_failed.sent_at.is_none());
}

#[tokio::test]
async fn promotion_skips_future_and_draft_campaigns() {
    let state = TestState::new();
    state.add_recipient("Alice", "alice@example.com").await;

    let future = Campaign::scheduled(
        "Later",
        "Soon",
        "body",
        OffsetDateTime::now_utc() + Duration::hours(1),
    );
    state.campaigns.save(&future).await.unwrap();

    let mut draft = Campaign::scheduled(
        "Draft",
        "Unready",
        "body",
        OffsetDateTime::now_utc() - Duration::hours(1),
    );
    draft.status = CampaignStatus::Draft;
    state.campaigns.save(&draft).await.unwrap();

    enqueue(&state.queue, PromoteDueCampaigns::<TestState>::new())
        .await
        .unwrap();
    state.drain().await;

    assert_eq!(
        state.campaigns.get(future.id).await.unwrap().unwrap().status,
        CampaignStatus::Scheduled
    );
    assert_eq!(
        state.campaigns.get(draft.id).await.unwrap().unwrap().status,
        CampaignStatus::Draft
    );
    assert!(state.ledger.list(future.id).await.unwrap().is_empty());
    assert!(state.reports().await.is_empty());
}

#[tokio::test]
async fn campaign_with_no_recipients_completes_with_empty_report() {
    let state = TestState::new();
    let campaign = state.add_due_campaign("Empty").await;

    enqueue(&state.queue, RunCampaign::<TestState>::new(campaign.id))
        .await
        .unwrap();
    state.drain().await;

    let loaded = state.campaigns.get(campaign.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, CampaignStatus::Completed);

    let reports = state.reports().await;
    assert_eq!(reports.len(), 1);
    let csv = String::from_utf8(reports[0].attachments[0].content.clone()).unwrap();
    assert_eq!(csv.lines().count(), 1); // header only
}

#[tokio::test]
async fn deleted_campaign_is_a_clean_no_op() {
    let state = TestState::new();
    state.add_recipient("Alice", "alice@example.com").await;

    // Jobs referencing a campaign that was never saved.
    let ghost = uuid::Uuid::new_v4();
    enqueue(&state.queue, RunCampaign::<TestState>::new(ghost))
        .await
        .unwrap();
    enqueue(&state.queue, CheckCompletion::<TestState>::new(ghost))
        .await
        .unwrap();
    state.drain().await;

    let entries = state.queue.entries().await;
    assert!(entries.iter().all(|e| e.status == JobStatus::Completed));
    assert!(state.mailer.sent().await.is_empty());
}

#[tokio::test]
async fn missing_delivery_record_is_reported_not_fatal() {
    let state = TestState::new();

    enqueue(
        &state.queue,
        DeliverEmail::<TestState>::new(uuid::Uuid::new_v4()),
    )
    .await
    .unwrap();
    state.drain().await;

    let entries = state.queue.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, JobStatus::Completed);
    assert!(entries[0]
        .result
        .as_ref()
        .is_some_and(|r| r.as_str().unwrap_or("").contains("not found")));
}

#[tokio::test]
async fn campaign_stats_summarize_the_ledger() {
    let state = TestState::new();
    state.add_recipient("Alice", "alice@example.com").await;
    state.add_recipient("Bob", "bob@failmail.example.com").await;
    let campaign = state.add_due_campaign("Launch").await;

    enqueue(&state.queue, RunCampaign::<TestState>::new(campaign.id))
        .await
        .unwrap();
    state.drain().await;

    let stats = pipeline::campaign_stats(&state.ledger, campaign.id)
        .await
        .unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.sent, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.pending, 0);
}
