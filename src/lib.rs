//! Scheduled email-campaign delivery.
//!
//! An operator defines a [`Campaign`](model::Campaign) (subject, body,
//! scheduled time) against a set of recipients; the pipeline promotes due
//! campaigns, fans out one [`DeliveryRecord`](model::DeliveryRecord) per
//! subscribed recipient, sends each email exactly once, and mails a CSV
//! delivery report to an administrative address when every attempt has
//! resolved.
//!
//! The crate is transport- and storage-agnostic: campaigns, recipients, and
//! the delivery ledger live behind async traits in [`store`], email sending
//! behind [`mail::Mailer`], and all work runs as queued jobs on any
//! [`jobs::QueueProvider`]. In-memory implementations of every backend are
//! included for tests and development.
//!
//! # Quick Start
//!
//! ```ignore
//! let ctx = AppState { /* stores, queue, mailer, config */ };
//!
//! // Process jobs in the background
//! Worker::new(ctx.queue.clone(), pipeline::registry(), ctx.clone()).start();
//!
//! // Sweep for due campaigns on a timer
//! let mut scheduler = Scheduler::new(ctx.queue.clone()).await?;
//! pipeline::schedule_trigger(&mut scheduler, &config).await?;
//! scheduler.start().await?;
//! ```

pub mod config;
pub mod import;
pub mod jobs;
pub mod mail;
pub mod model;
pub mod pipeline;
pub mod store;

pub use config::PipelineConfig;
