//! Email sending behind a swappable [`Mailer`] trait.
//!
//! This module is a thin abstraction over [lettre](https://lettre.rs) with
//! environment-based configuration. The campaign pipeline only ever talks
//! to the [`Mailer`] trait, so tests substitute a mock and alternative
//! backends (SES, Mailgun, ...) slot in without touching the pipeline.
//!
//! # Environment Variables
//!
//! [`SmtpMailer::from_env`] reads:
//!
//! | Variable | Required | Description |
//! |----------|----------|-------------|
//! | `SMTP_HOST` | Yes | SMTP server hostname |
//! | `SMTP_PORT` | No | Port (default: 587) |
//! | `SMTP_USERNAME` | No | Username for authentication |
//! | `SMTP_PASSWORD` | No | Password for authentication |
//! | `SMTP_FROM` | Yes | Default sender address |
//! | `SMTP_TLS` | No | `starttls` (default), `tls`, or `none` |
//! | `SMTP_TIMEOUT` | No | Connection timeout in seconds (default: 10) |

mod mailer;
mod message;

pub use mailer::{Mailer, MailerConfig, SmtpMailer};
pub use message::{Attachment, Email, EmailBody, EmailBuilder};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("missing required config: {0}")]
    MissingConfig(String),

    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}
