//! Recipient CSV import with row validation.
//!
//! Independent of the delivery pipeline: parsing and validation are pure,
//! and insertion goes through
//! [`RecipientStore::insert_ignore_conflicts`](crate::store::RecipientStore::insert_ignore_conflicts)
//! so emails already on file are skipped.

use std::io::Read;

use serde::Deserialize;

use crate::model::Recipient;
use crate::store::{RecipientStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("file must contain 'name' and 'email' columns")]
    MissingColumns,

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One raw row of an upload, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipientRow {
    pub name: String,
    pub email: String,
}

/// Validate a single row. Pure: no store access.
///
/// A valid row has a non-empty name and a plausible email address
/// (`local@domain` with a dot somewhere in the domain).
pub fn validate_row(row: &RecipientRow) -> Result<Recipient, String> {
    let name = row.name.trim();
    if name.is_empty() {
        return Err("name must not be empty".to_string());
    }

    let email = row.email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(format!("'{email}' is not a valid email address"));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || email.contains(' ') {
        return Err(format!("'{email}' is not a valid email address"));
    }

    Ok(Recipient::new(name, email))
}

/// Parse a CSV upload with `name` and `email` columns into validated
/// recipients.
///
/// The first invalid row aborts the import, reporting its 1-based file row
/// number (header is row 1). Duplicate emails within the file are
/// collapsed, first occurrence wins.
pub fn parse_recipients<R: Read>(reader: R) -> Result<Vec<Recipient>, ImportError> {
    let mut csv_reader = csv::Reader::from_reader(reader);

    {
        let headers = csv_reader.headers()?;
        let has = |name: &str| headers.iter().any(|h| h == name);
        if !has("name") || !has("email") {
            return Err(ImportError::MissingColumns);
        }
    }

    let mut recipients: Vec<Recipient> = Vec::new();
    for (idx, row) in csv_reader.deserialize::<RecipientRow>().enumerate() {
        // Header occupies file row 1.
        let file_row = idx + 2;
        let row = row.map_err(|e| ImportError::InvalidRow {
            row: file_row,
            reason: e.to_string(),
        })?;

        let recipient = validate_row(&row).map_err(|reason| ImportError::InvalidRow {
            row: file_row,
            reason,
        })?;

        if recipients.iter().any(|r| r.email == recipient.email) {
            continue;
        }
        recipients.push(recipient);
    }

    Ok(recipients)
}

/// Parse, validate, and store an upload. Returns the number of recipients
/// actually added (emails already on file are skipped).
pub async fn import_recipients<R: Read, S: RecipientStore>(
    reader: R,
    store: &S,
) -> Result<usize, ImportError> {
    let recipients = parse_recipients(reader)?;
    let added = store.insert_ignore_conflicts(&recipients).await?;

    tracing::info!(
        parsed = recipients.len(),
        added,
        "recipient import complete"
    );

    Ok(added)
}
