//! Email message types and builder.

use serde::{Deserialize, Serialize};

use super::MailError;

/// The body content of an email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EmailBody {
    /// Plain text only.
    Text(String),
    /// HTML only.
    Html(String),
}

/// A file attached to an email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    /// MIME type, e.g. `text/csv`.
    pub content_type: String,
    pub content: Vec<u8>,
}

/// A complete email message ready to send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    /// Primary recipients.
    pub to: Vec<String>,
    /// Email subject line.
    pub subject: String,
    /// Email body content.
    pub body: EmailBody,
    /// Attached files.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Sender address. When absent, the mailer's configured default is used.
    #[serde(default)]
    pub from: Option<String>,
}

impl Email {
    /// Create a new email builder.
    pub fn builder() -> EmailBuilder {
        EmailBuilder::default()
    }
}

/// Builder for constructing [`Email`] instances.
#[derive(Debug, Default)]
pub struct EmailBuilder {
    to: Vec<String>,
    subject: Option<String>,
    text: Option<String>,
    html: Option<String>,
    attachments: Vec<Attachment>,
    from: Option<String>,
}

impl EmailBuilder {
    /// Add a primary recipient.
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }

    /// Set the subject line.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set plain text body content.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set HTML body content.
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Attach a file.
    pub fn attachment(
        mut self,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        self.attachments.push(Attachment {
            filename: filename.into(),
            content_type: content_type.into(),
            content,
        });
        self
    }

    /// Set the sender address (optional; mailer default applies otherwise).
    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self
    }

    /// Build the email, validating required fields.
    pub fn build(self) -> Result<Email, MailError> {
        if self.to.is_empty() {
            return Err(MailError::Build("at least one recipient required".into()));
        }

        let subject = self
            .subject
            .ok_or_else(|| MailError::Build("subject required".into()))?;

        let body = match (self.text, self.html) {
            (_, Some(html)) => EmailBody::Html(html),
            (Some(text), None) => EmailBody::Text(text),
            (None, None) => return Err(MailError::Build("body required (text or html)".into())),
        };

        Ok(Email {
            to: self.to,
            subject,
            body,
            attachments: self.attachments,
            from: self.from,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_text_email() {
        let email = Email::builder()
            .to("user@example.com")
            .subject("Hello")
            .text("Body text")
            .build()
            .unwrap();

        assert_eq!(email.to, vec!["user@example.com"]);
        assert_eq!(email.subject, "Hello");
        assert!(email.from.is_none());
        assert!(matches!(email.body, EmailBody::Text(t) if t == "Body text"));
    }

    #[test]
    fn build_email_with_attachment() {
        let email = Email::builder()
            .to("admin@example.com")
            .subject("Report")
            .text("Attached.")
            .attachment("report.csv", "text/csv", b"a,b\n1,2\n".to_vec())
            .build()
            .unwrap();

        assert_eq!(email.attachments.len(), 1);
        assert_eq!(email.attachments[0].filename, "report.csv");
        assert_eq!(email.attachments[0].content_type, "text/csv");
    }

    #[test]
    fn html_wins_over_text() {
        let email = Email::builder()
            .to("a@b.com")
            .subject("Test")
            .text("Plain")
            .html("<p>Rich</p>")
            .build()
            .unwrap();

        assert!(matches!(email.body, EmailBody::Html(h) if h == "<p>Rich</p>"));
    }

    #[test]
    fn build_requires_recipient() {
        let result = Email::builder().subject("Hi").text("Body").build();
        assert!(result.is_err());
    }

    #[test]
    fn build_requires_subject() {
        let result = Email::builder().to("a@b.com").text("Body").build();
        assert!(result.is_err());
    }

    #[test]
    fn build_requires_body() {
        let result = Email::builder().to("a@b.com").subject("Hi").build();
        assert!(result.is_err());
    }
}
