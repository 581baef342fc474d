//! Delivery module - rendered documents out to a mailbox.
//!
//! - `body` - the submission summary e-mail
//! - `relay` - HTTP mail-relay transport
//! - `validation` - recipient/subject/attachment checks run before sending
//!
//! Transports are pluggable through [`MailTransport`]; [`deliver`] is the one
//! entry point and refuses to report success without a provider message id.

pub mod body;
pub mod relay;
pub mod validation;

pub use body::{default_subject, submission_summary_html};
pub use relay::HttpRelayTransport;
pub use validation::{validate_message, ValidationError, ValidationErrors};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::info;
use thiserror::Error;

use crate::generators::{RenderedDocument, PDF_CONTENT_TYPE};
use crate::models::RequestRecord;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("message rejected before sending:\n{0}")]
    Validation(String),
    #[error("mail transport failed: {0}")]
    Transport(String),
    #[error("mail transport accepted the message but returned no message id")]
    MissingMessageId,
    #[error("nothing to deliver: the message has no attachments")]
    NoAttachments,
}

/// A file riding along with a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub buffer: Vec<u8>,
    pub content_type: String,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, buffer: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            buffer,
            content_type: content_type.into(),
        }
    }

    pub fn pdf(filename: impl Into<String>, buffer: Vec<u8>) -> Self {
        Self::new(filename, PDF_CONTENT_TYPE, buffer)
    }

    /// Take a rendered document's buffer under a (possibly different)
    /// attachment name.
    pub fn from_document(document: RenderedDocument, filename: impl Into<String>) -> Self {
        Self::new(filename, document.meta.content_type, document.buffer)
    }

    pub fn base64(&self) -> String {
        BASE64.encode(&self.buffer)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutgoingMessage {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
}

impl OutgoingMessage {
    pub fn new<I, S>(to: I, subject: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            to: to.into_iter().map(Into::into).collect(),
            subject: subject.into(),
            ..Default::default()
        }
    }

    /// The standard submission e-mail: summary body, subject derived from the
    /// applicant unless one is given.
    pub fn submission<I, S>(
        to: I,
        subject: Option<String>,
        record: &RequestRecord,
        attachments: Vec<Attachment>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<&str> = attachments.iter().map(|a| a.filename.as_str()).collect();
        let html = submission_summary_html(record, &names);
        let subject = subject
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| default_subject(record));
        Self::new(to, subject)
            .with_html(html)
            .with_attachments(attachments)
    }

    pub fn with_cc<I, S>(mut self, cc: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cc = cc.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = html.into();
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }
}

/// What a transport reports back. Providers that accept a message without
/// assigning an id leave `message_id` empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryReceipt {
    pub message_id: Option<String>,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &OutgoingMessage) -> Result<DeliveryReceipt, DeliveryError>;
}

/// Validate, send, and return the provider's message id.
pub async fn deliver(
    transport: &dyn MailTransport,
    message: &OutgoingMessage,
) -> Result<String, DeliveryError> {
    validate_message(message)
        .into_result()
        .map_err(DeliveryError::Validation)?;
    if message.attachments.is_empty() {
        return Err(DeliveryError::NoAttachments);
    }

    let receipt = transport.send(message).await?;
    let message_id = receipt
        .message_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(DeliveryError::MissingMessageId)?;

    info!(
        "delivered '{}' to {} with {} attachment(s): {message_id}",
        message.subject,
        message.to.join(", "),
        message.attachments.len()
    );
    Ok(message_id)
}
