//! Checks run on an outgoing message before it reaches a transport.
//!
//! Every problem is collected so the caller sees the whole list at once
//! rather than fixing one field per attempt.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use super::OutgoingMessage;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s,;<>]+@[^@\s,;<>]+\.[^@\s,;<>]+$").expect("valid regex"))
}

/// One failed check, with an optional hint on how to fix it.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn empty_field(field: &str, label: &str) -> Self {
        Self::new(field, format!("{label} must not be empty"))
            .with_suggestion(format!("Provide a {}", label.to_lowercase()))
    }

    pub fn invalid_email(field: &str, value: &str) -> Self {
        Self::new(field, format!("'{value}' is not a valid e-mail address"))
            .with_suggestion("Use the form name@example.com")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, ". {suggestion}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Default)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// Numbered, one problem per line.
    pub fn to_message(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }

        let mut parts = vec![format!("{} problem(s) found:", self.errors.len())];
        for (i, error) in self.errors.iter().enumerate() {
            parts.push(format!("{}. {}", i + 1, error));
        }
        parts.join("\n")
    }

    pub fn into_result(self) -> Result<(), String> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.to_message())
        }
    }
}

pub fn validate_required(value: &str, field: &str, label: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(ValidationError::empty_field(field, label));
    }
}

pub fn validate_email(value: &str, field: &str, errors: &mut ValidationErrors) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(ValidationError::empty_field(field, "E-mail address"));
        return;
    }
    if !email_re().is_match(trimmed) {
        errors.add(ValidationError::invalid_email(field, trimmed));
    }
}

/// At least one `to` recipient, every address well-formed, a subject, and
/// attachments with names and content.
pub fn validate_message(message: &OutgoingMessage) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if message.to.is_empty() {
        errors.add(
            ValidationError::new("to", "at least one recipient is required")
                .with_suggestion("Pass --email-to or set CARRIER_EMAIL"),
        );
    }
    for (i, address) in message.to.iter().enumerate() {
        validate_email(address, &format!("to[{i}]"), &mut errors);
    }
    for (i, address) in message.cc.iter().enumerate() {
        validate_email(address, &format!("cc[{i}]"), &mut errors);
    }
    validate_required(&message.subject, "subject", "Subject", &mut errors);

    for (i, attachment) in message.attachments.iter().enumerate() {
        validate_required(
            &attachment.filename,
            &format!("attachments[{i}].filename"),
            "Attachment filename",
            &mut errors,
        );
        if attachment.buffer.is_empty() {
            errors.add(ValidationError::new(
                format!("attachments[{i}].buffer"),
                format!("attachment '{}' is empty", attachment.filename),
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::Attachment;

    #[test]
    fn test_display_with_suggestion() {
        let error = ValidationError::empty_field("subject", "Subject");
        assert_eq!(error.to_string(), "[subject] Subject must not be empty. Provide a subject");
    }

    #[test]
    fn test_validate_email() {
        let mut errors = ValidationErrors::new();
        validate_email("underwriting@carrier.com", "to[0]", &mut errors);
        assert!(errors.is_empty());

        validate_email("not-an-address", "to[0]", &mut errors);
        validate_email("a@b.com, c@d.com", "to[1]", &mut errors);
        validate_email("  ", "cc[0]", &mut errors);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_validate_message_collects_everything() {
        let message = OutgoingMessage::new(Vec::<String>::new(), " ")
            .with_cc(["broken"])
            .with_attachments(vec![Attachment::pdf("", Vec::new())]);

        let errors = validate_message(&message);
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["to", "cc[0]", "subject", "attachments[0].filename", "attachments[0].buffer"]
        );

        let message = errors.to_message();
        assert!(message.starts_with("5 problem(s) found:"));
        assert!(message.contains("\n1. [to] at least one recipient is required"));
    }

    #[test]
    fn test_valid_message() {
        let message = OutgoingMessage::new(["a@b.co"], "Submission Packet")
            .with_attachments(vec![Attachment::pdf("ACORD-125.pdf", b"%PDF".to_vec())]);
        assert!(validate_message(&message).into_result().is_ok());
    }
}
