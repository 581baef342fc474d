//! Mail over an HTTP relay: the message is posted as JSON, attachments
//! base64-encoded, and the relay answers with the provider's message id.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::{DeliveryError, DeliveryReceipt, MailTransport, OutgoingMessage};
use crate::config::MailConfig;

const USER_AGENT: &str = concat!("acord-pdf-factory/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayAttachment<'a> {
    filename: &'a str,
    content_type: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct RelayPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a str>,
    to: &'a [String],
    #[serde(skip_serializing_if = "no_addresses")]
    cc: &'a [String],
    subject: &'a str,
    html: &'a str,
    attachments: Vec<RelayAttachment<'a>>,
}

fn no_addresses(addresses: &&[String]) -> bool {
    addresses.is_empty()
}

fn payload<'a>(message: &'a OutgoingMessage, from: Option<&'a str>) -> RelayPayload<'a> {
    RelayPayload {
        from,
        to: &message.to,
        cc: &message.cc,
        subject: &message.subject,
        html: &message.html,
        attachments: message
            .attachments
            .iter()
            .map(|a| RelayAttachment {
                filename: &a.filename,
                content_type: &a.content_type,
                content: a.base64(),
            })
            .collect(),
    }
}

/// The relay's answer may carry the id as `id` or `messageId`.
fn message_id(body: &Value) -> Option<String> {
    ["messageId", "id"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

pub struct HttpRelayTransport {
    client: Client,
    url: String,
    token: Option<String>,
    from: Option<String>,
}

impl HttpRelayTransport {
    pub fn new(url: impl Into<String>) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DeliveryError::Transport(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            token: None,
            from: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_from(mut self, from: Option<String>) -> Self {
        self.from = from;
        self
    }

    /// `None` when no relay URL is configured.
    pub fn from_config(config: &MailConfig) -> Result<Option<Self>, DeliveryError> {
        let Some(url) = config.relay_url.as_deref() else {
            return Ok(None);
        };
        Ok(Some(
            Self::new(url)?
                .with_token(config.relay_token.clone())
                .with_from(config.from.clone()),
        ))
    }
}

#[async_trait]
impl MailTransport for HttpRelayTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<DeliveryReceipt, DeliveryError> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&payload(message, self.from.as_deref()));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(format!("relay request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Transport(format!(
                "relay answered {status}: {}",
                detail.trim()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| DeliveryError::Transport(format!("relay response is not JSON: {e}")))?;
        debug!("relay response: {body}");

        Ok(DeliveryReceipt {
            message_id: message_id(&body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::Attachment;
    use serde_json::json;

    #[test]
    fn test_payload_shape() {
        let message = OutgoingMessage::new(["a@b.co"], "Packet")
            .with_html("<p>hi</p>")
            .with_attachments(vec![Attachment::pdf("ACORD-125.pdf", b"%PDF".to_vec())]);

        let value = serde_json::to_value(payload(&message, Some("forms@agency.com"))).unwrap();
        assert_eq!(
            value,
            json!({
                "from": "forms@agency.com",
                "to": ["a@b.co"],
                "subject": "Packet",
                "html": "<p>hi</p>",
                "attachments": [{
                    "filename": "ACORD-125.pdf",
                    "contentType": "application/pdf",
                    "content": "JVBERg=="
                }]
            })
        );
    }

    #[test]
    fn test_message_id_keys() {
        assert_eq!(message_id(&json!({"messageId": "<x@y>"})).as_deref(), Some("<x@y>"));
        assert_eq!(message_id(&json!({"id": "abc"})).as_deref(), Some("abc"));
        assert_eq!(message_id(&json!({"id": 42})).as_deref(), Some("42"));
        assert_eq!(message_id(&json!({"messageId": ""})), None);
        assert_eq!(message_id(&json!({"ok": true})), None);
    }

    #[test]
    fn test_from_config() {
        assert!(HttpRelayTransport::from_config(&MailConfig::default()).unwrap().is_none());

        let config = MailConfig {
            relay_url: Some("http://localhost:8025/send".into()),
            relay_token: Some("secret".into()),
            ..Default::default()
        };
        let transport = HttpRelayTransport::from_config(&config).unwrap().unwrap();
        assert_eq!(transport.url, "http://localhost:8025/send");
        assert_eq!(transport.token.as_deref(), Some("secret"));
    }
}
