use std::time::Duration;

use async_trait::async_trait;
use lotbridge_core::config::AppConfig;
use thiserror::Error;
use tracing::debug;

use crate::protocol::{ChatEnvelope, ChatPayload};

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport send failed: {0}")]
    Send(String),
    #[error("transport peer rejected envelope with status {status}")]
    Rejected { status: u16 },
    #[error("recipient `{0}` is not a deliverable address")]
    InvalidRecipient(String),
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, recipient: &str, payload: ChatPayload) -> Result<(), TransportError>;
}

/// Posts envelopes as JSON to `<endpoint>/submit`, where the endpoint is the
/// recipient itself (direct) or the configured mailbox.
pub struct HttpChatTransport {
    client: reqwest::Client,
    config: AppConfig,
}

impl HttpChatTransport {
    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self { client, config: config.clone() })
    }

    fn submit_url(&self, recipient: &str) -> Result<String, TransportError> {
        let endpoint = self.config.delivery_endpoint(recipient);
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(TransportError::InvalidRecipient(recipient.to_owned()));
        }
        Ok(format!("{}/submit", endpoint.trim_end_matches('/')))
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send(&self, recipient: &str, payload: ChatPayload) -> Result<(), TransportError> {
        let url = self.submit_url(recipient)?;
        let envelope = ChatEnvelope {
            sender: self.config.agent.address.clone(),
            recipient: recipient.to_owned(),
            payload,
        };

        debug!(
            event_name = "egress.chat.envelope_sent",
            recipient = %recipient,
            payload_type = ?envelope.payload.payload_type(),
            url = %url,
            "posting chat envelope"
        );

        let response = self
            .client
            .post(&url)
            .json(&envelope)
            .send()
            .await
            .map_err(|error| TransportError::Send(error.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::Rejected { status: response.status().as_u16() });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use lotbridge_core::config::{AppConfig, TransportMode};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{ChatTransport, HttpChatTransport, TransportError};
    use crate::protocol::{ChatMessage, ChatPayload};

    fn config(mode: TransportMode, mailbox_url: Option<String>) -> AppConfig {
        let mut config = AppConfig::default();
        config.agent.address = "http://127.0.0.1:8001".to_owned();
        config.agent.transport_mode = mode;
        config.agent.mailbox_url = mailbox_url;
        config
    }

    #[tokio::test]
    async fn direct_mode_posts_envelope_to_recipient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .and(body_partial_json(json!({
                "sender": "http://127.0.0.1:8001",
                "recipient": server.uri(),
                "payload": {"kind": "message"}
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpChatTransport::from_config(&config(TransportMode::Direct, None))
            .expect("transport builds");
        transport
            .send(&server.uri(), ChatPayload::Message(ChatMessage::text("hi")))
            .await
            .expect("delivered");
    }

    #[tokio::test]
    async fn mailbox_mode_posts_through_mailbox() {
        let mailbox = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .and(body_partial_json(json!({"recipient": "agent1qxyz"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mailbox)
            .await;

        let transport =
            HttpChatTransport::from_config(&config(TransportMode::Mailbox, Some(mailbox.uri())))
                .expect("transport builds");
        transport
            .send("agent1qxyz", ChatPayload::Message(ChatMessage::text("hi")))
            .await
            .expect("delivered via mailbox");
    }

    #[tokio::test]
    async fn direct_mode_rejects_non_http_recipient() {
        let transport = HttpChatTransport::from_config(&config(TransportMode::Direct, None))
            .expect("transport builds");

        let error = transport
            .send("agent1qxyz", ChatPayload::Message(ChatMessage::text("hi")))
            .await
            .expect_err("not routable");

        assert_eq!(error, TransportError::InvalidRecipient("agent1qxyz".to_owned()));
    }

    #[tokio::test]
    async fn peer_rejection_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let transport = HttpChatTransport::from_config(&config(TransportMode::Direct, None))
            .expect("transport builds");
        let error = transport
            .send(&server.uri(), ChatPayload::Message(ChatMessage::text("hi")))
            .await
            .expect_err("rejected");

        assert_eq!(error, TransportError::Rejected { status: 503 });
    }
}
