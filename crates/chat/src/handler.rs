use std::sync::Arc;

use lotbridge_agent::QueryAnswerer;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::{
    ChatAcknowledgement, ChatContent, ChatEnvelope, ChatMessage, ChatPayload,
};
use crate::transport::{ChatTransport, TransportError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolHandlingError {
    #[error("failed to acknowledge message: {0}")]
    Acknowledge(TransportError),
    #[error("failed to send reply: {0}")]
    Reply(TransportError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    /// The message was handled and `replies` text answers went out.
    Responded { replies: usize },
    /// Observed only; nothing was sent beyond the acknowledgement.
    Processed,
    /// Handling failed part way and an error message was sent back instead.
    Recovered { error: ProtocolHandlingError },
}

/// Per-message protocol: acknowledge first, then walk the content items.
pub struct ChatProtocolHandler {
    transport: Arc<dyn ChatTransport>,
    answerer: Arc<dyn QueryAnswerer>,
}

impl ChatProtocolHandler {
    pub fn new(transport: Arc<dyn ChatTransport>, answerer: Arc<dyn QueryAnswerer>) -> Self {
        Self { transport, answerer }
    }

    pub async fn dispatch(&self, envelope: ChatEnvelope) -> HandlerResult {
        match envelope.payload {
            ChatPayload::Message(message) => self.handle_message(&envelope.sender, message).await,
            ChatPayload::Acknowledgement(ack) => {
                self.handle_acknowledgement(&envelope.sender, &ack);
                HandlerResult::Processed
            }
        }
    }

    pub async fn handle_message(&self, sender: &str, message: ChatMessage) -> HandlerResult {
        info!(
            event_name = "ingress.chat.message_received",
            correlation_id = %message.msg_id,
            sender = %sender,
            content_items = message.content.len(),
            "received chat message"
        );

        match self.process(sender, &message).await {
            Ok(result) => result,
            Err(error) => {
                warn!(
                    event_name = "ingress.chat.handling_failed",
                    correlation_id = %message.msg_id,
                    sender = %sender,
                    error = %error,
                    "chat message handling failed; notifying sender"
                );
                self.send_error_reply(sender, message.msg_id, &error).await;
                HandlerResult::Recovered { error }
            }
        }
    }

    /// Replies to our own outbound messages. Nothing to do beyond recording them.
    pub fn handle_acknowledgement(&self, sender: &str, ack: &ChatAcknowledgement) {
        info!(
            event_name = "ingress.chat.acknowledgement_received",
            correlation_id = %ack.acknowledged_msg_id,
            sender = %sender,
            metadata = ?ack.metadata,
            "received chat acknowledgement"
        );
    }

    async fn process(
        &self,
        sender: &str,
        message: &ChatMessage,
    ) -> Result<HandlerResult, ProtocolHandlingError> {
        self.transport
            .send(sender, ChatPayload::Acknowledgement(ChatAcknowledgement::for_message(message)))
            .await
            .map_err(ProtocolHandlingError::Acknowledge)?;
        debug!(
            event_name = "ingress.chat.ack_sent",
            correlation_id = %message.msg_id,
            sender = %sender,
            "acknowledged chat message"
        );

        let mut replies = 0;
        for item in &message.content {
            match item {
                ChatContent::StartSession => {
                    info!(
                        event_name = "ingress.chat.session_started",
                        correlation_id = %message.msg_id,
                        sender = %sender,
                        "chat session started"
                    );
                }
                ChatContent::Text { text } => {
                    let answer = self.answerer.answer(text).await;
                    let reply = ChatMessage::text(answer);
                    let reply_id = reply.msg_id;
                    self.transport
                        .send(sender, ChatPayload::Message(reply))
                        .await
                        .map_err(ProtocolHandlingError::Reply)?;
                    info!(
                        event_name = "egress.chat.reply_sent",
                        correlation_id = %message.msg_id,
                        reply_id = %reply_id,
                        sender = %sender,
                        "sent chat reply"
                    );
                    replies += 1;
                }
                other => {
                    debug!(
                        event_name = "ingress.chat.content_ignored",
                        correlation_id = %message.msg_id,
                        content_kind = other.kind(),
                        "ignoring chat content item"
                    );
                }
            }
        }

        Ok(if replies == 0 { HandlerResult::Processed } else { HandlerResult::Responded { replies } })
    }

    async fn send_error_reply(&self, sender: &str, correlation_id: Uuid, error: &ProtocolHandlingError) {
        let notice = ChatMessage::text(format!("An error occurred: {error}"));
        if let Err(send_error) = self.transport.send(sender, ChatPayload::Message(notice)).await {
            warn!(
                event_name = "egress.chat.error_reply_failed",
                correlation_id = %correlation_id,
                sender = %sender,
                error = %send_error,
                "could not deliver error reply"
            );
        }
    }
}
