//! Chat protocol bridge for the coffee-lot agent
//!
//! - **Protocol** (`protocol`) - envelopes, messages, acknowledgements, content items
//! - **Handler** (`handler`) - acknowledge-first message handling, text answered by the agent
//! - **Transport** (`transport`) - outbound delivery to peers or a mailbox over HTTP
//! - **Runner** (`runner`) - one task per inbound envelope, drained on shutdown
//!
//! ```text
//! POST /submit → mpsc → ChatRunner → ChatProtocolHandler → QueryAnswerer
//!                                          ↓
//!                        ChatTransport ← ack + reply
//! ```

pub mod handler;
pub mod protocol;
pub mod runner;
pub mod transport;

pub use handler::{ChatProtocolHandler, HandlerResult, ProtocolHandlingError};
pub use protocol::{ChatAcknowledgement, ChatContent, ChatEnvelope, ChatMessage, ChatPayload};
pub use runner::ChatRunner;
pub use transport::{ChatTransport, HttpChatTransport, TransportError};
