use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::handler::{ChatProtocolHandler, HandlerResult};
use crate::protocol::ChatEnvelope;

/// Pumps inbound envelopes into the handler, one task per envelope.
pub struct ChatRunner {
    handler: Arc<ChatProtocolHandler>,
}

impl ChatRunner {
    pub fn new(handler: Arc<ChatProtocolHandler>) -> Self {
        Self { handler }
    }

    /// Runs until the sending side of `inbound` is dropped, then waits for
    /// in-flight envelopes. Returns how many envelopes were handled.
    pub async fn run(&self, mut inbound: mpsc::Receiver<ChatEnvelope>) -> usize {
        info!(event_name = "ingress.chat.runner_started", "chat runner started");
        let mut tasks = JoinSet::new();
        let mut handled = 0;

        loop {
            tokio::select! {
                received = inbound.recv() => {
                    let Some(envelope) = received else {
                        break;
                    };
                    debug!(
                        event_name = "ingress.chat.envelope_queued",
                        sender = %envelope.sender,
                        payload_type = ?envelope.payload.payload_type(),
                        "spawning envelope task"
                    );
                    let handler = self.handler.clone();
                    tasks.spawn(async move { handler.dispatch(envelope).await });
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    handled += record_outcome(joined);
                }
            }
        }

        info!(
            event_name = "ingress.chat.runner_draining",
            in_flight = tasks.len(),
            "inbound channel closed; draining"
        );
        while let Some(joined) = tasks.join_next().await {
            handled += record_outcome(joined);
        }

        info!(event_name = "ingress.chat.runner_stopped", handled, "chat runner stopped");
        handled
    }
}

fn record_outcome(joined: Result<HandlerResult, tokio::task::JoinError>) -> usize {
    match joined {
        Ok(HandlerResult::Recovered { error }) => {
            debug!(error = %error, "envelope handled with error reply");
            1
        }
        Ok(_) => 1,
        Err(error) => {
            warn!(
                event_name = "ingress.chat.task_failed",
                error = %error,
                "envelope task did not complete"
            );
            0
        }
    }
}
