use axum::{
    body::Bytes, extract::State, http::StatusCode, routing::post, Json, Router,
};
use lotbridge_chat::ChatEnvelope;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct IngressState {
    inbound: mpsc::Sender<ChatEnvelope>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubmitResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

pub fn router(inbound: mpsc::Sender<ChatEnvelope>) -> Router {
    Router::new().route("/submit", post(submit)).with_state(IngressState { inbound })
}

/// Accepts one envelope and hands it to the runner; handling happens
/// after the response is returned.
pub async fn submit(
    State(state): State<IngressState>,
    body: Bytes,
) -> (StatusCode, Json<SubmitResponse>) {
    let envelope: ChatEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(error) => {
            warn!(
                event_name = "ingress.http.envelope_rejected",
                error = %error,
                "rejected malformed chat envelope"
            );
            return (
                StatusCode::BAD_REQUEST,
                Json(SubmitResponse { status: "rejected", detail: Some(error.to_string()) }),
            );
        }
    };

    debug!(
        event_name = "ingress.http.envelope_accepted",
        sender = %envelope.sender,
        payload_type = ?envelope.payload.payload_type(),
        "accepted chat envelope"
    );

    if state.inbound.send(envelope).await.is_err() {
        warn!(event_name = "ingress.http.runner_unavailable", "chat runner has stopped");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(SubmitResponse {
                status: "unavailable",
                detail: Some("chat runner is not accepting envelopes".to_owned()),
            }),
        );
    }

    (StatusCode::ACCEPTED, Json(SubmitResponse { status: "accepted", detail: None }))
}
