use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use lotbridge_chat::ChatEnvelope;
use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct HealthState {
    agent_name: String,
    inbound: mpsc::Sender<ChatEnvelope>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub ingress: HealthCheck,
    pub checked_at: String,
}

pub fn router(agent_name: String, inbound: mpsc::Sender<ChatEnvelope>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { agent_name, inbound })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let ingress = ingress_check(&state.inbound);
    let ready = ingress.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: format!("{} runtime initialized", state.agent_name),
        },
        ingress,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn ingress_check(inbound: &mpsc::Sender<ChatEnvelope>) -> HealthCheck {
    if inbound.is_closed() {
        HealthCheck { status: "degraded", detail: "chat runner is not accepting envelopes".to_owned() }
    } else {
        HealthCheck {
            status: "ready",
            detail: format!("{} envelope slots free", inbound.capacity()),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use tokio::sync::mpsc;

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_returns_ready_while_runner_is_listening() {
        let (inbound, _receiver) = mpsc::channel(4);

        let (status, Json(payload)) =
            health(State(HealthState { agent_name: "coffee-lot-agent".to_owned(), inbound })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.ingress.status, "ready");
        assert!(payload.service.detail.contains("coffee-lot-agent"));
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_runner_is_gone() {
        let (inbound, receiver) = mpsc::channel(4);
        drop(receiver);

        let (status, Json(payload)) =
            health(State(HealthState { agent_name: "coffee-lot-agent".to_owned(), inbound })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.ingress.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }
}
