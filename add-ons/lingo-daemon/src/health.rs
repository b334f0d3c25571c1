//! Health endpoint: `GET /` reports liveness plus the supervised worker.

use crate::supervisor::SupervisorSnapshot;
use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct HealthState {
    service_name: Arc<str>,
    worker: watch::Receiver<SupervisorSnapshot>,
}

impl HealthState {
    pub fn new(service_name: impl Into<String>, worker: watch::Receiver<SupervisorSnapshot>) -> Self {
        Self {
            service_name: Arc::from(service_name.into()),
            worker,
        }
    }
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/", get(health)).with_state(state)
}

async fn health(State(state): State<HealthState>) -> Json<serde_json::Value> {
    let snapshot = state.worker.borrow().clone();
    let record = snapshot.record.as_ref();

    Json(serde_json::json!({
        "status": format!("{} running.", state.service_name),
        "worker": {
            "state": snapshot.state,
            "pid": record.and_then(|r| r.pid),
            "started_at": record.map(|r| r.started_at),
            "restarts": snapshot.restarts,
            "last_exit_code": record.and_then(|r| r.last_exit_code),
        }
    }))
}
