//! Mock backend for integration testing.
//!
//! Serves the two overlay endpoints from an in-process Axum server on an
//! ephemeral port. Responses are fully controllable from test code and
//! every requested id is recorded.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// A canned response.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(StatusCode, Value),
    Raw(StatusCode, &'static str),
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Json(status, body) => (status, Json(body)).into_response(),
            Reply::Raw(status, body) => (status, body).into_response(),
        }
    }
}

#[derive(Default)]
struct MockState {
    bankrolls: HashMap<String, Reply>,
    sessions: HashMap<String, Reply>,
    requested: Vec<String>,
    /// If set, every request gets this status.
    force_status: Option<StatusCode>,
}

type Shared = Arc<Mutex<MockState>>;

/// A fake overlay backend listening on 127.0.0.1.
pub struct MockBackend {
    pub base_url: String,
    state: Shared,
    server: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));
        let app = Router::new()
            .route("/api/obs/bankroll/:id", get(bankroll))
            .route("/api/obs/session/:id/active", get(session))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            server,
        }
    }

    /// Register a successful bankroll + session pair for `id`.
    pub fn set_live(&self, id: &str, bankroll: Value, session: Value) {
        self.set_bankroll(
            id,
            Reply::Json(StatusCode::OK, json!({ "success": true, "data": bankroll })),
        );
        self.set_session(
            id,
            Reply::Json(StatusCode::OK, json!({ "success": true, "data": session })),
        );
    }

    pub fn set_bankroll(&self, id: &str, reply: Reply) {
        self.state.lock().unwrap().bankrolls.insert(id.to_string(), reply);
    }

    pub fn set_session(&self, id: &str, reply: Reply) {
        self.state.lock().unwrap().sessions.insert(id.to_string(), reply);
    }

    /// Force all subsequent requests to return `status`.
    pub fn set_error(&self, status: StatusCode) {
        self.state.lock().unwrap().force_status = Some(status);
    }

    pub fn clear_error(&self) {
        self.state.lock().unwrap().force_status = None;
    }

    /// Ids seen so far, decoded, in request order.
    pub fn requested_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().requested.clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn not_found() -> Reply {
    Reply::Json(
        StatusCode::NOT_FOUND,
        json!({ "success": false, "error": "not found" }),
    )
}

fn lookup(state: &Shared, id: String, pick: fn(&MockState) -> &HashMap<String, Reply>) -> Reply {
    let mut s = state.lock().unwrap();
    s.requested.push(id.clone());
    if let Some(status) = s.force_status {
        return Reply::Raw(status, "forced error");
    }
    pick(&s).get(&id).cloned().unwrap_or_else(not_found)
}

async fn bankroll(State(state): State<Shared>, Path(id): Path<String>) -> Reply {
    lookup(&state, id, |s| &s.bankrolls)
}

async fn session(State(state): State<Shared>, Path(id): Path<String>) -> Reply {
    lookup(&state, id, |s| &s.sessions)
}
