//! HTTP route handlers.
//!
//! JSON in, JSON out, except `/api/stream` which answers with server-sent
//! events, one JSON-encoded `StreamEvent` per SSE message.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::agent::PolymarketAgent;
use crate::types::{Capabilities, StreamEvent};

pub type AppState = Arc<PolymarketAgent>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct QueryBody {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamBody {
    pub query: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/capabilities
pub async fn get_capabilities() -> Json<Capabilities> {
    Json(PolymarketAgent::capabilities())
}

/// POST /api/query
pub async fn post_query(
    State(agent): State<AppState>,
    Json(body): Json<QueryBody>,
) -> Json<QueryResponse> {
    let content = agent.run(&body.query).await;
    Json(QueryResponse { content })
}

/// POST /api/stream
pub async fn post_stream(
    State(agent): State<AppState>,
    Json(body): Json<StreamBody>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let conversation_id = body
        .conversation_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let task_id = body
        .task_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let events = async_stream::stream! {
        let inner = agent.stream(body.query, conversation_id, task_id);
        futures::pin_mut!(inner);
        while let Some(event) = inner.next().await {
            yield Ok::<_, Infallible>(to_sse(&event));
        }
    };

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

fn to_sse(event: &StreamEvent) -> Event {
    match Event::default().json_data(event) {
        Ok(e) => e,
        Err(err) => {
            warn!(error = %err, "Failed to encode stream event");
            Event::default().data(r#"{"type":"error","content":"unencodable event"}"#)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
