//! HTTP router and WebSocket transport adapter.
//!
//! Bridges raw WebSocket frames to the relay engine: inbound text frames
//! are decoded into relay events, outbound events are serialized and
//! forwarded, and socket closure triggers session teardown.

use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use pulse_core::error::ErrorKind;
use pulse_relay::RelayEngine;
use pulse_relay::message::types::{InboundEvent, OutboundEvent};

/// Builds the HTTP router for the relay.
pub fn build_router(engine: RelayEngine) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

/// Query parameters for WebSocket connections.
#[derive(Debug, serde::Deserialize)]
struct WsQuery {
    /// Opaque credential forwarded to the identity verifier. Optional;
    /// connections without one are subject to the anonymous policy.
    token: Option<String>,
}

/// GET /api/health — liveness plus relay occupancy counters.
async fn health_handler(State(engine): State<RelayEngine>) -> axum::Json<serde_json::Value> {
    axum::Json(json!({
        "status": "ok",
        "connections": engine.connections.connection_count(),
        "online_users": engine.connections.online_user_count(),
        "sessions": engine.sessions.session_count(),
        "groups": engine.groups.group_count(),
    }))
}

/// GET /ws?token={credential} — WebSocket upgrade
async fn ws_handler(
    State(engine): State<RelayEngine>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Response {
    ws.on_upgrade(move |socket| handle_ws_connection(engine, query.token, socket))
}

/// Drives one established WebSocket connection.
async fn handle_ws_connection(engine: RelayEngine, credential: Option<String>, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Open the session before accepting any frames. A rejected credential
    // produces a single error frame and a close, with no relay state left
    // behind.
    let opened = match engine.sessions.connect(credential).await {
        Ok(opened) => opened,
        Err(e) => {
            warn!(error = %e, "WebSocket connection rejected");
            let event = OutboundEvent::Error {
                code: e.kind.to_string(),
                message: e.message,
            };
            if let Ok(text) = serde_json::to_string(&event) {
                let _ = ws_tx.send(Message::Text(text.into())).await;
            }
            let _ = ws_tx.send(Message::Close(None)).await;
            return;
        }
    };

    let conn_id = opened.handle.id;
    let user_id = opened.handle.user_id;
    let mut outbound_rx = opened.events;

    info!(
        conn_id = %conn_id,
        user_id = %user_id,
        "WebSocket connection established"
    );

    // Spawn outbound event forwarder
    let outbound_task = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize outbound event");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.send(Message::Close(None)).await;
    });

    // Process inbound frames until the client goes away or shutdown is
    // signaled.
    let mut shutdown_rx = engine.shutdown_receiver();
    loop {
        tokio::select! {
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<InboundEvent>(&text) {
                            Ok(event) => engine.sessions.handle_event(conn_id, event).await,
                            Err(e) => {
                                warn!(conn_id = %conn_id, error = %e, "Malformed inbound frame");
                                engine.router.to_connection(
                                    conn_id,
                                    OutboundEvent::Error {
                                        code: ErrorKind::Validation.to_string(),
                                        message: format!("Malformed event: {e}"),
                                    },
                                );
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }

    // Cleanup
    engine.sessions.disconnect(conn_id);
    outbound_task.abort();

    info!(
        conn_id = %conn_id,
        user_id = %user_id,
        "WebSocket connection closed"
    );
}
