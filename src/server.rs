//! HTTP front door.
//!
//! Two JSON endpoints over the core: `/api/generate` runs the full pipeline,
//! `/api/name` makes the single-shot naming call. Request validation lives
//! entirely here - a malformed body or missing prompt is answered before any
//! stage is invoked, so validation errors never reach the executor.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::gateway::CompletionGateway;
use crate::naming;
use crate::pipeline::{self, NoopObserver};

/// Shared state: the process-wide gateway, constructed once at startup.
#[derive(Clone)]
pub struct AppState {
    gateway: Arc<dyn CompletionGateway>,
}

/// Build the router.
pub fn app(gateway: Arc<dyn CompletionGateway>) -> Router {
    Router::new()
        .route("/api/generate", post(generate_handler))
        .route("/api/name", post(name_handler))
        .route("/health", get(health_handler))
        .with_state(AppState { gateway })
}

/// Bind and serve until the process is stopped.
pub async fn serve(
    addr: SocketAddr,
    gateway: Arc<dyn CompletionGateway>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app(gateway)).await
}

/// Pull a non-empty string prompt out of the request body, or produce the
/// client-error response. Absent, non-string, and blank prompts are all
/// client errors; nothing outbound happens for them.
fn extract_prompt(body: Result<Json<Value>, JsonRejection>) -> Result<String, Response> {
    let Json(body) = body.map_err(|_| {
        client_error("Invalid JSON in request body")
    })?;

    match body.get("prompt") {
        Some(Value::String(prompt)) if !prompt.trim().is_empty() => Ok(prompt.clone()),
        _ => Err(client_error("Prompt is required")),
    }
}

fn client_error(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

fn server_error(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
        .into_response()
}

async fn generate_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let task = match extract_prompt(body) {
        Ok(task) => task,
        Err(response) => return response,
    };

    match pipeline::run_pipeline(state.gateway.as_ref(), &task, &NoopObserver).await {
        Ok(outcome) => Json(json!({ "html": outcome.html })).into_response(),
        Err(err) => {
            tracing::error!(stage = %err.stage(), error = %err, "generation failed");
            server_error(err.to_string())
        }
    }
}

async fn name_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let task = match extract_prompt(body) {
        Ok(task) => task,
        Err(response) => return response,
    };

    match naming::name_game(state.gateway.as_ref(), &task).await {
        Ok(name) => Json(json!({ "name": name })).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "naming failed");
            server_error(err.to_string())
        }
    }
}

async fn health_handler() -> &'static str {
    "ok\n"
}
