//! Request handlers for the sync and queue endpoints.

use crate::config::ServerConfig;
use axum::body::Bytes;
use axum::extract::rejection::FormRejection;
use axum::extract::{DefaultBodyLimit, Form, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use filesync_core::{FileExecutor, SourceResolver};
use filesync_engine::{DeliveryService, Submission};
use filesync_protocol::{Operation, SyncResponse};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// State behind `/api/sync`.
pub struct ReceiverContext {
    /// Executor applying received operations.
    pub executor: Arc<FileExecutor>,
}

impl ReceiverContext {
    /// Creates a new receiver context.
    pub fn new(executor: Arc<FileExecutor>) -> Self {
        Self { executor }
    }
}

/// State behind `/api/queue`.
pub struct SenderContext {
    /// Reads put/patch content from the source root.
    pub resolver: SourceResolver,
    /// Accepts resolved operations for delivery.
    pub delivery: Arc<DeliveryService>,
    /// Peer written into operations that name none.
    pub destination: String,
}

impl SenderContext {
    /// Creates a new sender context.
    pub fn new(
        resolver: SourceResolver,
        delivery: Arc<DeliveryService>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            delivery,
            destination: destination.into(),
        }
    }
}

/// Router for the mutual-TLS listener.
pub fn sync_router(context: Arc<ReceiverContext>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/api/sync", post(handle_sync))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .with_state(context)
}

/// Router for the plain listener.
pub fn queue_router(context: Arc<SenderContext>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/api/queue", get(handle_queue).post(handle_queue))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .with_state(context)
}

async fn handle_sync(State(context): State<Arc<ReceiverContext>>, body: Bytes) -> Response {
    let operation = match Operation::from_json(&body) {
        Ok(operation) => operation,
        Err(e) => {
            warn!(error = %e, "rejecting undecodable operation");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };
    debug!(id = ?operation.id, operation = %operation, retry_count = operation.retry_count, "received operation");

    let executor = Arc::clone(&context.executor);
    let applied = operation.clone();
    let response = tokio::task::spawn_blocking(move || executor.respond(&applied))
        .await
        .unwrap_or_else(|e| {
            error!(operation = %operation, error = %e, "executor task failed");
            SyncResponse::failed(&operation, 500, format!("executor task failed: {e}"))
        });

    info!(
        verb = %response.verb,
        path = %response.path,
        status_code = response.status_code,
        "sync request handled"
    );
    Json(response).into_response()
}

/// Parameters of `/api/queue`, from the query string or a form body.
#[derive(Debug, Default, Deserialize)]
pub struct QueueParams {
    /// Instruction, `verb:path[:newpath]`.
    #[serde(default)]
    pub value: String,
    /// `true` to downgrade existence preconditions to warnings.
    #[serde(default)]
    pub force: Option<String>,
    /// `true` to answer `ok` without doing anything.
    #[serde(default)]
    pub debug: Option<String>,
}

impl QueueParams {
    /// Fills anything `self` leaves unset from `fallback`.
    fn or(self, fallback: QueueParams) -> Self {
        Self {
            value: if self.value.is_empty() {
                fallback.value
            } else {
                self.value
            },
            force: self.force.or(fallback.force),
            debug: self.debug.or(fallback.debug),
        }
    }
}

fn is_true(flag: Option<&str>) -> bool {
    flag.is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

async fn handle_queue(
    State(context): State<Arc<SenderContext>>,
    Query(query): Query<QueueParams>,
    body: Result<Form<QueueParams>, FormRejection>,
) -> Response {
    // Body fields win over the query string; a POST may carry only the latter.
    let params = match body {
        Ok(Form(body)) => body.or(query),
        Err(FormRejection::InvalidFormContentType(_)) => query,
        Err(rejection) => return rejection.into_response(),
    };
    if is_true(params.debug.as_deref()) {
        info!(value = %params.value, "debug queue request");
        return "ok".into_response();
    }

    let resolver = context.resolver.clone();
    let value = params.value.clone();
    let resolved = match tokio::task::spawn_blocking(move || resolver.resolve_str(&value)).await {
        Ok(resolved) => resolved,
        Err(e) => {
            error!(value = %params.value, error = %e, "resolver task failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let mut operation = match resolved {
        Ok(operation) => operation,
        Err(e) => {
            warn!(value = %params.value, error = %e, "rejecting instruction");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };
    if is_true(params.force.as_deref()) {
        operation.force = true;
    }
    if operation.destination.is_empty() {
        operation.destination = context.destination.clone();
    }

    match context.delivery.submit(operation).await {
        Ok(Submission::Queued(id)) => {
            info!(id = %id, value = %params.value, "instruction queued");
            format!("queued {id}").into_response()
        }
        Ok(Submission::Dispatched) => {
            info!(value = %params.value, "instruction dispatched");
            "ok".into_response()
        }
        Err(e) => {
            error!(value = %params.value, error = %e, "could not submit operation");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
