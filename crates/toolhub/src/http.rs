//! HTTP surface: validation, direct tool calls, and registry introspection.

use crate::error::{InvokeError, ValidationError};
use crate::pipeline::{Pipeline, ValidationRequest, ValidationResult};
use axum::{
    Extension, Json, Router,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct HubState {
    pub pipeline: Pipeline,
    /// Cancelled on process shutdown; every request runs under a child token.
    pub shutdown: CancellationToken,
}

pub fn router(state: Arc<HubState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/registry", get(registry))
        .route("/validate", post(validate))
        .route("/call", post(call_tool))
        .layer(Extension(state))
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct RegistryResponse {
    clients: Vec<String>,
    servers: Vec<String>,
}

async fn registry(Extension(state): Extension<Arc<HubState>>) -> Json<RegistryResponse> {
    Json(RegistryResponse {
        clients: state.pipeline.clients().list_known().into_iter().collect(),
        servers: state
            .pipeline
            .servers()
            .list_known_names()
            .into_iter()
            .collect(),
    })
}

/// Always `200`; callers branch on `status` in the body.
///
/// The body is taken as raw JSON so that any shape problem becomes "Invalid Request Payload"
/// instead of an axum rejection.
async fn validate(
    Extension(state): Extension<Arc<HubState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Json<ValidationResult> {
    let decoded = match body {
        Ok(Json(value)) => ValidationRequest::from_json(value),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejected /validate body");
            Err(ValidationError::InvalidRequest)
        }
    };
    let request = match decoded {
        Ok(request) => request,
        Err(e) => return Json(ValidationResult::failure(&e)),
    };

    let cancel = state.shutdown.child_token();
    Json(
        state
            .pipeline
            .validate_and_aggregate(request, &cancel)
            .await,
    )
}

#[derive(Debug, Deserialize)]
struct CallToolRequest {
    server: String,
    tool: String,
    #[serde(default)]
    arguments: Map<String, Value>,
}

async fn call_tool(
    Extension(state): Extension<Arc<HubState>>,
    Json(req): Json<CallToolRequest>,
) -> Response {
    match state
        .pipeline
        .invoke_tool(&req.server, &req.tool, req.arguments)
        .await
    {
        Ok(result) => Json(result).into_response(),
        Err(e @ InvokeError::UnknownServer(_)) => {
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
        Err(e @ InvokeError::MissingCredentials) => {
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e @ InvokeError::Upstream(_)) => {
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}
