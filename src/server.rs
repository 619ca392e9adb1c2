//! HTTP transport.
//!
//! Exposes the same operations as the stdio transport via a JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/tools/list` | List all operations with schemas |
//! | `POST` | `/tools/{name}` | Call an operation with a JSON argument object |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Domain failures (missing arguments, unknown contacts) are not HTTP errors:
//! they return `200` with `{"result": "<error message>"}`, matching the stdio
//! transport. Transport errors use:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "no tool registered with name: x" } }
//! ```
//!
//! Error codes: `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::operations::{run, OperationKind, ToolInfo};
use crate::pipeline::Pipeline;

/// Build the router. Split out from [`run_server`] so tests can serve it on
/// an ephemeral port.
pub fn router(pipeline: Pipeline) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(pipeline)
}

/// Starts the HTTP server on `bind` and runs until the process is terminated.
pub async fn run_server(pipeline: Pipeline, bind: &str) -> anyhow::Result<()> {
    let app = router(pipeline);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(bind, "http server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ GET /tools/list ============

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

async fn handle_list_tools() -> Json<ToolListResponse> {
    Json(ToolListResponse {
        tools: OperationKind::ALL.iter().map(OperationKind::info).collect(),
    })
}

// ============ POST /tools/{name} ============

/// Returns `404` for unknown operations and `500` for internal failures.
async fn handle_tool_call(
    State(pipeline): State<Pipeline>,
    Path(name): Path<String>,
    Json(args): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let kind = OperationKind::from_name(&name)
        .ok_or_else(|| not_found(format!("no tool registered with name: {}", name)))?;

    let result = match run(&pipeline, kind, &args).await {
        Ok(Ok(value)) => value,
        Ok(Err(rejected)) => Value::String(format!("Error in {name}: {rejected}")),
        Err(e) => {
            error!(tool = %name, error = %e, "tool failed");
            return Err(internal(format!("{}: {}", name, e)));
        }
    };

    Ok(Json(serde_json::json!({ "result": result })))
}
