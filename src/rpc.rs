//! Line-delimited JSON-RPC over stdio.
//!
//! Each input line is one JSON-RPC request; each response is written as one
//! line. Requests are handled strictly one at a time. Malformed lines and
//! notifications produce no output. Logs go to stderr so stdout carries
//! nothing but responses.
//!
//! # Methods
//!
//! | Method | Result |
//! |--------|--------|
//! | `initialize` | protocol version, capabilities, server info |
//! | `tools/list` | every [`OperationKind`] with its input schema |
//! | `tools/call` | `{content: [{type: "text", text}]}` |
//!
//! Unknown methods and tools answer `-32601`; internal failures `-32603`.

use anyhow::Result;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use crate::operations::{run, OperationKind};
use crate::pipeline::Pipeline;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INTERNAL_ERROR: i64 = -32603;

/// Serve requests from `reader` until EOF.
pub async fn serve<R, W>(pipeline: &Pipeline, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("stdio server ready");
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let request: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "discarding malformed request line");
                continue;
            }
        };
        if let Some(response) = handle_request(pipeline, &request).await {
            let mut out = serde_json::to_vec(&response)?;
            out.push(b'\n');
            writer.write_all(&out).await?;
            writer.flush().await?;
        }
    }
    info!("stdin closed, stdio server exiting");
    Ok(())
}

fn success(id: Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

fn failure(id: Value, code: i64, message: String) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
}

/// Handle one decoded request. Returns `None` when no response is due.
pub async fn handle_request(pipeline: &Pipeline, request: &Value) -> Option<Value> {
    let Some(method) = request.get("method").and_then(Value::as_str) else {
        warn!("discarding request without a method");
        return None;
    };
    if method.starts_with("notifications/") {
        debug!(method, "notification");
        return None;
    }
    let id = request.get("id").cloned().unwrap_or(json!(0));
    let params = request.get("params").cloned().unwrap_or(json!({}));

    let response = match method {
        "initialize" => success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "lead-intake", "version": env!("CARGO_PKG_VERSION")}
            }),
        ),
        "tools/list" => {
            let tools: Vec<_> = OperationKind::ALL.iter().map(OperationKind::info).collect();
            success(id, json!({ "tools": tools }))
        }
        "tools/call" => call_tool(pipeline, id, &params).await,
        other => failure(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
    };
    Some(response)
}

async fn call_tool(pipeline: &Pipeline, id: Value, params: &Value) -> Value {
    let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
    let Some(kind) = OperationKind::from_name(name) else {
        return failure(id, METHOD_NOT_FOUND, format!("Unknown tool: {name}"));
    };
    let args = params.get("arguments").cloned().unwrap_or(json!({}));

    let text = match run(pipeline, kind, &args).await {
        Ok(Ok(value)) => serde_json::to_string_pretty(&value).unwrap_or_else(|e| e.to_string()),
        Ok(Err(rejected)) => {
            info!(tool = name, reason = %rejected, "request rejected");
            format!("Error in {name}: {rejected}")
        }
        Err(e) => {
            error!(tool = name, error = %e, "tool failed");
            return failure(id, INTERNAL_ERROR, format!("Internal error: {e}"));
        }
    };
    success(id, json!({"content": [{"type": "text", "text": text}]}))
}
