//! Line-delimited JSON-RPC 2.0 over stdio, speaking the subset of the Model
//! Context Protocol a tool server needs.

pub mod tools;

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::ops::Operations;

const PROTOCOL_VERSION: &str = "2025-06-18";

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

#[derive(Debug, Deserialize)]
struct RpcRequest {
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
struct RpcSuccessResponse {
    jsonrpc: &'static str,
    result: Value,
    id: Value,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RpcError {
    code: i32,
    message: String,
}

impl RpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcErrorResponse {
    jsonrpc: &'static str,
    error: RpcError,
    id: Value,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

pub struct Server {
    ops: Operations,
}

impl Server {
    pub fn new(ops: Operations) -> Self {
        Self { ops }
    }

    /// Handles one request. `None` means the method produces no reply.
    pub async fn handle_method(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Option<std::result::Result<Value, RpcError>> {
        match method {
            "initialize" => Some(Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": { "listChanged": false } },
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION")
                }
            }))),
            "ping" => Some(Ok(json!({}))),
            "tools/list" => Some(Ok(tools::tool_schemas())),
            "tools/call" => Some(self.call_tool(params.unwrap_or(Value::Null)).await),
            m if m.starts_with("notifications/") => None,
            _ => Some(Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("Unknown method: {method}"),
            ))),
        }
    }

    async fn call_tool(&self, params: Value) -> std::result::Result<Value, RpcError> {
        let call: ToolCall = serde_json::from_value(params)
            .map_err(|e| RpcError::new(INVALID_PARAMS, format!("Invalid tool call: {e}")))?;
        tracing::info!("Tool call: {}", call.name);
        let bytes = self
            .ops
            .call(&call.name, call.arguments)
            .await
            .ok_or_else(|| RpcError::new(INVALID_PARAMS, format!("Unknown tool: {}", call.name)))?;
        Ok(json!({
            "content": [{
                "type": "text",
                "text": String::from_utf8_lossy(&bytes)
            }]
        }))
    }

    /// Reads requests line by line until `reader` is exhausted. Each request
    /// runs on its own task; replies are written one line each, in the order
    /// they complete. Requests without an id get no reply.
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let mut tx = Some(tx);
        let mut lines = reader.lines();

        loop {
            tokio::select! {
                line = lines.next_line(), if tx.is_some() => {
                    let Some(line) = line? else {
                        tracing::info!("Input closed, finishing pending requests");
                        // replies stop once every request task drops its sender
                        tx = None;
                        continue;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    tracing::debug!("Received line: {line}");
                    let Some(replies) = tx.clone() else { continue };
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Some(reply) = server.reply_to(&line).await {
                            let _ = replies.send(reply);
                        }
                    });
                }
                Some(reply) = rx.recv() => {
                    writer.write_all(reply.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                    writer.flush().await?;
                }
                else => break,
            }
        }
        tracing::info!("Stopping server");
        Ok(())
    }

    async fn reply_to(&self, line: &str) -> Option<String> {
        let request: RpcRequest = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!("Invalid JSON request: {e}");
                return encode_error(Value::Null, RpcError::new(PARSE_ERROR, e.to_string()));
            }
        };
        tracing::debug!("Parsed request for method: {}", request.method);

        let result = self.handle_method(&request.method, request.params).await?;
        // notifications carry no id and get no reply
        let id = request.id?;
        match result {
            Ok(result) => serde_json::to_string(&RpcSuccessResponse {
                jsonrpc: "2.0",
                result,
                id,
            })
            .ok(),
            Err(error) => encode_error(id, error),
        }
    }
}

fn encode_error(id: Value, error: RpcError) -> Option<String> {
    serde_json::to_string(&RpcErrorResponse {
        jsonrpc: "2.0",
        error,
        id,
    })
    .ok()
}
