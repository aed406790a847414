//! Model Context Protocol gateway: newline-delimited JSON-RPC 2.0 over stdio.

use serde_json::{json, Map, Value};
use slack_sage::slack_sage_core::ToolInvocation;
use slack_sage::Dispatcher;
use slack_sage_adapter_web::SLACK_API_BASE;
use slack_sage_schema::ToolListing;
use std::env;
use std::future::Future;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};
use url::Url;

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "slack-sage";
pub const API_BASE_URL_ENV: &str = "SLACK_SAGE_API_BASE_URL";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("failed to encode message: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Process configuration. Credentials are never part of it.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_base_url: Url,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_base_url(env::var(API_BASE_URL_ENV).ok())
    }

    fn from_base_url(raw: Option<String>) -> Result<Self, GatewayError> {
        let raw = raw
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| SLACK_API_BASE.to_string());
        let api_base_url = Url::parse(raw.trim())
            .map_err(|e| GatewayError::Config(format!("invalid {API_BASE_URL_ENV}: {e}")))?;
        Ok(Self { api_base_url })
    }
}

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            code: -32603,
            message: message.into(),
        }
    }
}

pub struct McpServer {
    dispatcher: Dispatcher,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Serves until the reader reaches EOF. Malformed frames are answered
    /// with JSON-RPC errors and do not stop the loop.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<(), GatewayError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut frame = Vec::new();
        loop {
            frame.clear();
            if reader.read_until(b'\n', &mut frame).await? == 0 {
                break;
            }
            if frame.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            if let Some(response) = self.handle_frame(&frame).await {
                write_message(&mut writer, &response).await?;
            }
        }
        writer.flush().await?;
        Ok(())
    }

    /// Handles one raw frame; `None` for notifications and client responses.
    /// Bytes that are not valid UTF-8 JSON get a parse error.
    pub async fn handle_frame(&self, frame: &[u8]) -> Option<Value> {
        match serde_json::from_slice::<Value>(frame) {
            Ok(incoming) => self.handle_message(incoming).await,
            Err(e) => {
                error!(error = %e, "[MCP Error] unparseable frame");
                Some(error_response(
                    Value::Null,
                    RpcError::parse_error(format!("Parse error: {e}")),
                ))
            }
        }
    }

    async fn handle_message(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            error!("[MCP Error] frame is not a JSON object");
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        let method = obj.get("method").and_then(Value::as_str);
        let Some(id) = obj.get("id").cloned() else {
            debug!(method, "notification received");
            return None;
        };
        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = method else {
            // A response to a request we never send.
            return None;
        };
        let params = obj.get("params").cloned().unwrap_or(Value::Null);

        Some(match self.handle_request(method, params).await {
            Ok(result) => success_response(id, result),
            Err(err) => {
                error!(method, code = err.code, message = %err.message, "[MCP Error] request failed");
                error_response(id, err)
            }
        })
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(initialize_payload(&params)),
            "ping" => Ok(json!({})),
            "tools/list" => self.tools_list_payload(),
            "tools/call" => self.handle_tools_call(params).await,
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn tools_list_payload(&self) -> Result<Value, RpcError> {
        let tools: Vec<ToolListing> = self
            .dispatcher
            .list_tools()
            .iter()
            .map(ToolListing::from)
            .collect();
        let tools = serde_json::to_value(tools).map_err(|e| RpcError::internal(e.to_string()))?;
        Ok(json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let arguments = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        let result = self
            .dispatcher
            .dispatch(ToolInvocation::new(name, arguments))
            .await;
        serde_json::to_value(result).map_err(|e| RpcError::internal(e.to_string()))
    }
}

fn initialize_payload(params: &Value) -> Value {
    let protocol_version = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or(MCP_PROTOCOL_VERSION);
    json!({
        "protocolVersion": protocol_version,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    })
}

async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &Value,
) -> Result<(), GatewayError> {
    let mut body = serde_json::to_vec(message)?;
    body.push(b'\n');
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Why the transport stopped serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    InputClosed,
    Interrupted,
}

/// Serves until the reader reaches EOF or `shutdown` resolves, then shuts
/// the writer down.
pub async fn serve_until<R, W, S>(
    server: &McpServer,
    reader: R,
    mut writer: W,
    shutdown: S,
) -> Result<StopReason, GatewayError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = std::io::Result<()>>,
{
    let reason = tokio::select! {
        served = server.serve(reader, &mut writer) => {
            served?;
            StopReason::InputClosed
        }
        signal = shutdown => {
            signal?;
            StopReason::Interrupted
        }
    };

    writer.shutdown().await?;
    match reason {
        StopReason::Interrupted => info!("interrupt received, channel closed"),
        StopReason::InputClosed => info!("stdin closed, shutting down"),
    }
    Ok(reason)
}

/// Binds the server to stdin/stdout and runs until EOF or ctrl-c.
pub async fn run_stdio(server: &McpServer) -> Result<StopReason, GatewayError> {
    info!("Slack Sage MCP Server running on stdio");
    serve_until(
        server,
        BufReader::new(io::stdin()),
        io::stdout(),
        tokio::signal::ctrl_c(),
    )
    .await
}
