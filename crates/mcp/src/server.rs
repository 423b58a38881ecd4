// MCP server: a sequential read-dispatch-write loop over framed stdio

use crate::framing::{ContentLengthCodec, FrameReader};
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, ServerCapabilities, ServerInfo, ToolsCapability,
    INTERNAL_ERROR, JSONRPC_VERSION, METHOD_CALL_TOOL, METHOD_INITIALIZE, METHOD_LIST_TOOLS,
    PROTOCOL_VERSION,
};
use crate::tools::{ToolArguments, ToolRegistry};
use anyhow::{Context, Result};
use bytes::Bytes;
use futures::SinkExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct McpServer {
    registry: ToolRegistry,
    server_info: ServerInfo,
    max_frame_bytes: usize,
    shutdown: CancellationToken,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            server_info: ServerInfo::default(),
            max_frame_bytes: usize::MAX,
            shutdown: CancellationToken::new(),
        }
    }

    /// Reject message bodies larger than `limit` bytes.
    pub fn with_max_frame_bytes(mut self, limit: usize) -> Self {
        self.max_frame_bytes = limit;
        self
    }

    /// Stop serving, and kill any running scan, once `token` is cancelled.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Serve over the process's stdin and stdout.
    pub async fn start(&self) -> Result<()> {
        info!("MCP server listening on stdio");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Answer framed requests from `reader` on `writer` until end of input.
    ///
    /// Each request is answered before the next frame is read.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut frames = FrameReader::new(reader, ContentLengthCodec::new(self.max_frame_bytes));
        let mut sink = FramedWrite::new(writer, ContentLengthCodec::new(self.max_frame_bytes));

        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                next = frames.next_frame() => next,
            };

            let response = match next {
                Ok(Some(body)) => self.handle_message(&body).await,
                Ok(None) => {
                    debug!("End of input, shutting down");
                    break;
                }
                Err(e) if e.is_fatal() => {
                    return Err(e).context("Failed to read request frame");
                }
                Err(e) => {
                    warn!("Framing error: {}", e);
                    JsonRpcResponse::error(
                        None,
                        JsonRpcError::server_error(format!("protocol error: {}", e)),
                    )
                }
            };

            sink.send(encode_response(&response))
                .await
                .context("Failed to write response frame")?;

            if self.shutdown.is_cancelled() {
                break;
            }
        }

        Ok(())
    }

    /// Decode one message body and produce its response.
    pub async fn handle_message(&self, body: &[u8]) -> JsonRpcResponse {
        match serde_json::from_slice::<JsonRpcRequest>(body) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                warn!("Undecodable request: {}", e);
                JsonRpcResponse::error(
                    None,
                    JsonRpcError::server_error(format!("decode request: {}", e)),
                )
            }
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let JsonRpcRequest {
            id, method, params, ..
        } = request;
        debug!(method = %method, id = ?id, "Handling request");

        let result = match method.as_str() {
            METHOD_INITIALIZE => serde_json::to_value(self.initialize()),
            METHOD_LIST_TOOLS => serde_json::to_value(self.list_tools()),
            METHOD_CALL_TOOL => serde_json::to_value(self.call_tool(params).await),
            other => {
                warn!(method = other, "Unsupported method");
                return JsonRpcResponse::error(id, JsonRpcError::method_not_supported(other));
            }
        };

        match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
        }
    }

    fn initialize(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            server_info: self.server_info.clone(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list: true,
                    call: true,
                },
            },
        }
    }

    fn list_tools(&self) -> ListToolsResult {
        ListToolsResult {
            tools: self.registry.list_schemas(),
        }
    }

    /// Tool failures of every kind come back as `{"error": ...}` content,
    /// never as a JSON-RPC error.
    async fn call_tool(&self, params: Option<serde_json::Value>) -> CallToolResult {
        let params: CallToolParams =
            match serde_json::from_value(params.unwrap_or(serde_json::Value::Null)) {
                Ok(params) => params,
                Err(e) => return CallToolResult::error(format!("decode call_tool params: {}", e)),
            };

        let arguments = ToolArguments::new(params.arguments.unwrap_or_default());
        let cancel = self.shutdown.child_token();

        match self.registry.call(&params.name, &arguments, &cancel).await {
            Ok(output) => {
                debug!(tool = %params.name, bytes = output.len(), "Tool call succeeded");
                CallToolResult::text(String::from_utf8_lossy(&output).into_owned())
            }
            Err(e) => {
                warn!(tool = %params.name, "Tool call failed: {}", e);
                CallToolResult::error(e)
            }
        }
    }
}

/// Serialize a response, degrading to a bare internal error if that fails.
fn encode_response(response: &JsonRpcResponse) -> Bytes {
    match serde_json::to_vec(response) {
        Ok(body) => Bytes::from(body),
        Err(e) => {
            let fallback = serde_json::json!({
                "jsonrpc": JSONRPC_VERSION,
                "error": { "code": INTERNAL_ERROR, "message": e.to_string() }
            });
            Bytes::from(fallback.to_string())
        }
    }
}
