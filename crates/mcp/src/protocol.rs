// MCP protocol types and definitions (JSON-RPC 2.0 over Content-Length framed stdio)

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol revision reported by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-05-01";

/// Error code for dispatch, decoding and framing failures.
pub const SERVER_ERROR: i32 = -32000;

/// Error code used only when a response cannot be encoded.
pub const INTERNAL_ERROR: i32 = -32603;

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_LIST_TOOLS: &str = "list_tools";
pub const METHOD_CALL_TOOL: &str = "call_tool";

/// Request id, kept as the exact JSON text the client sent.
pub type RequestId = Box<RawValue>;

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 Response
///
/// `id` is always serialized, byte for byte as the request carried it, or
/// as `null` when the request had none or could not be decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<RequestId>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcError {
    pub fn server_error(message: impl Into<String>) -> Self {
        Self {
            code: SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn method_not_supported(method: &str) -> Self {
        Self::server_error(format!("method {:?} not supported", method))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            code: INTERNAL_ERROR,
            message: message.into(),
        }
    }
}

// MCP-specific protocol messages

/// Tool definition for MCP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// List tools response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<ToolSchema>,
}

/// Call tool request params
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Call tool response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<ToolContent>,
}

impl CallToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
        }
    }

    /// Tool-level failure, reported as `{"error": "<message>"}` text rather
    /// than a JSON-RPC error.
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self::text(serde_json::json!({ "error": message.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ToolContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Initialize response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    pub capabilities: ServerCapabilities,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub tools: ToolsCapability,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsCapability {
    pub list: bool,
    pub call: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "sast-sca-mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(text: &str) -> RequestId {
        RawValue::from_string(text.to_string()).unwrap()
    }

    #[test]
    fn test_response_serializes_null_id() {
        let response = JsonRpcResponse::error(None, JsonRpcError::server_error("boom"));

        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32000,"message":"boom"}}"#
        );
    }

    #[test]
    fn test_success_omits_error() {
        let response = JsonRpcResponse::success(Some(raw("7")), json!({"ok": true}));

        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"jsonrpc":"2.0","id":7,"result":{"ok":true}}"#
        );
    }

    #[test]
    fn test_request_id_keeps_its_text() {
        let request: JsonRpcRequest = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id": 18446744073709551616 ,"method":"initialize"}"#,
        )
        .unwrap();

        assert_eq!(request.id.as_deref().map(RawValue::get), Some("18446744073709551616"));
    }

    #[test]
    fn test_request_without_id_or_params() {
        let request: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"list_tools"}"#).unwrap();

        assert!(request.id.is_none());
        assert!(request.params.is_none());
        assert_eq!(request.method, "list_tools");
    }

    #[test]
    fn test_error_content_is_json_object() {
        let result = CallToolResult::error("argument \"target_path\" must be a non-empty string");
        let ToolContent::Text { text } = &result.content[0];
        let decoded: serde_json::Value = serde_json::from_str(text).unwrap();

        assert_eq!(
            decoded,
            json!({"error": "argument \"target_path\" must be a non-empty string"})
        );
    }

    #[test]
    fn test_tool_content_wire_shape() {
        let value = serde_json::to_value(CallToolResult::text("{}")).unwrap();
        assert_eq!(value, json!({"content": [{"type": "text", "text": "{}"}]}));
    }

    #[test]
    fn test_initialize_wire_shape() {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            server_info: ServerInfo::default(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list: true,
                    call: true,
                },
            },
        };
        let value = serde_json::to_value(result).unwrap();

        assert_eq!(value["protocolVersion"], "2024-05-01");
        assert_eq!(value["serverInfo"]["name"], "sast-sca-mcp");
        assert_eq!(value["capabilities"], json!({"tools": {"list": true, "call": true}}));
    }
}
