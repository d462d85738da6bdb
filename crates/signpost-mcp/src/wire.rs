// crates/signpost-mcp/src/wire.rs
// ============================================================================
// Module: MCP Wire Shapes
// Description: JSON-RPC envelopes and error-code taxonomy for tool execution.
// Purpose: Provide stable request/response shapes and verbatim error codes.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! JSON-RPC 2.0 envelope types for the MCP transport. Server error codes are
//! preserved verbatim so callers can branch on the exact value; the
//! [`RpcErrorCode`] classification is a convenience layered on top, never a
//! replacement for the raw code. Security posture: response envelopes are
//! untrusted input and must be treated as hostile until parsed and checked.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// JSON-RPC protocol version tag sent on every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC method for invoking a tool.
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// JSON-RPC method for enumerating a server's tools.
pub const METHOD_TOOLS_LIST: &str = "tools/list";

/// JSON-RPC method for retrieving one tool's schema.
pub const METHOD_TOOLS_GET: &str = "tools/get";

// ============================================================================
// SECTION: Envelopes
// ============================================================================

/// JSON-RPC request envelope.
///
/// # Invariants
/// - `id` is unique within the lifetime of the sending client.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    /// JSON-RPC version tag.
    pub jsonrpc: &'static str,
    /// Correlation identifier.
    pub id: u64,
    /// Method name to invoke.
    pub method: &'a str,
    /// Optional parameters payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// JSON-RPC response envelope.
///
/// # Invariants
/// - Exactly one of `result` and `error` is expected; violations surface as
///   protocol errors in the client.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    /// Echoed correlation identifier.
    #[serde(default)]
    pub id: Option<u64>,
    /// Success payload.
    #[serde(default)]
    pub result: Option<Value>,
    /// Error payload.
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error payload.
///
/// # Invariants
/// - `code` is preserved verbatim from the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i64,
    /// Error message provided by the server.
    pub message: String,
    /// Optional application-defined detail.
    #[serde(default)]
    pub data: Option<Value>,
}

// ============================================================================
// SECTION: Result Payloads
// ============================================================================

/// One tool as described by a server's `tools/list` response.
///
/// # Invariants
/// - Values are untrusted and unvalidated; callers must treat them as
///   hostile input.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteToolInfo {
    /// Tool name as the server publishes it.
    pub name: String,
    /// Tool description.
    #[serde(default)]
    pub description: String,
    /// JSON schema for the tool's input, when the server provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

/// `tools/list` result payload.
#[derive(Debug, Deserialize)]
pub struct ToolListResult {
    /// Tool entries returned by the server.
    pub tools: Vec<RemoteToolInfo>,
}

// ============================================================================
// SECTION: Error Code Classification
// ============================================================================

/// Classification of the fixed JSON-RPC error code space.
///
/// # Invariants
/// - Classification never loses the raw code; it is carried alongside in
///   [`crate::McpClientError::Rpc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorCode {
    /// -32600: the request envelope was not valid.
    InvalidRequest,
    /// -32601: the method does not exist.
    MethodNotFound,
    /// -32602: the method parameters were invalid.
    InvalidParams,
    /// -32603: internal server error.
    InternalError,
    /// -32000..=-32099: implementation-defined server errors.
    ServerError,
    /// Any other value: application-defined error.
    Application,
}

impl RpcErrorCode {
    /// Classifies a raw JSON-RPC error code.
    #[must_use]
    pub const fn classify(code: i64) -> Self {
        match code {
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::InternalError,
            -32099 ..= -32000 => Self::ServerError,
            _ => Self::Application,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only output and panic-based assertions are permitted."
    )]

    use super::*;

    #[test]
    fn request_omits_absent_params() {
        let request = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: 7,
            method: METHOD_TOOLS_LIST,
            params: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"jsonrpc":"2.0","id":7,"method":"tools/list"}"#);
    }

    #[test]
    fn error_codes_classify_per_spec() {
        assert_eq!(RpcErrorCode::classify(-32600), RpcErrorCode::InvalidRequest);
        assert_eq!(RpcErrorCode::classify(-32601), RpcErrorCode::MethodNotFound);
        assert_eq!(RpcErrorCode::classify(-32602), RpcErrorCode::InvalidParams);
        assert_eq!(RpcErrorCode::classify(-32603), RpcErrorCode::InternalError);
        assert_eq!(RpcErrorCode::classify(-32050), RpcErrorCode::ServerError);
        assert_eq!(RpcErrorCode::classify(1001), RpcErrorCode::Application);
    }
}
