// crates/signpost-mcp/src/client.rs
// ============================================================================
// Module: MCP Client
// Description: HTTP JSON-RPC client for remote tool execution.
// Purpose: Invoke catalog tools on their named servers and surface errors verbatim.
// Dependencies: reqwest, serde, serde_json, signpost-core, url
// ============================================================================

//! ## Overview
//! Issues `tools/call`, `tools/list`, and `tools/get` requests against an
//! MCP server endpoint. Each request carries a fresh correlation id, unique
//! for the lifetime of the client; a success response whose echoed id
//! differs from the request's is a protocol error, distinct from
//! application errors. The client never retries; retry policy belongs to
//! the caller, since tool idempotency is unknown at this layer.
//!
//! Security posture: server responses are untrusted; apply size limits,
//! fail closed on parsing errors, and never log secrets.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::Client;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::redirect::Policy;
use serde_json::Value;
use signpost_core::ToolName;
use thiserror::Error;
use url::Url;

use crate::wire::JSONRPC_VERSION;
use crate::wire::JsonRpcRequest;
use crate::wire::JsonRpcResponse;
use crate::wire::METHOD_TOOLS_CALL;
use crate::wire::METHOD_TOOLS_GET;
use crate::wire::METHOD_TOOLS_LIST;
use crate::wire::RemoteToolInfo;
use crate::wire::RpcErrorCode;
use crate::wire::ToolListResult;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum accepted response body size.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

/// Root-relative path of the JSON-RPC endpoint on a tool server.
pub const DEFAULT_RPC_PATH: &str = "/mcp";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP client errors.
///
/// # Invariants
/// - Variants are stable for caller branching and tests.
/// - [`McpClientError::Rpc`] preserves the server's code verbatim.
#[derive(Debug, Error)]
pub enum McpClientError {
    /// Configuration error.
    #[error("mcp client config error: {0}")]
    Config(String),
    /// Transport-level failure (connection, TLS, non-2xx status).
    #[error("mcp transport error: {0}")]
    Transport(String),
    /// The request deadline elapsed.
    #[error("mcp request timed out: {0}")]
    Timeout(String),
    /// JSON serialization error.
    #[error("mcp json error: {0}")]
    Json(String),
    /// Malformed response envelope or correlation mismatch.
    #[error("mcp protocol error: {0}")]
    Protocol(String),
    /// Response size exceeds limits.
    #[error("mcp response exceeds size limit ({actual} > {limit})")]
    ResponseTooLarge {
        /// Actual size in bytes.
        actual: usize,
        /// Maximum size in bytes.
        limit: usize,
    },
    /// Application-level error envelope from the server, surfaced verbatim.
    #[error("mcp server error {code}: {message}")]
    Rpc {
        /// Numeric error code as received.
        code: i64,
        /// Error message provided by the server.
        message: String,
        /// Optional application-defined detail.
        data: Option<Value>,
    },
}

impl McpClientError {
    /// Returns true when the failure is transport-caused and retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }

    /// Returns the classified error code for RPC errors.
    #[must_use]
    pub const fn rpc_code(&self) -> Option<RpcErrorCode> {
        match self {
            Self::Rpc {
                code, ..
            } => Some(RpcErrorCode::classify(*code)),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// MCP client configuration.
///
/// # Invariants
/// - `endpoint` is the tool server's base URL; the JSON-RPC path is joined
///   onto it at construction time.
#[derive(Clone)]
pub struct McpClientConfig {
    /// Tool server base URL.
    pub endpoint: String,
    /// JSON-RPC path on the server (defaults to [`DEFAULT_RPC_PATH`]).
    pub rpc_path: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// Optional bearer token.
    pub bearer_token: Option<String>,
    /// Maximum accepted response body size.
    pub max_response_bytes: usize,
}

impl McpClientConfig {
    /// Creates a configuration with defaults for the given endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            rpc_path: None,
            timeout: DEFAULT_TIMEOUT,
            bearer_token: None,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

impl std::fmt::Debug for McpClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClientConfig")
            .field("endpoint", &self.endpoint)
            .field("rpc_path", &self.rpc_path)
            .field("timeout", &self.timeout)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("max_response_bytes", &self.max_response_bytes)
            .finish()
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// MCP client bound to one tool server endpoint.
///
/// # Invariants
/// - `next_id` is strictly increasing for each request sent by this client.
/// - Concurrent calls share only the underlying connection pool.
#[derive(Debug)]
pub struct McpClient {
    /// Reqwest client instance.
    client: Client,
    /// Resolved JSON-RPC endpoint URL.
    rpc_url: Url,
    /// Optional bearer token.
    bearer_token: Option<String>,
    /// Maximum accepted response body size.
    max_response_bytes: usize,
    /// Next correlation identifier.
    next_id: u64,
}

impl McpClient {
    /// Creates a new client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] when the endpoint is invalid or the HTTP
    /// client cannot be constructed.
    pub fn new(config: McpClientConfig) -> Result<Self, McpClientError> {
        let base = Url::parse(&config.endpoint)
            .map_err(|err| McpClientError::Config(format!("invalid endpoint url: {err}")))?;
        let path = config.rpc_path.as_deref().unwrap_or(DEFAULT_RPC_PATH);
        let rpc_url = base
            .join(path)
            .map_err(|err| McpClientError::Config(format!("invalid rpc path: {err}")))?;
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|err| McpClientError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            rpc_url,
            bearer_token: config.bearer_token,
            max_response_bytes: config.max_response_bytes,
            next_id: 1,
        })
    }

    #[cfg(test)]
    #[allow(dead_code, reason = "Test-only helper for request id overflow coverage.")]
    pub(crate) const fn set_next_id_for_test(&mut self, next_id: u64) {
        self.next_id = next_id;
    }

    /// Calls `tools/call` for the named tool and returns the result payload.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] when the transport fails, the envelope is
    /// malformed, or the server answers with an error envelope.
    pub async fn call_tool(
        &mut self,
        tool_name: &ToolName,
        arguments: Value,
    ) -> Result<Value, McpClientError> {
        let params = serde_json::json!({
            "name": tool_name.as_str(),
            "arguments": arguments,
        });
        self.send_request(METHOD_TOOLS_CALL, Some(params)).await
    }

    /// Calls `tools/list` and returns the server's tool entries.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] when the transport or parsing fails.
    pub async fn list_tools(&mut self) -> Result<Vec<RemoteToolInfo>, McpClientError> {
        let result = self.send_request(METHOD_TOOLS_LIST, None).await?;
        let parsed: ToolListResult = serde_json::from_value(result)
            .map_err(|err| McpClientError::Json(format!("invalid tools/list payload: {err}")))?;
        Ok(parsed.tools)
    }

    /// Calls `tools/get` and returns the schema payload for one tool.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] when the transport or parsing fails.
    pub async fn get_tool(&mut self, tool_name: &ToolName) -> Result<Value, McpClientError> {
        let params = serde_json::json!({ "name": tool_name.as_str() });
        self.send_request(METHOD_TOOLS_GET, Some(params)).await
    }

    /// Sends one JSON-RPC request and returns the result payload.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] when transport, parsing, or correlation
    /// checks fail, or when the server answers with an error envelope.
    async fn send_request(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, McpClientError> {
        let id = self.next_id;
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| McpClientError::Protocol("json-rpc request id overflow".to_string()))?;
        let request = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        };
        let payload = serde_json::to_vec(&request)
            .map_err(|err| McpClientError::Json(format!("jsonrpc serialization failed: {err}")))?;
        let response = self
            .client
            .post(self.rpc_url.clone())
            .headers(self.headers()?)
            .body(payload)
            .send()
            .await
            .map_err(classify_transport_error)?;
        let status = response.status();
        let body = read_response_body_with_limit(response, self.max_response_bytes).await?;
        if !status.is_success() {
            let preview = String::from_utf8_lossy(&body);
            return Err(McpClientError::Transport(format!(
                "http status {}: {}",
                status.as_u16(),
                preview.trim()
            )));
        }
        let envelope: JsonRpcResponse = serde_json::from_slice(&body)
            .map_err(|err| McpClientError::Protocol(format!("invalid json-rpc response: {err}")))?;
        if let Some(error) = envelope.error {
            return Err(McpClientError::Rpc {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }
        if envelope.id != Some(id) {
            let received = envelope.id.map_or("none".to_string(), |other| other.to_string());
            return Err(McpClientError::Protocol(format!(
                "correlation id mismatch: sent {id}, received {received}"
            )));
        }
        envelope.result.ok_or_else(|| {
            McpClientError::Protocol(format!("missing result for method {method}"))
        })
    }

    /// Builds request headers.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] when header values are invalid.
    fn headers(&self) -> Result<HeaderMap, McpClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.bearer_token {
            let value = format!("Bearer {token}");
            let header = HeaderValue::from_str(&value)
                .map_err(|_| McpClientError::Config("invalid bearer token header".to_string()))?;
            headers.insert(AUTHORIZATION, header);
        }
        Ok(headers)
    }
}

// ============================================================================
// SECTION: Transport Helpers
// ============================================================================

/// Maps a reqwest error to the transport/timeout taxonomy.
fn classify_transport_error(err: reqwest::Error) -> McpClientError {
    if err.is_timeout() {
        McpClientError::Timeout(err.to_string())
    } else {
        McpClientError::Transport(err.to_string())
    }
}

/// Reads an HTTP response body while enforcing a hard byte limit.
async fn read_response_body_with_limit(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, McpClientError> {
    let mut body = Vec::new();
    let mut total: usize = 0;
    while let Some(chunk) = response.chunk().await.map_err(classify_transport_error)? {
        let next_total =
            total.checked_add(chunk.len()).ok_or(McpClientError::ResponseTooLarge {
                actual: usize::MAX,
                limit,
            })?;
        if next_total > limit {
            return Err(McpClientError::ResponseTooLarge {
                actual: next_total,
                limit,
            });
        }
        body.extend_from_slice(&chunk);
        total = next_total;
    }
    Ok(body)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
