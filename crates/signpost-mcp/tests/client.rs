// crates/signpost-mcp/tests/client.rs
// ============================================================================
// Module: MCP Client Tests
// Description: JSON-RPC client behavior against a local HTTP server.
// Purpose: Verify verbatim error surfacing, correlation checks, and transport taxonomy.
// ============================================================================

//! ## Overview
//! Spins up `tiny_http` servers that answer canned JSON-RPC envelopes and
//! asserts the client's behavior: result payloads returned verbatim, server
//! error codes preserved, correlation mismatches and malformed envelopes
//! reported as protocol errors, and transport failures flagged retryable.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::thread;
use std::time::Duration;

use serde_json::Value;
use serde_json::json;
use signpost_core::ToolName;
use signpost_mcp::McpClient;
use signpost_mcp::McpClientConfig;
use signpost_mcp::McpClientError;
use signpost_mcp::RpcErrorCode;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Spawns a server answering one request with a body built from the parsed
/// request envelope. Returns the endpoint base URL.
fn spawn_rpc_server(build_body: impl Fn(&Value) -> String + Send + 'static) -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}", server.server_addr());
    thread::spawn(move || {
        if let Ok(mut request) = server.recv() {
            assert_eq!(request.url(), "/mcp");
            let mut body = String::new();
            let _ = request.as_reader().read_to_string(&mut body);
            let envelope: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
            let reply = build_body(&envelope);
            let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                .unwrap();
            let _ = request.respond(Response::from_string(reply).with_header(header));
        }
    });
    endpoint
}

/// Builds a client with a short timeout against the given endpoint.
fn client_for(endpoint: &str) -> McpClient {
    let mut config = McpClientConfig::new(endpoint);
    config.timeout = Duration::from_secs(5);
    McpClient::new(config).unwrap()
}

// ============================================================================
// SECTION: Success Paths
// ============================================================================

#[tokio::test]
async fn call_tool_returns_result_payload() {
    let endpoint = spawn_rpc_server(|envelope| {
        assert_eq!(envelope["method"], "tools/call");
        assert_eq!(envelope["params"]["name"], "get_user");
        assert_eq!(envelope["params"]["arguments"]["id"], 123);
        json!({
            "jsonrpc": "2.0",
            "id": envelope["id"],
            "result": {"id": 123, "name": "John Doe"}
        })
        .to_string()
    });
    let mut client = client_for(&endpoint);
    let result =
        client.call_tool(&ToolName::new("get_user"), json!({"id": 123})).await.unwrap();
    assert_eq!(result["name"], "John Doe");
}

#[tokio::test]
async fn list_tools_parses_entries() {
    let endpoint = spawn_rpc_server(|envelope| {
        assert_eq!(envelope["method"], "tools/list");
        assert!(envelope.get("params").is_none());
        json!({
            "jsonrpc": "2.0",
            "id": envelope["id"],
            "result": {"tools": [
                {"name": "get_user", "description": "Get user by ID"},
                {"name": "create_user"}
            ]}
        })
        .to_string()
    });
    let mut client = client_for(&endpoint);
    let tools = client.list_tools().await.unwrap();
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0].name, "get_user");
    assert_eq!(tools[1].description, "");
}

#[tokio::test]
async fn get_tool_returns_schema_payload() {
    let endpoint = spawn_rpc_server(|envelope| {
        assert_eq!(envelope["method"], "tools/get");
        assert_eq!(envelope["params"]["name"], "get_user");
        json!({
            "jsonrpc": "2.0",
            "id": envelope["id"],
            "result": {"name": "get_user", "parameters": {"type": "object"}}
        })
        .to_string()
    });
    let mut client = client_for(&endpoint);
    let schema = client.get_tool(&ToolName::new("get_user")).await.unwrap();
    assert_eq!(schema["parameters"]["type"], "object");
}

// ============================================================================
// SECTION: Error Envelopes
// ============================================================================

#[tokio::test]
async fn server_error_code_is_preserved_verbatim() {
    let endpoint = spawn_rpc_server(|envelope| {
        json!({
            "jsonrpc": "2.0",
            "id": envelope["id"],
            "error": {"code": -32601, "message": "Method not found"}
        })
        .to_string()
    });
    let mut client = client_for(&endpoint);
    let err = client.call_tool(&ToolName::new("missing"), json!({})).await.unwrap_err();
    match err {
        McpClientError::Rpc {
            code,
            message,
            data,
        } => {
            assert_eq!(code, -32601);
            assert_eq!(message, "Method not found");
            assert!(data.is_none());
        }
        other => panic!("expected rpc error, got {other}"),
    }
}

#[tokio::test]
async fn rpc_error_classification_is_available() {
    let endpoint = spawn_rpc_server(|envelope| {
        json!({
            "jsonrpc": "2.0",
            "id": envelope["id"],
            "error": {"code": -32602, "message": "Invalid params", "data": {"field": "id"}}
        })
        .to_string()
    });
    let mut client = client_for(&endpoint);
    let err = client.call_tool(&ToolName::new("get_user"), json!({})).await.unwrap_err();
    assert_eq!(err.rpc_code(), Some(RpcErrorCode::InvalidParams));
    assert!(!err.is_retryable());
}

// ============================================================================
// SECTION: Protocol Errors
// ============================================================================

#[tokio::test]
async fn correlation_id_mismatch_is_a_protocol_error() {
    let endpoint = spawn_rpc_server(|_| {
        json!({"jsonrpc": "2.0", "id": 9999, "result": {}}).to_string()
    });
    let mut client = client_for(&endpoint);
    let err = client.call_tool(&ToolName::new("get_user"), json!({})).await.unwrap_err();
    assert!(matches!(err, McpClientError::Protocol(_)), "got {err}");
}

#[tokio::test]
async fn non_json_body_is_a_protocol_error() {
    let endpoint = spawn_rpc_server(|_| "<html>definitely not json</html>".to_string());
    let mut client = client_for(&endpoint);
    let err = client.call_tool(&ToolName::new("get_user"), json!({})).await.unwrap_err();
    assert!(matches!(err, McpClientError::Protocol(_)));
}

#[tokio::test]
async fn missing_result_is_a_protocol_error() {
    let endpoint =
        spawn_rpc_server(|envelope| json!({"jsonrpc": "2.0", "id": envelope["id"]}).to_string());
    let mut client = client_for(&endpoint);
    let err = client.list_tools().await.unwrap_err();
    assert!(matches!(err, McpClientError::Protocol(_)));
}

// ============================================================================
// SECTION: Transport Errors
// ============================================================================

#[tokio::test]
async fn http_error_status_is_a_retryable_transport_error() {
    let server = Server::http("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}", server.server_addr());
    thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let _ = request.respond(Response::from_string("boom").with_status_code(503));
        }
    });
    let mut client = client_for(&endpoint);
    let err = client.call_tool(&ToolName::new("get_user"), json!({})).await.unwrap_err();
    assert!(matches!(err, McpClientError::Transport(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn connection_refused_is_a_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut client = client_for(&format!("http://127.0.0.1:{port}"));
    let err = client.call_tool(&ToolName::new("get_user"), json!({})).await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn oversized_response_is_rejected() {
    let endpoint = spawn_rpc_server(|envelope| {
        json!({
            "jsonrpc": "2.0",
            "id": envelope["id"],
            "result": {"blob": "x".repeat(1024 * 1024)}
        })
        .to_string()
    });
    let mut config = McpClientConfig::new(&endpoint);
    config.max_response_bytes = 1024;
    let mut client = McpClient::new(config).unwrap();
    let err = client.call_tool(&ToolName::new("get_user"), json!({})).await.unwrap_err();
    assert!(matches!(err, McpClientError::ResponseTooLarge { .. }));
}

// ============================================================================
// SECTION: Configuration Errors
// ============================================================================

#[tokio::test]
async fn invalid_endpoint_is_a_config_error() {
    let err = McpClient::new(McpClientConfig::new("not a url")).unwrap_err();
    assert!(matches!(err, McpClientError::Config(_)));
}
