// crates/signpost-mcp/src/lib.rs
// ============================================================================
// Module: Signpost MCP
// Description: JSON-RPC client for invoking catalog tools on remote servers.
// Purpose: Provide the remote-call half of the discover-then-invoke lifecycle.
// Dependencies: reqwest, serde, serde_json, signpost-core, url
// ============================================================================

//! ## Overview
//! `signpost-mcp` speaks the MCP JSON-RPC wire protocol over HTTP. It is a
//! plain data-in/data-out client: tool records stay in `signpost-core`, and
//! nothing here couples a record to the transport used to act on it. Server
//! error envelopes are surfaced verbatim so callers can branch on the exact
//! code; protocol breakage (malformed envelopes, correlation mismatches) is
//! kept distinct from application errors.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod wire;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::DEFAULT_MAX_RESPONSE_BYTES;
pub use client::DEFAULT_RPC_PATH;
pub use client::DEFAULT_TIMEOUT;
pub use client::McpClient;
pub use client::McpClientConfig;
pub use client::McpClientError;
pub use wire::JSONRPC_VERSION;
pub use wire::JsonRpcError;
pub use wire::JsonRpcResponse;
pub use wire::RemoteToolInfo;
pub use wire::RpcErrorCode;
