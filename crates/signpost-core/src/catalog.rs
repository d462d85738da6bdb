// crates/signpost-core/src/catalog.rs
// ============================================================================
// Module: Catalog Data Model
// Description: Wire shapes for the published tool catalog document.
// Purpose: Provide canonical serde types for catalogs, tool records, and the MCP extension block.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! This module defines the catalog document shapes as they travel on the
//! wire. A catalog is immutable once parsed; a new fetch produces a new
//! [`CatalogDocument`]. Unknown extension keys on tool records are ignored
//! rather than reflected dynamically; only the `x-mcp-tool` block is
//! consumed. Security posture: catalogs are untrusted input and carry no
//! trust until the validator and signature verifier have passed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::hashing::HashDigest;
use crate::identifiers::ToolName;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Catalog document versions this crate understands.
pub const SUPPORTED_CATALOG_VERSIONS: &[&str] = &["1.0"];

/// Extension key carrying the MCP execution block on a tool record.
pub const MCP_EXTENSION_KEY: &str = "x-mcp-tool";

// ============================================================================
// SECTION: Catalog Document
// ============================================================================

/// Published catalog enumerating discoverable tools.
///
/// # Invariants
/// - Immutable once parsed; refreshes produce a new document.
/// - After [`crate::validate::parse_catalog`] succeeds, `version` is
///   supported and every tool record satisfies the validator's rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDocument {
    /// Catalog format version.
    pub version: String,
    /// Free-form publisher metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CatalogMetadata>,
    /// Tool records in publication order.
    pub tools: Vec<ToolRecord>,
}

/// Free-form catalog metadata.
///
/// # Invariants
/// - All fields are optional; values are informational and untrusted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMetadata {
    /// Catalog title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Catalog description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Generator tool that produced the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    /// Publishing organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    /// Issuer identity expected to sign the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// Generation timestamp as published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

// ============================================================================
// SECTION: Tool Record
// ============================================================================

/// One discoverable operation in a catalog.
///
/// # Invariants
/// - `name` is unique within its document once validation has passed.
/// - `spec_url` points at the external operation descriptor; `spec_hash`
///   binds its content when declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRecord {
    /// Unique tool name.
    pub name: ToolName,
    /// Human-readable description.
    pub description: String,
    /// Optional semantic version of the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// URI of the external operation descriptor.
    pub spec_url: String,
    /// Optional content digest of the descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_hash: Option<HashDigest>,
    /// Optional JSON schema for the tool's arguments (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    /// MCP execution extension block.
    #[serde(rename = "x-mcp-tool", default, skip_serializing_if = "Option::is_none")]
    pub mcp: Option<McpToolConfig>,
}

impl ToolRecord {
    /// Returns the execution block.
    ///
    /// Records from a validated document always carry one; the accessor
    /// exists because the wire shape tolerates its absence until validation.
    #[must_use]
    pub const fn execution(&self) -> Option<&McpToolConfig> {
        self.mcp.as_ref()
    }
}

// ============================================================================
// SECTION: MCP Extension Block
// ============================================================================

/// Execution configuration from the `x-mcp-tool` extension.
///
/// # Invariants
/// - `server_url` names the remote-call endpoint and is syntactically valid
///   once validation has passed.
/// - `capabilities` order is irrelevant; duplicates carry no meaning.
/// - `examples` are informational only and are never executed automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpToolConfig {
    /// Remote-call endpoint base URL.
    pub server_url: String,
    /// HTTP method of the underlying operation.
    #[serde(default)]
    pub method: HttpMethod,
    /// Optional path override for the underlying operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Free-text capability tags used for filtering.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    /// Worked examples for documentation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<ToolExample>,
}

/// HTTP method of the operation behind a tool.
///
/// # Invariants
/// - Variants are stable for wire parsing; the default is `POST`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    #[default]
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP DELETE.
    Delete,
    /// HTTP PATCH.
    Patch,
}

impl HttpMethod {
    /// Returns the method as its wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }
}

/// Worked example attached to a tool record.
///
/// # Invariants
/// - Payloads are informational; nothing in the pipeline executes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolExample {
    /// Short example description.
    pub description: String,
    /// Example input payload.
    pub input: Value,
    /// Example output payload.
    pub output: Value,
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

    use serde_json::json;

    use super::*;

    #[test]
    fn tool_record_parses_extension_block() {
        let record: ToolRecord = serde_json::from_value(json!({
            "name": "get_user",
            "description": "Retrieve user information by user ID",
            "spec_url": "https://tools.example.com/specs/users.json",
            "x-mcp-tool": {
                "server_url": "http://localhost:3001",
                "method": "GET",
                "path": "/users/{id}",
                "capabilities": ["user-management"],
                "examples": [{
                    "description": "Get user with ID 123",
                    "input": {"id": 123},
                    "output": {"id": 123, "name": "John Doe"}
                }]
            }
        }))
        .unwrap();
        let mcp = record.execution().unwrap();
        assert_eq!(mcp.method, HttpMethod::Get);
        assert_eq!(mcp.capabilities, vec!["user-management".to_string()]);
        assert_eq!(mcp.examples.len(), 1);
    }

    #[test]
    fn method_defaults_to_post() {
        let mcp: McpToolConfig = serde_json::from_value(json!({
            "server_url": "http://localhost:3001"
        }))
        .unwrap();
        assert_eq!(mcp.method, HttpMethod::Post);
    }

    #[test]
    fn unknown_extension_keys_are_ignored() {
        let record: ToolRecord = serde_json::from_value(json!({
            "name": "get_user",
            "description": "desc",
            "spec_url": "https://tools.example.com/specs/users.json",
            "x-other-extension": {"anything": true}
        }))
        .unwrap();
        assert!(record.execution().is_none());
    }
}
