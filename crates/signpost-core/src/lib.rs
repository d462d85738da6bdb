// crates/signpost-core/src/lib.rs
// ============================================================================
// Module: Signpost Core
// Description: Data model, identifiers, canonical hashing, and catalog validation.
// Purpose: Provide the shared, I/O-free foundation for discovery and execution crates.
// Dependencies: serde, serde_json, serde_jcs, sha2, url
// ============================================================================

//! ## Overview
//! `signpost-core` holds everything the discovery pipeline and the remote
//! call client share without performing any I/O: the catalog wire shapes,
//! opaque identifiers, RFC 8785 canonical hashing, and structural catalog
//! validation. Trust decisions (signatures, key resolution, integrity
//! policy) live in `signpost-discovery`; this crate only decides whether a
//! document is well-formed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod catalog;
pub mod hashing;
pub mod identifiers;
pub mod validate;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalog::CatalogDocument;
pub use catalog::CatalogMetadata;
pub use catalog::HttpMethod;
pub use catalog::MCP_EXTENSION_KEY;
pub use catalog::McpToolConfig;
pub use catalog::SUPPORTED_CATALOG_VERSIONS;
pub use catalog::ToolExample;
pub use catalog::ToolRecord;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::IssuerId;
pub use identifiers::KeyId;
pub use identifiers::MAX_TOOL_NAME_LEN;
pub use identifiers::ToolName;
pub use identifiers::is_valid_tool_name;
pub use validate::ValidationError;
pub use validate::parse_catalog;
pub use validate::validate_document;
