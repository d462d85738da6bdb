// crates/signpost-core/src/validate.rs
// ============================================================================
// Module: Catalog Validation
// Description: Structural validation of catalog documents and tool records.
// Purpose: Reject malformed or ambiguous catalogs before any trust decision is made.
// Dependencies: serde_json, url
// ============================================================================

//! ## Overview
//! Structural validation of catalog bytes: parse, check the version against
//! the supported set, and enforce the per-record rules (name pattern and
//! uniqueness, non-empty description, syntactically valid URLs, presence of
//! the execution block). Validation performs no network I/O and makes no
//! trust decisions; an unsupported version is terminal, never retried.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use thiserror::Error;
use url::Url;

use crate::catalog::CatalogDocument;
use crate::catalog::SUPPORTED_CATALOG_VERSIONS;
use crate::identifiers::is_valid_tool_name;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Structural catalog validation errors.
///
/// # Invariants
/// - Variants are stable for caller branching and tests.
/// - Values embedded in messages are untrusted wire content.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The document was not parseable JSON of the expected shape.
    #[error("malformed catalog document: {0}")]
    Malformed(String),
    /// The document version is not in the supported set.
    #[error("unsupported catalog version: {version}")]
    UnsupportedVersion {
        /// Version string as published.
        version: String,
    },
    /// A tool name is empty or does not match the identifier pattern.
    #[error("invalid tool name: {name}")]
    InvalidToolName {
        /// Offending name as published.
        name: String,
    },
    /// Two tool records share one name, making lookups ambiguous.
    #[error("duplicate tool name: {name}")]
    DuplicateToolName {
        /// Duplicated name.
        name: String,
    },
    /// A tool description is empty.
    #[error("tool {tool} has an empty description")]
    EmptyDescription {
        /// Tool whose description is empty.
        tool: String,
    },
    /// A tool's spec URL is not a syntactically valid URI.
    #[error("tool {tool} has an invalid spec url: {url}")]
    InvalidSpecUrl {
        /// Tool carrying the URL.
        tool: String,
        /// Offending URL.
        url: String,
    },
    /// A tool record carries no execution block.
    #[error("tool {tool} has no x-mcp-tool execution block")]
    MissingExecutionConfig {
        /// Tool missing the block.
        tool: String,
    },
    /// A tool's server URL is not a syntactically valid URI.
    #[error("tool {tool} has an invalid server url: {url}")]
    InvalidServerUrl {
        /// Tool carrying the URL.
        tool: String,
        /// Offending URL.
        url: String,
    },
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Parses catalog bytes and validates the document structurally.
///
/// An empty `tools` sequence is valid and yields zero discoverable tools.
///
/// # Errors
///
/// Returns [`ValidationError`] on malformed JSON, an unsupported version, or
/// any per-record rule violation.
pub fn parse_catalog(bytes: &[u8]) -> Result<CatalogDocument, ValidationError> {
    let document: CatalogDocument =
        serde_json::from_slice(bytes).map_err(|err| ValidationError::Malformed(err.to_string()))?;
    validate_document(&document)?;
    Ok(document)
}

/// Validates an already-parsed catalog document.
///
/// # Errors
///
/// Returns [`ValidationError`] on the first rule violation in document order.
pub fn validate_document(document: &CatalogDocument) -> Result<(), ValidationError> {
    if !SUPPORTED_CATALOG_VERSIONS.contains(&document.version.as_str()) {
        return Err(ValidationError::UnsupportedVersion {
            version: document.version.clone(),
        });
    }
    let mut seen = BTreeSet::new();
    for record in &document.tools {
        let name = record.name.as_str();
        if !is_valid_tool_name(name) {
            return Err(ValidationError::InvalidToolName {
                name: name.to_string(),
            });
        }
        if !seen.insert(name) {
            return Err(ValidationError::DuplicateToolName {
                name: name.to_string(),
            });
        }
        if record.description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription {
                tool: name.to_string(),
            });
        }
        if Url::parse(&record.spec_url).is_err() {
            return Err(ValidationError::InvalidSpecUrl {
                tool: name.to_string(),
                url: record.spec_url.clone(),
            });
        }
        let Some(mcp) = record.execution() else {
            return Err(ValidationError::MissingExecutionConfig {
                tool: name.to_string(),
            });
        };
        if Url::parse(&mcp.server_url).is_err() {
            return Err(ValidationError::InvalidServerUrl {
                tool: name.to_string(),
                url: mcp.server_url.clone(),
            });
        }
    }
    Ok(())
}
