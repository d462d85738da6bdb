// crates/signpost-core/src/identifiers.rs
// ============================================================================
// Module: Signpost Identifiers
// Description: Canonical opaque identifiers for catalogs, tools, and trust anchors.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical identifiers used throughout Signpost.
//! Identifiers are opaque and serialize as strings on the wire. Pattern
//! enforcement for tool names happens in the catalog validator, not here;
//! these types carry whatever the wire supplied so validation failures can
//! report the offending value verbatim.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Tool name as published in a catalog document.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
/// - Documents that pass catalog validation only contain names matching
///   [`is_valid_tool_name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolName(String);

impl ToolName {
    /// Creates a new tool name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ToolName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ToolName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Issuer identity that signed a catalog.
///
/// # Invariants
/// - Opaque UTF-8 string; accepted forms (`did:web:`, bare host, URL) are
///   interpreted by the key resolver, not by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssuerId(String);

impl IssuerId {
    /// Creates a new issuer identifier.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self(issuer.into())
    }

    /// Returns the issuer as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssuerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for IssuerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Key identifier within an issuer's published key set.
///
/// # Invariants
/// - Opaque UTF-8 string; matched verbatim against `kid` values and
///   `#fragment` suffixes in key documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(String);

impl KeyId {
    /// Creates a new key identifier.
    #[must_use]
    pub fn new(key_id: impl Into<String>) -> Self {
        Self(key_id.into())
    }

    /// Returns the key identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for KeyId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Tool Name Pattern
// ============================================================================

/// Maximum accepted tool name length in bytes.
pub const MAX_TOOL_NAME_LEN: usize = 64;

/// Returns true when a tool name matches the published identifier pattern.
///
/// The pattern is an ASCII letter followed by up to 63 ASCII letters, digits,
/// underscores, or hyphens.
#[must_use]
pub fn is_valid_tool_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_TOOL_NAME_LEN {
        return false;
    }
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

// ============================================================================
// SECTION: Tests
// ============================================================================
