// crates/signpost-core/src/hashing.rs
// ============================================================================
// Module: Canonical Hashing
// Description: Content digests over canonical JSON and raw bytes.
// Purpose: Provide the single canonical form used to bind signatures to content.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Signpost binds signatures and integrity checks to content through SHA-256
//! digests. JSON payloads are canonicalized with RFC 8785 (JCS) before
//! hashing, so byte-level formatting differences never change a digest. The
//! same canonical form is applied on the signing and verifying side.
//!
//! Digests travel as algorithm-tagged strings (`sha256:<hex>`). Bare
//! lowercase hex of the right width is accepted on input for catalogs
//! produced by older generators and is always re-emitted tagged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default hash algorithm applied when a digest string carries no tag.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

/// Hex width of a SHA-256 digest.
const SHA256_HEX_LEN: usize = 64;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Hashing and digest parsing errors.
///
/// # Invariants
/// - Variants are stable for error mapping and tests.
#[derive(Debug, Error)]
pub enum HashError {
    /// Canonical JSON serialization failed.
    #[error("canonicalization failed: {0}")]
    Canonicalization(String),
    /// A digest string did not parse.
    #[error("invalid digest: {0}")]
    InvalidDigest(String),
}

// ============================================================================
// SECTION: Hash Algorithm
// ============================================================================

/// Supported content digest algorithms.
///
/// # Invariants
/// - Variants are stable for wire tags; only SHA-256 is currently supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256.
    Sha256,
}

impl HashAlgorithm {
    /// Returns the stable wire tag for the algorithm.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Hash Digest
// ============================================================================

/// Algorithm-tagged content digest.
///
/// # Invariants
/// - `value` is lowercase hex with the width implied by `algorithm`.
/// - Serializes as `"<algorithm>:<hex>"`; deserializes from the tagged form
///   or from bare SHA-256 hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashDigest {
    /// Digest algorithm.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex digest value.
    pub value: String,
}

impl HashDigest {
    /// Computes a digest over raw bytes with the given algorithm.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        let value = match algorithm {
            HashAlgorithm::Sha256 => to_hex(&Sha256::digest(bytes)),
        };
        Self {
            algorithm,
            value,
        }
    }

    /// Returns true when this digest matches the given bytes.
    ///
    /// Comparison recomputes the digest with this digest's algorithm; hex
    /// comparison is case-insensitive.
    #[must_use]
    pub fn matches(&self, bytes: &[u8]) -> bool {
        let computed = Self::new(self.algorithm, bytes);
        computed.value.eq_ignore_ascii_case(&self.value)
    }
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.value)
    }
}

impl FromStr for HashDigest {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (algorithm, hex) = match s.split_once(':') {
            Some(("sha256", hex)) => (HashAlgorithm::Sha256, hex),
            Some((tag, _)) => {
                return Err(HashError::InvalidDigest(format!("unsupported algorithm: {tag}")));
            }
            // Untagged digests from older generators are SHA-256 hex.
            None => (DEFAULT_HASH_ALGORITHM, s),
        };
        if hex.len() != SHA256_HEX_LEN || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HashError::InvalidDigest(format!("malformed sha256 hex: {hex}")));
        }
        Ok(Self {
            algorithm,
            value: hex.to_ascii_lowercase(),
        })
    }
}

impl Serialize for HashDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HashDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Hashing Functions
// ============================================================================

/// Serializes a value into RFC 8785 canonical JSON bytes.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when the value cannot be
/// canonicalized (for example non-finite floats).
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Computes a digest over raw bytes.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    HashDigest::new(algorithm, bytes)
}

/// Computes a digest over the canonical JSON form of a value.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when canonicalization fails.
pub fn hash_canonical_json<T: Serialize>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(algorithm, &bytes))
}

/// Lowercase hex encoding without separators.
fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
