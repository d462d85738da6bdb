// crates/signpost-discovery/src/token.rs
// ============================================================================
// Module: Verification Token
// Description: Compact signed-token parsing for catalog verification.
// Purpose: Decode the detached three-segment token and gate its algorithm.
// Dependencies: base64, serde, serde_json, signpost-core
// ============================================================================

//! ## Overview
//! The catalog signature travels out-of-band as a compact token: three
//! dot-separated base64url segments holding a header (`alg`, `typ`, `kid`),
//! claims (`iss`, `iat`, `exp`, `catalog_hash`), and raw signature bytes.
//! Exactly one algorithm is accepted (`EdDSA`, Ed25519); the allow-list is
//! closed by design, not an extensible registry. Tokens are parsed once,
//! never mutated, and discarded after a single verification pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as Base64Url;
use serde::Deserialize;
use signpost_core::HashDigest;
use signpost_core::IssuerId;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// The only signing algorithm the verifier accepts.
pub const TOKEN_ALGORITHM: &str = "EdDSA";

/// Expected Ed25519 signature length in bytes.
const SIGNATURE_LEN: usize = 64;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Token parsing errors.
///
/// # Invariants
/// - Variants are stable for step attribution in verification reports.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The compact form did not have exactly three segments.
    #[error("token must have three dot-separated segments, found {segments}")]
    Format {
        /// Number of segments found.
        segments: usize,
    },
    /// A segment was not valid base64url.
    #[error("token segment is not base64url: {0}")]
    Encoding(String),
    /// The header or claims JSON did not parse.
    #[error("token payload is malformed: {0}")]
    Payload(String),
    /// The header names an algorithm outside the closed allow-list.
    #[error("unsupported token algorithm: {alg}")]
    UnsupportedAlgorithm {
        /// Algorithm as published in the header.
        alg: String,
    },
    /// The signature segment has the wrong length.
    #[error("signature must be {SIGNATURE_LEN} bytes, found {len}")]
    SignatureLength {
        /// Length found.
        len: usize,
    },
}

// ============================================================================
// SECTION: Token Types
// ============================================================================

/// Token header fields.
///
/// # Invariants
/// - `alg` equals [`TOKEN_ALGORITHM`] after a successful parse.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenHeader {
    /// Signing algorithm identifier.
    pub alg: String,
    /// Token type tag, informational.
    #[serde(default)]
    pub typ: Option<String>,
    /// Key identifier within the issuer's key set.
    pub kid: String,
}

/// Token claims binding the catalog to an issuer and validity window.
///
/// # Invariants
/// - Times are unix seconds as published; window checks happen in the
///   verifier, not here.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Issuer identity.
    pub iss: IssuerId,
    /// Issued-at time, unix seconds.
    pub iat: i64,
    /// Expiry time, unix seconds.
    pub exp: i64,
    /// Canonical digest of the signed catalog body.
    pub catalog_hash: HashDigest,
}

/// Parsed verification token.
///
/// # Invariants
/// - `signing_input` is the exact ASCII `header.claims` pair the signature
///   covers.
/// - `signature` is [`SIGNATURE_LEN`] bytes.
#[derive(Debug, Clone)]
pub struct VerificationToken {
    /// Parsed header.
    pub header: TokenHeader,
    /// Parsed claims.
    pub claims: TokenClaims,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
    /// Bytes the signature was computed over.
    pub signing_input: String,
}

impl VerificationToken {
    /// Parses a compact token and gates its algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] on malformed segments, unparseable payloads,
    /// or an algorithm outside the allow-list.
    pub fn parse(compact: &str) -> Result<Self, TokenError> {
        let segments: Vec<&str> = compact.split('.').collect();
        let [header_b64, claims_b64, signature_b64] = segments.as_slice() else {
            return Err(TokenError::Format {
                segments: segments.len(),
            });
        };
        let header_bytes = decode_segment(header_b64)?;
        let header: TokenHeader = serde_json::from_slice(&header_bytes)
            .map_err(|err| TokenError::Payload(format!("header: {err}")))?;
        if header.alg != TOKEN_ALGORITHM {
            return Err(TokenError::UnsupportedAlgorithm {
                alg: header.alg,
            });
        }
        let claims_bytes = decode_segment(claims_b64)?;
        let claims: TokenClaims = serde_json::from_slice(&claims_bytes)
            .map_err(|err| TokenError::Payload(format!("claims: {err}")))?;
        let signature = decode_segment(signature_b64)?;
        if signature.len() != SIGNATURE_LEN {
            return Err(TokenError::SignatureLength {
                len: signature.len(),
            });
        }
        Ok(Self {
            header,
            claims,
            signature,
            signing_input: format!("{header_b64}.{claims_b64}"),
        })
    }
}

/// Decodes one base64url segment.
fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    Base64Url.decode(segment).map_err(|err| TokenError::Encoding(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
