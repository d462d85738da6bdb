// crates/signpost-discovery/src/verify.rs
// ============================================================================
// Module: Signature Verifier
// Description: Step-gated verification of catalog signatures.
// Purpose: Bind catalog bytes to an issuer, key, validity window, and content digest.
// Dependencies: ed25519-dalek, serde_json, signpost-core, time
// ============================================================================

//! ## Overview
//! Verification runs as a sequence of hard gates, short-circuiting on the
//! first failure: parse the token, resolve the key, check the Ed25519
//! signature over the signing input, check the validity window, and compare
//! the recomputed canonical catalog digest with the signed one. Every
//! failure names its step so callers can distinguish "the document changed
//! after signing" from "the signature itself is invalid".
//!
//! Absence of a token is not an error here; the orchestrator maps it
//! through its signature policy. Verification is never memoized across
//! different catalog bytes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use ed25519_dalek::Signature;
use signpost_core::HashDigest;
use signpost_core::HashError;
use signpost_core::IssuerId;
use signpost_core::KeyId;
use signpost_core::hashing::canonical_json_bytes;
use signpost_core::hashing::hash_bytes;
use thiserror::Error;
use time::Duration;
use time::OffsetDateTime;

use crate::keys::KeyResolutionError;
use crate::keys::KeyResolver;
use crate::token::TokenError;
use crate::token::VerificationToken;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default tolerated clock skew when checking the validity window.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::seconds(60);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Verification pipeline step identifiers.
///
/// # Invariants
/// - Variants are stable for diagnostics and telemetry labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStep {
    /// Token parsing and algorithm gating.
    ParseToken,
    /// Key resolution from the trust anchor.
    ResolveKey,
    /// Cryptographic signature check.
    CheckSignature,
    /// Issued-at / expiry window check.
    CheckTimeWindow,
    /// Canonical content digest comparison.
    CheckContentDigest,
}

impl VerificationStep {
    /// Returns a stable label for the step.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ParseToken => "parse-token",
            Self::ResolveKey => "resolve-key",
            Self::CheckSignature => "check-signature",
            Self::CheckTimeWindow => "check-time-window",
            Self::CheckContentDigest => "check-content-digest",
        }
    }
}

/// Signature verification errors, attributed to their failing step.
///
/// # Invariants
/// - All variants are terminal for the catalog bytes they were raised for;
///   the caller must fetch a fresh catalog rather than retry.
#[derive(Debug, Error)]
pub enum SignatureVerificationError {
    /// The token did not parse or used a disallowed algorithm.
    #[error("token rejected: {0}")]
    Token(#[from] TokenError),
    /// The verification key could not be resolved.
    #[error("key resolution failed: {0}")]
    KeyResolution(#[from] KeyResolutionError),
    /// The signature does not verify under the resolved key.
    #[error("signature verification failed for key {key_id}")]
    BadSignature {
        /// Key the signature was checked against.
        key_id: String,
    },
    /// The token's issued-at lies in the future beyond tolerated skew.
    #[error("token not yet valid: iat {issued_at} is after {now} (+skew)")]
    NotYetValid {
        /// Issued-at from the claims.
        issued_at: OffsetDateTime,
        /// Verification time.
        now: OffsetDateTime,
    },
    /// The token expired.
    #[error("token expired: exp {expires_at} is before {now}")]
    Expired {
        /// Expiry from the claims.
        expires_at: OffsetDateTime,
        /// Verification time.
        now: OffsetDateTime,
    },
    /// The claims carry an out-of-range timestamp.
    #[error("token carries an invalid timestamp: {0}")]
    InvalidTimestamp(i64),
    /// The catalog bytes could not be canonicalized for hashing.
    #[error("catalog canonicalization failed: {0}")]
    Canonicalization(#[from] HashError),
    /// The recomputed digest differs from the signed one.
    #[error("catalog digest mismatch: signed {signed}, computed {computed}")]
    DigestMismatch {
        /// Digest bound into the token.
        signed: HashDigest,
        /// Digest recomputed over the fetched bytes.
        computed: HashDigest,
    },
}

impl SignatureVerificationError {
    /// Returns the pipeline step the failure belongs to.
    #[must_use]
    pub const fn step(&self) -> VerificationStep {
        match self {
            Self::Token(_) => VerificationStep::ParseToken,
            Self::KeyResolution(_) => VerificationStep::ResolveKey,
            Self::BadSignature { .. } => VerificationStep::CheckSignature,
            Self::NotYetValid { .. } | Self::Expired { .. } | Self::InvalidTimestamp(_) => {
                VerificationStep::CheckTimeWindow
            }
            Self::Canonicalization(_) | Self::DigestMismatch { .. } => {
                VerificationStep::CheckContentDigest
            }
        }
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Evidence of a successful verification.
///
/// # Invariants
/// - Constructed only after every verification gate has passed.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    /// Issuer that signed the catalog.
    pub issuer: IssuerId,
    /// Key the signature verified under.
    pub key_id: KeyId,
    /// Issued-at from the claims.
    pub issued_at: OffsetDateTime,
    /// Expiry from the claims.
    pub expires_at: OffsetDateTime,
    /// Digest bound into the token.
    pub catalog_digest: HashDigest,
}

/// Verification status of a catalog snapshot.
///
/// # Invariants
/// - `Unsigned` is a distinct non-error state; whether it is acceptable is
///   the orchestrator's policy decision, not the verifier's.
#[derive(Debug, Clone)]
pub enum VerificationOutcome {
    /// The catalog carried a token and every gate passed.
    Verified(VerifiedToken),
    /// The catalog carried no token.
    Unsigned,
}

impl VerificationOutcome {
    /// Returns true when the catalog was cryptographically verified.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Step-gated catalog signature verifier.
///
/// # Invariants
/// - Holds the key resolver for the lifetime of the orchestrator; resolved
///   keys are shared read-only per verification.
pub struct SignatureVerifier {
    /// Trust-anchor key resolver.
    resolver: KeyResolver,
    /// Tolerated clock skew for window checks.
    clock_skew: Duration,
}

impl SignatureVerifier {
    /// Builds a verifier around a key resolver.
    #[must_use]
    pub const fn new(resolver: KeyResolver, clock_skew: Duration) -> Self {
        Self {
            resolver,
            clock_skew,
        }
    }

    /// Verifies a compact token against catalog bytes at the current time.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureVerificationError`] naming the failing step.
    pub async fn verify(
        &self,
        catalog_bytes: &[u8],
        compact_token: &str,
    ) -> Result<VerifiedToken, SignatureVerificationError> {
        self.verify_at(catalog_bytes, compact_token, OffsetDateTime::now_utc()).await
    }

    /// Verifies a compact token against catalog bytes at an explicit time.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureVerificationError`] naming the failing step.
    pub async fn verify_at(
        &self,
        catalog_bytes: &[u8],
        compact_token: &str,
        now: OffsetDateTime,
    ) -> Result<VerifiedToken, SignatureVerificationError> {
        // Gate 1: parse and algorithm allow-list.
        let token = VerificationToken::parse(compact_token)?;

        // Gate 2: key resolution.
        let key_id = KeyId::new(&token.header.kid);
        let key = self.resolver.resolve(&token.claims.iss, &key_id, &token.header.alg).await?;

        // Gate 3: cryptographic check over the signing input.
        let signature = Signature::try_from(token.signature.as_slice()).map_err(|_| {
            SignatureVerificationError::BadSignature {
                key_id: key_id.to_string(),
            }
        })?;
        key.key.verify_strict(token.signing_input.as_bytes(), &signature).map_err(|_| {
            SignatureVerificationError::BadSignature {
                key_id: key_id.to_string(),
            }
        })?;

        // Gate 4: validity window.
        let issued_at = timestamp(token.claims.iat)?;
        let expires_at = timestamp(token.claims.exp)?;
        if issued_at > now + self.clock_skew {
            return Err(SignatureVerificationError::NotYetValid {
                issued_at,
                now,
            });
        }
        if expires_at < now {
            return Err(SignatureVerificationError::Expired {
                expires_at,
                now,
            });
        }

        // Gate 5: canonical content digest.
        let computed = catalog_digest(catalog_bytes, &token.claims.catalog_hash)?;
        if computed.value != token.claims.catalog_hash.value {
            return Err(SignatureVerificationError::DigestMismatch {
                signed: token.claims.catalog_hash,
                computed,
            });
        }

        Ok(VerifiedToken {
            issuer: token.claims.iss,
            key_id,
            issued_at,
            expires_at,
            catalog_digest: token.claims.catalog_hash,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a unix-seconds claim into a timestamp.
fn timestamp(unix_seconds: i64) -> Result<OffsetDateTime, SignatureVerificationError> {
    OffsetDateTime::from_unix_timestamp(unix_seconds)
        .map_err(|_| SignatureVerificationError::InvalidTimestamp(unix_seconds))
}

/// Computes the canonical digest of catalog bytes with the signed algorithm.
///
/// The bytes are parsed and re-serialized in RFC 8785 form so formatting
/// differences between publication and signing never change the digest.
pub fn catalog_digest(
    catalog_bytes: &[u8],
    signed: &HashDigest,
) -> Result<HashDigest, SignatureVerificationError> {
    let value: serde_json::Value = serde_json::from_slice(catalog_bytes)
        .map_err(|err| HashError::Canonicalization(format!("catalog is not json: {err}")))?;
    let canonical = canonical_json_bytes(&value)?;
    Ok(hash_bytes(signed.algorithm, &canonical))
}
