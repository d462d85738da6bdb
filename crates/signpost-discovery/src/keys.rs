// crates/signpost-discovery/src/keys.rs
// ============================================================================
// Module: Key Resolver
// Description: Trust-anchor key resolution with fallback and caching.
// Purpose: Map an issuer identity and key id to Ed25519 verification key material.
// Dependencies: base64, ed25519-dalek, reqwest, serde, serde_json, url
// ============================================================================

//! ## Overview
//! [`KeyResolver`] turns `(issuer, key id)` into a verification key. The
//! primary source is a DID-style document at the issuer's
//! `/.well-known/did.json`; when that document is unreachable or lacks the
//! key, a flat key-set document at `/.well-known/jwks.json` is consulted.
//! Resolved keys are cached per `(issuer, key id)` with their own TTL;
//! keys rotate far less often than catalogs.
//!
//! A key whose declared algorithm disagrees with the token header is a
//! resolution failure, never silently coerced. Security posture: key
//! documents are untrusted input; malformed entries are skipped, and only
//! well-formed Ed25519 material is accepted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as Base64Url;
use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use signpost_core::IssuerId;
use signpost_core::KeyId;
use thiserror::Error;
use url::Url;

use crate::fetch::CachePolicy;
use crate::fetch::CatalogFetcher;
use crate::fetch::FetchError;
use crate::fetch::FetcherConfig;
use crate::token::TOKEN_ALGORITHM;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Well-known path of the primary (DID) key document.
pub const DID_DOCUMENT_PATH: &str = "/.well-known/did.json";

/// Well-known path of the fallback key-set document.
pub const KEY_SET_PATH: &str = "/.well-known/jwks.json";

/// Default TTL for resolved keys.
pub const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Key resolution errors.
///
/// # Invariants
/// - `Unreachable` is transport-caused and retryable; `NotFound` means the
///   key genuinely does not exist in either source and is terminal.
#[derive(Debug, Error)]
pub enum KeyResolutionError {
    /// The issuer identifier could not be mapped to a key-document origin.
    #[error("invalid issuer identifier: {issuer}")]
    InvalidIssuer {
        /// Issuer as published in the token.
        issuer: String,
    },
    /// Neither key document could be fetched.
    #[error("key documents unreachable for {issuer}: {reason}")]
    Unreachable {
        /// Issuer whose documents were unreachable.
        issuer: String,
        /// Underlying transport detail.
        reason: String,
    },
    /// Both documents were consulted and neither holds the key.
    #[error("key {key_id} not found for issuer {issuer}")]
    NotFound {
        /// Issuer that was searched.
        issuer: String,
        /// Key id that was not found.
        key_id: String,
    },
    /// The key's declared algorithm does not match the token's.
    #[error("key algorithm mismatch: token uses {expected}, key declares {declared}")]
    AlgorithmMismatch {
        /// Algorithm from the token header.
        expected: String,
        /// Algorithm declared by the key entry.
        declared: String,
    },
    /// The key entry exists but its material is malformed.
    #[error("invalid key material for {key_id}: {reason}")]
    InvalidKey {
        /// Key id with bad material.
        key_id: String,
        /// Parse failure detail.
        reason: String,
    },
    /// Internal cache failure.
    #[error("key cache lock poisoned")]
    CachePoisoned,
}

// ============================================================================
// SECTION: Key Types
// ============================================================================

/// Source document that yielded a key.
///
/// # Invariants
/// - Variants are stable for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// The issuer's DID document.
    DidDocument,
    /// The fallback key-set document.
    KeySet,
}

/// Resolved verification key.
///
/// # Invariants
/// - `key` is valid Ed25519 material.
/// - Shared read-only with the verifier for the duration of one
///   verification; ownership stays with the resolver's cache.
#[derive(Debug, Clone)]
pub struct VerificationKey {
    /// Ed25519 public key.
    pub key: VerifyingKey,
    /// Algorithm identifier (always `EdDSA`).
    pub algorithm: String,
    /// Key id the material was resolved for.
    pub key_id: KeyId,
    /// Issuer the key belongs to.
    pub issuer: IssuerId,
    /// Document that yielded the key.
    pub source: KeySource,
}

/// Cached resolution with its freshness instant.
struct CachedKey {
    /// Resolved key.
    key: VerificationKey,
    /// Instant the resolution was stored.
    resolved_at: Instant,
}

// ============================================================================
// SECTION: Key Document Shapes
// ============================================================================

/// DID document subset consumed by resolution.
#[derive(Debug, Deserialize)]
struct DidDocument {
    /// Verification method entries.
    #[serde(rename = "verificationMethod", default)]
    verification_method: Vec<VerificationMethod>,
}

/// One DID verification method entry.
#[derive(Debug, Deserialize)]
struct VerificationMethod {
    /// Method identifier, matched on its `#fragment`.
    id: String,
    /// Embedded public key material.
    #[serde(rename = "publicKeyJwk", default)]
    public_key_jwk: Option<Jwk>,
}

/// Fallback key-set document.
#[derive(Debug, Deserialize)]
struct KeySetDocument {
    /// Published keys.
    #[serde(default)]
    keys: Vec<Jwk>,
}

/// JSON Web Key subset for Ed25519 (OKP) keys.
#[derive(Debug, Deserialize)]
struct Jwk {
    /// Key type; `OKP` for Ed25519.
    #[serde(default)]
    kty: Option<String>,
    /// Curve name; `Ed25519`.
    #[serde(default)]
    crv: Option<String>,
    /// Base64url public key bytes.
    #[serde(default)]
    x: Option<String>,
    /// Key identifier.
    #[serde(default)]
    kid: Option<String>,
    /// Declared algorithm, when published.
    #[serde(default)]
    alg: Option<String>,
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Trust-anchor key resolver with an independent cache.
///
/// # Invariants
/// - The key cache is keyed `(issuer, key id)` and owned exclusively by
///   this resolver.
/// - The cache mutex is never held across an await point.
pub struct KeyResolver {
    /// Fetcher for key documents (cached separately from catalogs).
    fetcher: CatalogFetcher,
    /// Resolved-key lifetime.
    ttl: Duration,
    /// `(issuer, key id)` keyed cache.
    cache: Mutex<HashMap<(String, String), CachedKey>>,
}

impl KeyResolver {
    /// Builds a resolver with its own document fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the HTTP client cannot be constructed.
    pub fn new(fetcher_config: FetcherConfig, ttl: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            fetcher: CatalogFetcher::new(fetcher_config)?,
            ttl,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Resolves a verification key for `(issuer, key id)`.
    ///
    /// `token_alg` is the algorithm the token header declared; a key that
    /// declares anything else is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`KeyResolutionError`] when the issuer is invalid, both
    /// documents are unreachable, the key is absent from both, or the key
    /// material is unusable.
    pub async fn resolve(
        &self,
        issuer: &IssuerId,
        key_id: &KeyId,
        token_alg: &str,
    ) -> Result<VerificationKey, KeyResolutionError> {
        if let Some(cached) = self.cached(issuer, key_id)? {
            return Ok(cached);
        }
        let origin = issuer_origin(issuer)?;
        let mut transport_failures = Vec::new();

        match self.fetch_did_document(&origin, issuer).await {
            Ok(document) => {
                if let Some(jwk) = find_did_key(&document, key_id) {
                    let key =
                        build_key(jwk, issuer, key_id, token_alg, KeySource::DidDocument)?;
                    self.store(issuer, key_id, key.clone())?;
                    return Ok(key);
                }
            }
            // 4xx means the document does not exist: consulted, nothing found.
            Err(err) if err.is_retryable() => transport_failures.push(err),
            Err(_) => {}
        }

        match self.fetch_key_set(&origin, issuer).await {
            Ok(document) => {
                if let Some(jwk) =
                    document.keys.iter().find(|jwk| jwk.kid.as_deref() == Some(key_id.as_str()))
                {
                    let key = build_key(jwk, issuer, key_id, token_alg, KeySource::KeySet)?;
                    self.store(issuer, key_id, key.clone())?;
                    return Ok(key);
                }
            }
            Err(err) if err.is_retryable() => transport_failures.push(err),
            Err(_) => {}
        }

        // Absence is only terminal when every reachable source was searched;
        // any transport failure means the key may exist where we could not look.
        if !transport_failures.is_empty() {
            let reason = transport_failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(KeyResolutionError::Unreachable {
                issuer: issuer.to_string(),
                reason,
            });
        }
        Err(KeyResolutionError::NotFound {
            issuer: issuer.to_string(),
            key_id: key_id.to_string(),
        })
    }

    /// Fetches and parses the primary DID document.
    async fn fetch_did_document(
        &self,
        origin: &Url,
        issuer: &IssuerId,
    ) -> Result<DidDocument, FetchError> {
        let url = origin
            .join(DID_DOCUMENT_PATH)
            .map_err(|err| FetchError::InvalidUrl(format!("{issuer}: {err}")))?;
        let fetched = self.fetcher.fetch(url.as_str(), CachePolicy::Reuse).await?;
        serde_json::from_slice(&fetched.bytes)
            .map_err(|err| FetchError::Transport(format!("malformed did document: {err}")))
    }

    /// Fetches and parses the fallback key-set document.
    async fn fetch_key_set(
        &self,
        origin: &Url,
        issuer: &IssuerId,
    ) -> Result<KeySetDocument, FetchError> {
        let url = origin
            .join(KEY_SET_PATH)
            .map_err(|err| FetchError::InvalidUrl(format!("{issuer}: {err}")))?;
        let fetched = self.fetcher.fetch(url.as_str(), CachePolicy::Reuse).await?;
        serde_json::from_slice(&fetched.bytes)
            .map_err(|err| FetchError::Transport(format!("malformed key set: {err}")))
    }

    /// Returns a fresh cached resolution when available.
    fn cached(
        &self,
        issuer: &IssuerId,
        key_id: &KeyId,
    ) -> Result<Option<VerificationKey>, KeyResolutionError> {
        let cache = self.cache.lock().map_err(|_| KeyResolutionError::CachePoisoned)?;
        let entry = cache.get(&(issuer.to_string(), key_id.to_string()));
        Ok(entry
            .filter(|cached| cached.resolved_at.elapsed() <= self.ttl)
            .map(|cached| cached.key.clone()))
    }

    /// Stores a resolution in the cache.
    fn store(
        &self,
        issuer: &IssuerId,
        key_id: &KeyId,
        key: VerificationKey,
    ) -> Result<(), KeyResolutionError> {
        let mut cache = self.cache.lock().map_err(|_| KeyResolutionError::CachePoisoned)?;
        cache.insert(
            (issuer.to_string(), key_id.to_string()),
            CachedKey {
                key,
                resolved_at: Instant::now(),
            },
        );
        Ok(())
    }
}

// ============================================================================
// SECTION: Issuer Resolution
// ============================================================================

/// Maps an issuer identifier to the origin its key documents live under.
///
/// Accepted forms: `did:web:host` (optionally with a percent-encoded port),
/// an http(s) URL, or a bare host. `did:web` and bare hosts resolve over
/// https; http URLs keep their scheme so local anchors work. Path segments
/// are ignored; key documents live under the origin's well-known paths.
///
/// # Errors
///
/// Returns [`KeyResolutionError::InvalidIssuer`] when no origin can be
/// derived.
pub fn issuer_origin(issuer: &IssuerId) -> Result<Url, KeyResolutionError> {
    let raw = issuer.as_str().trim();
    if raw.is_empty() {
        return Err(invalid_issuer(issuer));
    }
    let candidate = if let Some(did) = raw.strip_prefix("did:web:") {
        let authority = did.split(':').next().unwrap_or(did).replace("%3A", ":");
        format!("https://{authority}")
    } else if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };
    let url = Url::parse(&candidate).map_err(|_| invalid_issuer(issuer))?;
    if url.host_str().is_none() {
        return Err(invalid_issuer(issuer));
    }
    // Only the origin matters; any path on an http(s) issuer is dropped.
    let mut origin = url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    Ok(origin)
}

/// Builds the invalid-issuer error.
fn invalid_issuer(issuer: &IssuerId) -> KeyResolutionError {
    KeyResolutionError::InvalidIssuer {
        issuer: issuer.to_string(),
    }
}

// ============================================================================
// SECTION: Key Material
// ============================================================================

/// Finds a DID verification method by key id fragment.
fn find_did_key<'a>(document: &'a DidDocument, key_id: &KeyId) -> Option<&'a Jwk> {
    let fragment = format!("#{}", key_id.as_str());
    document
        .verification_method
        .iter()
        .find(|method| method.id.ends_with(&fragment) || method.id == key_id.as_str())
        .and_then(|method| method.public_key_jwk.as_ref())
}

/// Builds a [`VerificationKey`] from a JWK entry, enforcing the algorithm.
fn build_key(
    jwk: &Jwk,
    issuer: &IssuerId,
    key_id: &KeyId,
    token_alg: &str,
    source: KeySource,
) -> Result<VerificationKey, KeyResolutionError> {
    if let Some(alg) = &jwk.alg
        && alg != token_alg
    {
        return Err(KeyResolutionError::AlgorithmMismatch {
            expected: token_alg.to_string(),
            declared: alg.clone(),
        });
    }
    let declared_curve = jwk.crv.as_deref().unwrap_or("");
    if jwk.kty.as_deref() != Some("OKP") || declared_curve != "Ed25519" {
        return Err(KeyResolutionError::AlgorithmMismatch {
            expected: TOKEN_ALGORITHM.to_string(),
            declared: format!(
                "{}/{}",
                jwk.kty.as_deref().unwrap_or("<none>"),
                if declared_curve.is_empty() { "<none>" } else { declared_curve }
            ),
        });
    }
    let x = jwk.x.as_deref().ok_or_else(|| KeyResolutionError::InvalidKey {
        key_id: key_id.to_string(),
        reason: "missing x coordinate".to_string(),
    })?;
    let bytes = Base64Url.decode(x).map_err(|err| KeyResolutionError::InvalidKey {
        key_id: key_id.to_string(),
        reason: format!("invalid base64url: {err}"),
    })?;
    let bytes: [u8; 32] =
        bytes.as_slice().try_into().map_err(|_| KeyResolutionError::InvalidKey {
            key_id: key_id.to_string(),
            reason: "ed25519 keys are 32 bytes".to_string(),
        })?;
    let key = VerifyingKey::from_bytes(&bytes).map_err(|err| KeyResolutionError::InvalidKey {
        key_id: key_id.to_string(),
        reason: err.to_string(),
    })?;
    Ok(VerificationKey {
        key,
        algorithm: TOKEN_ALGORITHM.to_string(),
        key_id: key_id.clone(),
        issuer: issuer.clone(),
        source,
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
