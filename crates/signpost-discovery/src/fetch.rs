// crates/signpost-discovery/src/fetch.rs
// ============================================================================
// Module: Catalog Fetcher
// Description: HTTP fetcher with freshness, revalidation, and size caps.
// Purpose: Retrieve catalog, key, and spec documents without trusting the network.
// Dependencies: reqwest, time
// ============================================================================

//! ## Overview
//! [`CatalogFetcher`] performs HTTP GETs for catalog documents, key
//! documents, and referenced specs. Each fetcher owns one cache keyed by
//! URL; entries honor a TTL and are revalidated with `If-None-Match` /
//! `If-Modified-Since` once stale. A cache entry is inserted only after the
//! body has been read completely, so a cancelled or failed fetch never
//! leaves a partial entry behind.
//!
//! Security posture: remote content is untrusted. Redirects are rejected,
//! non-2xx statuses fail closed, and bodies are capped at a hard byte
//! limit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use reqwest::Client;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use reqwest::header::ETAG;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::header::IF_MODIFIED_SINCE;
use reqwest::header::IF_NONE_MATCH;
use reqwest::header::LAST_MODIFIED;
use reqwest::redirect::Policy;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Response header carrying the detached catalog verification token.
pub const SIGNATURE_HEADER: &str = "x-catalog-signature";

/// Default response body cap.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

/// Default cache TTL for fetched documents.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fetch-layer errors.
///
/// # Invariants
/// - Variants are stable for caller branching and tests.
/// - `is_retryable` reflects the propagation policy: 5xx and transport
///   failures may be retried with backoff; 4xx may not.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL did not parse.
    #[error("invalid fetch url: {0}")]
    InvalidUrl(String),
    /// Non-2xx HTTP status.
    #[error("http status {status}")]
    Status {
        /// Status code as received.
        status: u16,
        /// Whether the failure class is retryable.
        retryable: bool,
    },
    /// Connection, TLS, or protocol-level transport failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// The request deadline elapsed.
    #[error("fetch timed out: {0}")]
    Timeout(String),
    /// Response size exceeds limits.
    #[error("response exceeds size limit ({actual} > {limit})")]
    ResponseTooLarge {
        /// Actual size in bytes.
        actual: usize,
        /// Maximum size in bytes.
        limit: usize,
    },
}

impl FetchError {
    /// Returns true when the failure may succeed on retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Status {
                retryable, ..
            } => *retryable,
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::InvalidUrl(_) | Self::ResponseTooLarge { .. } => false,
        }
    }
}

// ============================================================================
// SECTION: Cache Types
// ============================================================================

/// Cache reuse policy for one fetch.
///
/// # Invariants
/// - Variants are stable for caller configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Serve fresh entries; revalidate stale entries with conditional GETs.
    #[default]
    Reuse,
    /// Ignore and replace any cached entry.
    Bypass,
}

/// One cached document.
///
/// # Invariants
/// - Present only after a complete, successful body read.
#[derive(Debug, Clone)]
struct CacheEntry {
    /// Response body bytes.
    bytes: Vec<u8>,
    /// ETag validator when the server provided one.
    etag: Option<String>,
    /// Last-Modified validator when the server provided one.
    last_modified: Option<String>,
    /// Detached signature token header, when present.
    signature_token: Option<String>,
    /// Instant the entry was stored or last revalidated.
    fetched_at: Instant,
}

/// A fetched document with its out-of-band metadata.
///
/// # Invariants
/// - `bytes` is the complete response body.
/// - `signature_token` is the raw `x-catalog-signature` header value when
///   the server sent one.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// Response body bytes.
    pub bytes: Vec<u8>,
    /// Detached verification token, when present.
    pub signature_token: Option<String>,
    /// True when the bytes were served from cache (fresh or revalidated).
    pub from_cache: bool,
}

// ============================================================================
// SECTION: Fetcher Configuration
// ============================================================================

/// Fetcher construction parameters.
///
/// # Invariants
/// - `ttl` and `timeout` are non-zero in any useful configuration; zero
///   values disable caching and fail every request respectively.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// Freshness lifetime of cache entries.
    pub ttl: Duration,
    /// Maximum accepted response body size.
    pub max_response_bytes: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            ttl: DEFAULT_TTL,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

// ============================================================================
// SECTION: Fetcher
// ============================================================================

/// HTTP fetcher with one URL-keyed cache.
///
/// # Invariants
/// - The cache is owned exclusively by this fetcher and reached only
///   through [`CatalogFetcher::fetch`].
/// - The cache mutex is never held across an await point.
pub struct CatalogFetcher {
    /// Reqwest client instance.
    client: Client,
    /// Fetch and cache parameters.
    config: FetcherConfig,
    /// URL-keyed document cache.
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl CatalogFetcher {
    /// Builds a fetcher with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] when the HTTP client cannot be
    /// constructed.
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            config,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Fetches a document, honoring the cache policy.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on invalid URLs, non-2xx statuses, transport
    /// failures, timeouts, or oversized bodies.
    pub async fn fetch(
        &self,
        url: &str,
        policy: CachePolicy,
    ) -> Result<FetchedDocument, FetchError> {
        let parsed = Url::parse(url).map_err(|err| FetchError::InvalidUrl(err.to_string()))?;
        let mut validators = None;
        if policy == CachePolicy::Reuse {
            match self.cached(url)? {
                Some(CachedLookup::Fresh(document)) => return Ok(document),
                Some(CachedLookup::Stale {
                    etag,
                    last_modified,
                }) => validators = Some((etag, last_modified)),
                None => {}
            }
        }
        let headers = request_headers(validators.as_ref())?;
        let response = self
            .client
            .get(parsed)
            .headers(headers)
            .send()
            .await
            .map_err(classify_transport_error)?;
        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            return self.revalidated(url);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                retryable: status.is_server_error(),
            });
        }
        let etag = header_value(response.headers(), ETAG.as_str());
        let last_modified = header_value(response.headers(), LAST_MODIFIED.as_str());
        let signature_token = header_value(response.headers(), SIGNATURE_HEADER);
        let bytes = read_response_body_with_limit(response, self.config.max_response_bytes).await?;
        self.store(
            url,
            CacheEntry {
                bytes: bytes.clone(),
                etag,
                last_modified,
                signature_token: signature_token.clone(),
                fetched_at: Instant::now(),
            },
        )?;
        Ok(FetchedDocument {
            bytes,
            signature_token,
            from_cache: false,
        })
    }

    /// Looks up the cache and classifies the entry's freshness.
    fn cached(&self, url: &str) -> Result<Option<CachedLookup>, FetchError> {
        let cache = self.cache.lock().map_err(|_| lock_poisoned())?;
        let Some(entry) = cache.get(url) else {
            return Ok(None);
        };
        if entry.fetched_at.elapsed() <= self.config.ttl {
            return Ok(Some(CachedLookup::Fresh(FetchedDocument {
                bytes: entry.bytes.clone(),
                signature_token: entry.signature_token.clone(),
                from_cache: true,
            })));
        }
        Ok(Some(CachedLookup::Stale {
            etag: entry.etag.clone(),
            last_modified: entry.last_modified.clone(),
        }))
    }

    /// Serves the cached body after a 304 and refreshes its freshness.
    fn revalidated(&self, url: &str) -> Result<FetchedDocument, FetchError> {
        let mut cache = self.cache.lock().map_err(|_| lock_poisoned())?;
        let entry = cache.get_mut(url).ok_or_else(|| {
            FetchError::Transport("server sent 304 for a document not in cache".to_string())
        })?;
        entry.fetched_at = Instant::now();
        Ok(FetchedDocument {
            bytes: entry.bytes.clone(),
            signature_token: entry.signature_token.clone(),
            from_cache: true,
        })
    }

    /// Stores a complete entry in the cache.
    fn store(&self, url: &str, entry: CacheEntry) -> Result<(), FetchError> {
        let mut cache = self.cache.lock().map_err(|_| lock_poisoned())?;
        cache.insert(url.to_string(), entry);
        Ok(())
    }

    /// Drops every cached entry.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] when the cache lock is poisoned.
    pub fn clear_cache(&self) -> Result<(), FetchError> {
        let mut cache = self.cache.lock().map_err(|_| lock_poisoned())?;
        cache.clear();
        Ok(())
    }
}

/// Freshness classification of a cache lookup.
enum CachedLookup {
    /// Entry within TTL; serve without I/O.
    Fresh(FetchedDocument),
    /// Entry past TTL; revalidate with these validators.
    Stale {
        /// ETag validator when stored.
        etag: Option<String>,
        /// Last-Modified validator when stored.
        last_modified: Option<String>,
    },
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds request headers, attaching validators when revalidating.
fn request_headers(
    validators: Option<&(Option<String>, Option<String>)>,
) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some((etag, last_modified)) = validators {
        if let Some(etag) = etag {
            let value = HeaderValue::from_str(etag)
                .map_err(|_| FetchError::Transport("invalid cached etag".to_string()))?;
            headers.insert(IF_NONE_MATCH, value);
        }
        if let Some(last_modified) = last_modified {
            let value = HeaderValue::from_str(last_modified)
                .map_err(|_| FetchError::Transport("invalid cached last-modified".to_string()))?;
            headers.insert(IF_MODIFIED_SINCE, value);
        }
    }
    Ok(headers)
}

/// Reads one response header as an owned string.
fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_string)
}

/// Maps a reqwest error to the transport/timeout taxonomy.
fn classify_transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(err.to_string())
    } else {
        FetchError::Transport(err.to_string())
    }
}

/// Error used when the cache mutex is poisoned.
fn lock_poisoned() -> FetchError {
    FetchError::Transport("fetch cache lock poisoned".to_string())
}

/// Reads an HTTP response body while enforcing a hard byte limit.
async fn read_response_body_with_limit(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let mut body = Vec::new();
    let mut total: usize = 0;
    while let Some(chunk) = response.chunk().await.map_err(classify_transport_error)? {
        let next_total = total.checked_add(chunk.len()).ok_or(FetchError::ResponseTooLarge {
            actual: usize::MAX,
            limit,
        })?;
        if next_total > limit {
            return Err(FetchError::ResponseTooLarge {
                actual: next_total,
                limit,
            });
        }
        body.extend_from_slice(&chunk);
        total = next_total;
    }
    Ok(body)
}
