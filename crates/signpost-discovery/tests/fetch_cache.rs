// crates/signpost-discovery/tests/fetch_cache.rs
// ============================================================================
// Module: Fetcher Cache Tests
// Description: Freshness, revalidation, and failure taxonomy for the fetcher.
// Purpose: Verify TTL reuse, conditional GETs, bypass, and size caps.
// ============================================================================

//! ## Overview
//! Exercises the catalog fetcher against counting local servers: fresh
//! entries served without I/O, stale entries revalidated with
//! `If-None-Match`, bypass refetches, retryable classification of statuses,
//! and the hard response size cap.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use signpost_discovery::CachePolicy;
use signpost_discovery::CatalogFetcher;
use signpost_discovery::FetchError;
use signpost_discovery::FetcherConfig;
use signpost_discovery::SIGNATURE_HEADER;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Spawns a server that counts requests and answers 200 with an ETag,
/// or 304 when the client presents the matching validator.
fn etag_server(body: &'static str, etag: &'static str) -> (String, Arc<AtomicUsize>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let base = format!("http://{}", server.server_addr());
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    thread::spawn(move || {
        for request in server.incoming_requests() {
            counter.fetch_add(1, Ordering::SeqCst);
            let revalidating = request
                .headers()
                .iter()
                .any(|h| h.field.equiv("If-None-Match") && h.value.as_str() == etag);
            if revalidating {
                let _ = request.respond(Response::empty(304));
                continue;
            }
            let etag_header = Header::from_bytes(&b"ETag"[..], etag.as_bytes()).unwrap();
            let signature_header =
                Header::from_bytes(SIGNATURE_HEADER.as_bytes(), &b"token-bytes"[..]).unwrap();
            let _ = request.respond(
                Response::from_string(body).with_header(etag_header).with_header(signature_header),
            );
        }
    });
    (base, hits)
}

/// Fetcher with the given TTL and small limits.
fn fetcher_with_ttl(ttl: Duration) -> CatalogFetcher {
    CatalogFetcher::new(FetcherConfig {
        timeout: Duration::from_secs(5),
        ttl,
        max_response_bytes: 64 * 1024,
    })
    .unwrap()
}

// ============================================================================
// SECTION: Freshness
// ============================================================================

#[tokio::test]
async fn fresh_entry_is_served_without_network_io() {
    let (base, hits) = etag_server("{\"version\":\"1.0\",\"tools\":[]}", "\"v1\"");
    let url = format!("{base}/.well-known/api-catalog");
    let fetcher = fetcher_with_ttl(Duration::from_secs(300));

    let first = fetcher.fetch(&url, CachePolicy::Reuse).await.unwrap();
    assert!(!first.from_cache);
    let second = fetcher.fetch(&url, CachePolicy::Reuse).await.unwrap();
    assert!(second.from_cache);
    assert_eq!(second.bytes, first.bytes);
    assert_eq!(hits.load(Ordering::SeqCst), 1, "fresh entry must not refetch");
}

#[tokio::test]
async fn signature_header_is_carried_on_cached_documents() {
    let (base, _hits) = etag_server("{}", "\"v1\"");
    let url = format!("{base}/doc");
    let fetcher = fetcher_with_ttl(Duration::from_secs(300));

    let first = fetcher.fetch(&url, CachePolicy::Reuse).await.unwrap();
    assert_eq!(first.signature_token.as_deref(), Some("token-bytes"));
    let second = fetcher.fetch(&url, CachePolicy::Reuse).await.unwrap();
    assert_eq!(second.signature_token.as_deref(), Some("token-bytes"));
}

// ============================================================================
// SECTION: Revalidation
// ============================================================================

#[tokio::test]
async fn stale_entry_revalidates_and_serves_cached_bytes_on_304() {
    let (base, hits) = etag_server("cached-body", "\"v7\"");
    let url = format!("{base}/doc");
    // Zero TTL: every reuse is stale and must revalidate.
    let fetcher = fetcher_with_ttl(Duration::ZERO);

    let first = fetcher.fetch(&url, CachePolicy::Reuse).await.unwrap();
    assert!(!first.from_cache);
    let second = fetcher.fetch(&url, CachePolicy::Reuse).await.unwrap();
    assert!(second.from_cache, "304 must serve the cached body");
    assert_eq!(second.bytes, b"cached-body");
    assert_eq!(hits.load(Ordering::SeqCst), 2, "revalidation must hit the server");
}

#[tokio::test]
async fn bypass_ignores_the_cache() {
    let (base, hits) = etag_server("body", "\"v1\"");
    let url = format!("{base}/doc");
    let fetcher = fetcher_with_ttl(Duration::from_secs(300));

    let _ = fetcher.fetch(&url, CachePolicy::Reuse).await.unwrap();
    let second = fetcher.fetch(&url, CachePolicy::Bypass).await.unwrap();
    assert!(!second.from_cache);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

// ============================================================================
// SECTION: Failure Taxonomy
// ============================================================================

#[tokio::test]
async fn not_found_is_terminal() {
    let (server, base) = common::bind_server();
    common::serve_routes(server, std::collections::HashMap::new());
    let fetcher = fetcher_with_ttl(Duration::from_secs(300));
    let err = fetcher.fetch(&format!("{base}/missing"), CachePolicy::Reuse).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 404, retryable: false }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn server_error_is_retryable() {
    let server = Server::http("127.0.0.1:0").unwrap();
    let base = format!("http://{}", server.server_addr());
    thread::spawn(move || {
        for request in server.incoming_requests() {
            let _ = request.respond(Response::from_string("boom").with_status_code(503));
        }
    });
    let fetcher = fetcher_with_ttl(Duration::from_secs(300));
    let err = fetcher.fetch(&format!("{base}/doc"), CachePolicy::Reuse).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 503, retryable: true }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn oversized_body_is_rejected_and_not_cached() {
    let server = Server::http("127.0.0.1:0").unwrap();
    let base = format!("http://{}", server.server_addr());
    thread::spawn(move || {
        for request in server.incoming_requests() {
            let _ = request.respond(Response::from_string("x".repeat(1024)));
        }
    });
    let fetcher = CatalogFetcher::new(FetcherConfig {
        timeout: Duration::from_secs(5),
        ttl: Duration::from_secs(300),
        max_response_bytes: 64,
    })
    .unwrap();
    let url = format!("{base}/doc");
    let err = fetcher.fetch(&url, CachePolicy::Reuse).await.unwrap_err();
    assert!(matches!(err, FetchError::ResponseTooLarge { .. }));
    // The failed read must not have populated the cache.
    let err = fetcher.fetch(&url, CachePolicy::Reuse).await.unwrap_err();
    assert!(matches!(err, FetchError::ResponseTooLarge { .. }));
}

#[tokio::test]
async fn invalid_url_is_rejected_before_io() {
    let fetcher = fetcher_with_ttl(Duration::from_secs(300));
    let err = fetcher.fetch("not a url", CachePolicy::Reuse).await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidUrl(_)));
    assert!(!err.is_retryable());
}
