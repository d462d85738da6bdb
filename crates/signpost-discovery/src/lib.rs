// crates/signpost-discovery/src/lib.rs
// ============================================================================
// Module: Signpost Discovery
// Description: Catalog discovery, verification, indexing, and execution pipeline.
// Purpose: Turn an untrusted catalog URL into a verified, queryable tool snapshot.
// Dependencies: base64, ed25519-dalek, reqwest, serde, signpost-core, signpost-mcp, time, tokio
// ============================================================================

//! ## Overview
//! `signpost-discovery` is the trust boundary of Signpost. It fetches an
//! untrusted catalog document, validates its structure, verifies its
//! detached Ed25519 token against a key resolved from the issuer's trust
//! anchor, integrity-checks referenced specs on demand, and publishes the
//! result as an immutable snapshot for lookup and execution.
//!
//! Security posture: everything arriving from the network is hostile until
//! the full pipeline has passed. The pipeline fails closed: no partial
//! document is ever indexed, and verification failures are surfaced, never
//! downgraded.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod fetch;
pub mod index;
pub mod keys;
pub mod orchestrator;
pub mod telemetry;
pub mod token;
pub mod verify;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::DiscoveryConfig;
pub use config::SignaturePolicy;
pub use fetch::CachePolicy;
pub use fetch::CatalogFetcher;
pub use fetch::FetchError;
pub use fetch::FetchedDocument;
pub use fetch::FetcherConfig;
pub use fetch::SIGNATURE_HEADER;
pub use index::ToolIndex;
pub use index::ToolIndexEntry;
pub use keys::KeyResolutionError;
pub use keys::KeyResolver;
pub use keys::KeySource;
pub use keys::VerificationKey;
pub use orchestrator::CatalogSnapshot;
pub use orchestrator::ContentStatus;
pub use orchestrator::DiscoveryError;
pub use orchestrator::DiscoveryOrchestrator;
pub use telemetry::DiscoveryEvent;
pub use telemetry::DiscoveryObserver;
pub use telemetry::DiscoveryStage;
pub use telemetry::NoopObserver;
pub use telemetry::StageOutcome;
pub use token::TOKEN_ALGORITHM;
pub use token::TokenError;
pub use token::VerificationToken;
pub use verify::SignatureVerificationError;
pub use verify::SignatureVerifier;
pub use verify::VerificationOutcome;
pub use verify::VerificationStep;
pub use verify::VerifiedToken;
