// crates/signpost-discovery/src/telemetry.rs
// ============================================================================
// Module: Discovery Telemetry
// Description: Observability hooks for the discovery and execution pipeline.
// Purpose: Provide stage events without hard observability dependencies.
// Dependencies: signpost-core
// ============================================================================

//! ## Overview
//! This module exposes a thin observer interface for pipeline stage events.
//! It is intentionally dependency-light so downstream deployments can plug
//! in their own metrics or logging sink without redesign. Security posture:
//! events must avoid leaking tokens, key material, or argument payloads and
//! treat labels as untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use signpost_core::ToolName;

// ============================================================================
// SECTION: Stage Labels
// ============================================================================

/// Pipeline stage classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStage {
    /// Catalog fetch.
    Fetch,
    /// Structural validation.
    Validate,
    /// Signature verification.
    VerifySignature,
    /// Referenced-spec content check.
    ContentCheck,
    /// Index build and snapshot swap.
    Publish,
    /// Remote tool execution.
    Execute,
}

impl DiscoveryStage {
    /// Returns a stable label for the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Validate => "validate",
            Self::VerifySignature => "verify-signature",
            Self::ContentCheck => "content-check",
            Self::Publish => "publish",
            Self::Execute => "execute",
        }
    }
}

/// Stage outcome classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Stage completed.
    Ok,
    /// Stage failed.
    Error,
}

impl StageOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// One pipeline stage event.
///
/// # Invariants
/// - `detail` is a short label (an error kind, a count), never a payload.
#[derive(Debug, Clone)]
pub struct DiscoveryEvent {
    /// Stage the event belongs to.
    pub stage: DiscoveryStage,
    /// Stage outcome.
    pub outcome: StageOutcome,
    /// Tool the stage worked on, when applicable.
    pub tool: Option<ToolName>,
    /// Short outcome detail.
    pub detail: Option<String>,
    /// Stage latency, when measured.
    pub elapsed: Option<Duration>,
}

/// Observer for pipeline stage events.
///
/// The default implementation drops every event, so observability is
/// strictly opt-in.
pub trait DiscoveryObserver: Send + Sync {
    /// Receives one stage event.
    fn on_event(&self, event: &DiscoveryEvent) {
        let _ = event;
    }
}

/// Observer that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl DiscoveryObserver for NoopObserver {}

// ============================================================================
// SECTION: Tests
// ============================================================================
