// crates/signpost-discovery/src/orchestrator.rs
// ============================================================================
// Module: Discovery Orchestrator
// Description: End-to-end discover, verify, index, and invoke lifecycle.
// Purpose: Compose fetcher, validator, verifier, and index behind one snapshot slot.
// Dependencies: signpost-core, signpost-mcp, tokio
// ============================================================================

//! ## Overview
//! [`DiscoveryOrchestrator`] drives the fetch, validate, verify, and index
//! stages and publishes the result as an immutable [`CatalogSnapshot`]. The snapshot
//! slot is the orchestrator's only mutation, swapped atomically after the
//! whole pipeline has passed; concurrent readers always see either the old
//! or the new snapshot, never a partial one. Discovery failure leaves the
//! previous snapshot untouched and indexes nothing from the new document.
//!
//! Referenced-spec integrity is checked lazily, per tool or as a bounded
//! concurrent sweep, and recorded on the snapshot. Execution consults the
//! recorded status and the configured policy before any remote call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

use serde_json::Value;
use signpost_core::CatalogDocument;
use signpost_core::HashDigest;
use signpost_core::ToolName;
use signpost_core::ToolRecord;
use signpost_core::ValidationError;
use signpost_core::parse_catalog;
use signpost_mcp::McpClient;
use signpost_mcp::McpClientConfig;
use signpost_mcp::McpClientError;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::config::ConfigError;
use crate::config::DiscoveryConfig;
use crate::config::SignaturePolicy;
use crate::fetch::CachePolicy;
use crate::fetch::CatalogFetcher;
use crate::fetch::FetchError;
use crate::fetch::FetcherConfig;
use crate::index::ToolIndex;
use crate::keys::KeyResolutionError;
use crate::keys::KeyResolver;
use crate::telemetry::DiscoveryEvent;
use crate::telemetry::DiscoveryObserver;
use crate::telemetry::DiscoveryStage;
use crate::telemetry::NoopObserver;
use crate::telemetry::StageOutcome;
use crate::verify::SignatureVerificationError;
use crate::verify::SignatureVerifier;
use crate::verify::VerificationOutcome;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Umbrella error for the discovery and execution lifecycle.
///
/// # Invariants
/// - Component taxonomies are wrapped, never flattened, so callers can
///   branch on the underlying failure.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Configuration was rejected before any I/O.
    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),
    /// Fetch-layer failure.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    /// Structural validation failure; terminal for this document.
    #[error("catalog validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// Signature verification failure; terminal for this document.
    #[error("signature verification failed: {0}")]
    Signature(#[from] SignatureVerificationError),
    /// Policy requires a signature and the catalog carried none.
    #[error("catalog is unsigned but policy requires a signature")]
    SignatureRequired,
    /// A referenced spec's digest did not match; execution refused.
    #[error("content integrity failed for tool {tool}")]
    ContentIntegrity {
        /// Tool whose spec failed its digest check.
        tool: String,
    },
    /// Lookup miss; recoverable by choosing another tool.
    #[error("tool not found: {name}")]
    ToolNotFound {
        /// Name that was looked up.
        name: String,
    },
    /// No snapshot has been published yet.
    #[error("no catalog snapshot has been published")]
    NoSnapshot,
    /// Remote call failure, surfaced verbatim from the client.
    #[error("remote call failed: {0}")]
    RemoteCall(#[from] McpClientError),
    /// Internal state failure (poisoned lock, join failure).
    #[error("internal state error: {0}")]
    Internal(String),
}

impl DiscoveryError {
    /// Returns true when the orchestrator may retry the operation.
    ///
    /// Verification and integrity failures are terminal for the fetched
    /// document; only transport-caused failures qualify.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(err) => err.is_retryable(),
            Self::RemoteCall(err) => err.is_retryable(),
            Self::Signature(SignatureVerificationError::KeyResolution(
                KeyResolutionError::Unreachable { .. },
            )) => true,
            _ => false,
        }
    }
}

// ============================================================================
// SECTION: Content Status
// ============================================================================

/// Integrity state of one tool's referenced spec.
///
/// # Invariants
/// - Variants are stable for policy decisions and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentStatus {
    /// A digest is declared but the spec has not been fetched yet.
    Unchecked,
    /// No digest was declared; the spec was never integrity-checked.
    Undeclared,
    /// The fetched spec matched its declared digest.
    Verified,
    /// The fetched spec did not match its declared digest.
    Failed,
}

impl ContentStatus {
    /// Returns a stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unchecked => "unchecked",
            Self::Undeclared => "undeclared",
            Self::Verified => "verified",
            Self::Failed => "failed",
        }
    }
}

// ============================================================================
// SECTION: Catalog Snapshot
// ============================================================================

/// Immutable result of one successful discovery pass.
///
/// # Invariants
/// - `document` passed structural validation; `index` was built from it.
/// - Only the per-tool content statuses mutate after publication, and only
///   through the orchestrator's integrity checks.
#[derive(Debug)]
pub struct CatalogSnapshot {
    /// The validated catalog document.
    pub document: CatalogDocument,
    /// Queryable index over the document.
    pub index: ToolIndex,
    /// Signature verification outcome for the document.
    pub verification: VerificationOutcome,
    /// Whether the catalog bytes came from cache.
    pub from_cache: bool,
    /// Recorded integrity checks, keyed by tool name.
    content: RwLock<HashMap<ToolName, ContentStatus>>,
}

impl CatalogSnapshot {
    /// Builds a snapshot from pipeline outputs.
    fn new(
        document: CatalogDocument,
        index: ToolIndex,
        verification: VerificationOutcome,
        from_cache: bool,
    ) -> Self {
        Self {
            document,
            index,
            verification,
            from_cache,
            content: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the integrity status of a tool, or `None` for unknown names.
    ///
    /// Tools without a declared digest report [`ContentStatus::Undeclared`];
    /// declared-but-unchecked tools report [`ContentStatus::Unchecked`].
    #[must_use]
    pub fn content_status(&self, name: &str) -> Option<ContentStatus> {
        let record = self.index.find_by_name(name)?;
        if let Ok(recorded) = self.content.read()
            && let Some(status) = recorded.get(&record.name)
        {
            return Some(*status);
        }
        Some(if record.spec_hash.is_some() {
            ContentStatus::Unchecked
        } else {
            ContentStatus::Undeclared
        })
    }

    /// Records an integrity check result.
    fn record_content_status(
        &self,
        name: ToolName,
        status: ContentStatus,
    ) -> Result<(), DiscoveryError> {
        let mut recorded = self
            .content
            .write()
            .map_err(|_| DiscoveryError::Internal("content status lock poisoned".to_string()))?;
        recorded.insert(name, status);
        Ok(())
    }
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Composition root for the discover, verify, index, and invoke lifecycle.
///
/// # Invariants
/// - `current` is the single mutable slot; it is replaced only after a
///   fully validated (and, per policy, verified) snapshot exists.
/// - Each cache (catalog, key, spec) is owned by its component and reached
///   only through that component's interface.
pub struct DiscoveryOrchestrator {
    /// Validated configuration.
    config: DiscoveryConfig,
    /// Fetcher for the catalog document.
    catalog_fetcher: CatalogFetcher,
    /// Fetcher for referenced specs, shared with fan-out tasks.
    spec_fetcher: Arc<CatalogFetcher>,
    /// Signature verifier owning the key resolver.
    verifier: SignatureVerifier,
    /// Stage event observer.
    observer: Arc<dyn DiscoveryObserver>,
    /// Current published snapshot.
    current: RwLock<Option<Arc<CatalogSnapshot>>>,
}

impl DiscoveryOrchestrator {
    /// Builds an orchestrator from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] when the configuration is invalid or an
    /// HTTP client cannot be constructed.
    pub fn new(config: DiscoveryConfig) -> Result<Self, DiscoveryError> {
        Self::with_observer(config, Arc::new(NoopObserver))
    }

    /// Builds an orchestrator with a stage event observer.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] when the configuration is invalid or an
    /// HTTP client cannot be constructed.
    pub fn with_observer(
        config: DiscoveryConfig,
        observer: Arc<dyn DiscoveryObserver>,
    ) -> Result<Self, DiscoveryError> {
        config.validate()?;
        let catalog_fetcher = CatalogFetcher::new(FetcherConfig {
            timeout: config.request_timeout(),
            ttl: config.catalog_ttl(),
            max_response_bytes: config.max_response_bytes,
        })?;
        let spec_fetcher = Arc::new(CatalogFetcher::new(FetcherConfig {
            timeout: config.request_timeout(),
            ttl: config.spec_ttl(),
            max_response_bytes: config.max_response_bytes,
        })?);
        let resolver = KeyResolver::new(
            FetcherConfig {
                timeout: config.request_timeout(),
                ttl: config.key_ttl(),
                max_response_bytes: config.max_response_bytes,
            },
            config.key_ttl(),
        )?;
        let skew_secs = i64::try_from(config.clock_skew_secs).unwrap_or(i64::MAX);
        let verifier = SignatureVerifier::new(resolver, time::Duration::seconds(skew_secs));
        Ok(Self {
            config,
            catalog_fetcher,
            spec_fetcher,
            verifier,
            observer,
            current: RwLock::new(None),
        })
    }

    /// Returns the configuration the orchestrator was built from.
    #[must_use]
    pub const fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Returns the current published snapshot, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<CatalogSnapshot>> {
        self.current.read().ok().and_then(|slot| slot.clone())
    }

    /// Runs the full discovery pipeline and publishes a new snapshot.
    ///
    /// On any failure the previously published snapshot stays in place;
    /// nothing from the failed document is indexed. Cancelling the returned
    /// future before completion has the same effect.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] from the first failing stage.
    pub async fn discover(
        &self,
        policy: CachePolicy,
    ) -> Result<Arc<CatalogSnapshot>, DiscoveryError> {
        let fetched = match self.catalog_fetcher.fetch(&self.config.catalog_url, policy).await {
            Ok(fetched) => {
                self.emit(DiscoveryStage::Fetch, StageOutcome::Ok, None, None);
                fetched
            }
            Err(err) => {
                self.emit(DiscoveryStage::Fetch, StageOutcome::Error, None, Some(err.to_string()));
                return Err(err.into());
            }
        };

        let document = match parse_catalog(&fetched.bytes) {
            Ok(document) => {
                self.emit(
                    DiscoveryStage::Validate,
                    StageOutcome::Ok,
                    None,
                    Some(format!("{} tools", document.tools.len())),
                );
                document
            }
            Err(err) => {
                self.emit(
                    DiscoveryStage::Validate,
                    StageOutcome::Error,
                    None,
                    Some(err.to_string()),
                );
                return Err(err.into());
            }
        };

        let token = fetched.signature_token.as_deref();
        let verification = match self.verify_fetched(&fetched.bytes, token).await {
            Ok(outcome) => {
                let detail = if outcome.is_verified() { "verified" } else { "unsigned" };
                self.emit(
                    DiscoveryStage::VerifySignature,
                    StageOutcome::Ok,
                    None,
                    Some(detail.to_string()),
                );
                outcome
            }
            Err(err) => {
                self.emit(
                    DiscoveryStage::VerifySignature,
                    StageOutcome::Error,
                    None,
                    Some(err.to_string()),
                );
                return Err(err);
            }
        };

        let index = ToolIndex::build(&document);
        let snapshot =
            Arc::new(CatalogSnapshot::new(document, index, verification, fetched.from_cache));
        {
            let mut slot = self
                .current
                .write()
                .map_err(|_| DiscoveryError::Internal("snapshot lock poisoned".to_string()))?;
            *slot = Some(Arc::clone(&snapshot));
        }
        self.emit(
            DiscoveryStage::Publish,
            StageOutcome::Ok,
            None,
            Some(format!("{} tools", snapshot.index.len())),
        );
        Ok(snapshot)
    }

    /// Re-runs discovery bypassing the catalog cache.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] from the first failing stage.
    pub async fn refresh(&self) -> Result<Arc<CatalogSnapshot>, DiscoveryError> {
        self.discover(CachePolicy::Bypass).await
    }

    /// Applies the signature policy to a fetched catalog.
    async fn verify_fetched(
        &self,
        catalog_bytes: &[u8],
        token: Option<&str>,
    ) -> Result<VerificationOutcome, DiscoveryError> {
        match (self.config.signature_policy, token) {
            (SignaturePolicy::Disabled, _) => Ok(VerificationOutcome::Unsigned),
            (SignaturePolicy::Required, None) => Err(DiscoveryError::SignatureRequired),
            (SignaturePolicy::Required | SignaturePolicy::IfPresent, Some(token)) => {
                let verified = self.verifier.verify(catalog_bytes, token).await?;
                Ok(VerificationOutcome::Verified(verified))
            }
            (SignaturePolicy::IfPresent, None) => Ok(VerificationOutcome::Unsigned),
        }
    }

    /// Integrity-checks one tool's referenced spec and records the result.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] when no snapshot exists, the tool is
    /// unknown, or the spec fetch fails. A digest mismatch is reported as
    /// [`ContentStatus::Failed`], not as an error.
    pub async fn verify_tool_content(&self, name: &str) -> Result<ContentStatus, DiscoveryError> {
        let snapshot = self.snapshot().ok_or(DiscoveryError::NoSnapshot)?;
        let record = snapshot
            .index
            .find_by_name(name)
            .cloned()
            .ok_or_else(|| DiscoveryError::ToolNotFound {
                name: name.to_string(),
            })?;
        self.check_content(&snapshot, &record).await
    }

    /// Integrity-checks every tool with a declared digest, fanning out with
    /// the configured concurrency bound, and records each result.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] when no snapshot exists or a spec fetch
    /// fails; digest mismatches are recorded as [`ContentStatus::Failed`]
    /// entries in the returned map.
    pub async fn verify_all_content(
        &self,
    ) -> Result<BTreeMap<ToolName, ContentStatus>, DiscoveryError> {
        let snapshot = self.snapshot().ok_or(DiscoveryError::NoSnapshot)?;
        let mut statuses = BTreeMap::new();
        let mut declared: Vec<(ToolName, String, HashDigest)> = Vec::new();
        for entry in snapshot.index.iter() {
            let name = entry.record.name.clone();
            match &entry.record.spec_hash {
                None => {
                    snapshot.record_content_status(name.clone(), ContentStatus::Undeclared)?;
                    statuses.insert(name, ContentStatus::Undeclared);
                }
                Some(digest) => {
                    declared.push((name, entry.record.spec_url.clone(), digest.clone()));
                }
            }
        }
        for batch in declared.chunks(self.config.max_concurrent_spec_checks) {
            let mut tasks = JoinSet::new();
            for (name, spec_url, expected) in batch.iter().cloned() {
                let fetcher = Arc::clone(&self.spec_fetcher);
                tasks.spawn(async move {
                    let result = fetcher.fetch(&spec_url, CachePolicy::Reuse).await;
                    (name, expected, result)
                });
            }
            while let Some(joined) = tasks.join_next().await {
                let (name, expected, result) = joined
                    .map_err(|err| DiscoveryError::Internal(format!("spec check join: {err}")))?;
                let fetched = result?;
                let status = if expected.matches(&fetched.bytes) {
                    ContentStatus::Verified
                } else {
                    ContentStatus::Failed
                };
                self.emit(
                    DiscoveryStage::ContentCheck,
                    if status == ContentStatus::Verified {
                        StageOutcome::Ok
                    } else {
                        StageOutcome::Error
                    },
                    Some(name.clone()),
                    Some(status.as_str().to_string()),
                );
                snapshot.record_content_status(name.clone(), status)?;
                statuses.insert(name, status);
            }
        }
        Ok(statuses)
    }

    /// Looks up a tool, enforces the content-integrity policy, and invokes
    /// it on its named server.
    ///
    /// Tools with a declared digest are checked lazily on first execution.
    /// A failed check refuses execution unless `allow_unverified_content`
    /// is set.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::ToolNotFound`] on a lookup miss,
    /// [`DiscoveryError::ContentIntegrity`] when policy refuses execution,
    /// and [`DiscoveryError::RemoteCall`] with the server's error verbatim.
    pub async fn execute(&self, name: &str, arguments: Value) -> Result<Value, DiscoveryError> {
        let snapshot = self.snapshot().ok_or(DiscoveryError::NoSnapshot)?;
        let record = snapshot
            .index
            .find_by_name(name)
            .cloned()
            .ok_or_else(|| DiscoveryError::ToolNotFound {
                name: name.to_string(),
            })?;

        let mut status =
            snapshot.content_status(name).unwrap_or(ContentStatus::Unchecked);
        if status == ContentStatus::Unchecked && record.spec_hash.is_some() {
            status = self.check_content(&snapshot, &record).await?;
        }
        if status == ContentStatus::Failed && !self.config.allow_unverified_content {
            self.emit(
                DiscoveryStage::Execute,
                StageOutcome::Error,
                Some(record.name.clone()),
                Some("content integrity refused".to_string()),
            );
            return Err(DiscoveryError::ContentIntegrity {
                tool: name.to_string(),
            });
        }

        let Some(mcp) = record.execution() else {
            // Unreachable for validated documents; surfaced as the
            // validator's own error for uniformity.
            return Err(DiscoveryError::Validation(ValidationError::MissingExecutionConfig {
                tool: name.to_string(),
            }));
        };
        let mut client_config = McpClientConfig::new(&mcp.server_url);
        client_config.timeout = self.config.request_timeout();
        client_config.max_response_bytes = self.config.max_response_bytes;
        let mut client = McpClient::new(client_config)?;
        let result = client.call_tool(&record.name, arguments).await;
        self.emit(
            DiscoveryStage::Execute,
            if result.is_ok() { StageOutcome::Ok } else { StageOutcome::Error },
            Some(record.name.clone()),
            result.as_ref().err().map(ToString::to_string),
        );
        Ok(result?)
    }

    /// Fetches one spec, compares digests, and records the status.
    async fn check_content(
        &self,
        snapshot: &CatalogSnapshot,
        record: &ToolRecord,
    ) -> Result<ContentStatus, DiscoveryError> {
        let Some(expected) = &record.spec_hash else {
            snapshot.record_content_status(record.name.clone(), ContentStatus::Undeclared)?;
            return Ok(ContentStatus::Undeclared);
        };
        let fetched = self.spec_fetcher.fetch(&record.spec_url, CachePolicy::Reuse).await?;
        let status = if expected.matches(&fetched.bytes) {
            ContentStatus::Verified
        } else {
            ContentStatus::Failed
        };
        self.emit(
            DiscoveryStage::ContentCheck,
            if status == ContentStatus::Verified { StageOutcome::Ok } else { StageOutcome::Error },
            Some(record.name.clone()),
            Some(status.as_str().to_string()),
        );
        snapshot.record_content_status(record.name.clone(), status)?;
        Ok(status)
    }

    /// Emits one stage event to the observer.
    fn emit(
        &self,
        stage: DiscoveryStage,
        outcome: StageOutcome,
        tool: Option<ToolName>,
        detail: Option<String>,
    ) {
        self.observer.on_event(&DiscoveryEvent {
            stage,
            outcome,
            tool,
            detail,
            elapsed: None,
        });
    }
}
