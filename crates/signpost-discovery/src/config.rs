// crates/signpost-discovery/src/config.rs
// ============================================================================
// Module: Discovery Configuration
// Description: Configuration model and validation for the discovery pipeline.
// Purpose: Provide explicit, validated knobs for policies, TTLs, and limits.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! [`DiscoveryConfig`] carries every policy knob the orchestrator honors:
//! the signature policy, content-integrity policy, cache TTLs, timeouts,
//! and fan-out limits. Values deserialize from TOML with defaults and are
//! range-checked before use; an invalid configuration never reaches the
//! network.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
///
/// # Invariants
/// - Variants are stable for caller branching and tests.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML source did not parse.
    #[error("config parse error: {0}")]
    Parse(String),
    /// A field value is out of range or malformed.
    #[error("invalid config field {field}: {reason}")]
    Invalid {
        /// Offending field name.
        field: &'static str,
        /// Validation failure detail.
        reason: String,
    },
}

// ============================================================================
// SECTION: Signature Policy
// ============================================================================

/// Policy applied to the catalog's detached signature token.
///
/// # Invariants
/// - Variants are stable for configuration parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignaturePolicy {
    /// A valid token is mandatory; an unsigned catalog is rejected.
    #[default]
    Required,
    /// A token is verified when present; absence is recorded, not rejected.
    IfPresent,
    /// Tokens are ignored even when present.
    Disabled,
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Discovery pipeline configuration.
///
/// # Invariants
/// - Passed validation via [`DiscoveryConfig::validate`] before any
///   component is constructed from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Catalog discovery endpoint URL.
    pub catalog_url: String,
    /// Signature token policy.
    #[serde(default)]
    pub signature_policy: SignaturePolicy,
    /// Whether tools with failed or unchecked content integrity may execute.
    #[serde(default)]
    pub allow_unverified_content: bool,
    /// Tolerated clock skew for token windows, in seconds.
    #[serde(default = "default_clock_skew_secs")]
    pub clock_skew_secs: u64,
    /// Catalog cache TTL, in seconds.
    #[serde(default = "default_catalog_ttl_secs")]
    pub catalog_ttl_secs: u64,
    /// Key cache TTL, in seconds (keys rotate less often than catalogs).
    #[serde(default = "default_key_ttl_secs")]
    pub key_ttl_secs: u64,
    /// Referenced-spec cache TTL, in seconds.
    #[serde(default = "default_spec_ttl_secs")]
    pub spec_ttl_secs: u64,
    /// Per-request timeout, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Hard response body cap, in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Bound on concurrent referenced-spec integrity checks.
    #[serde(default = "default_max_concurrent_spec_checks")]
    pub max_concurrent_spec_checks: usize,
}

/// Default clock skew (seconds).
const fn default_clock_skew_secs() -> u64 {
    60
}

/// Default catalog TTL (seconds).
const fn default_catalog_ttl_secs() -> u64 {
    300
}

/// Default key TTL (seconds).
const fn default_key_ttl_secs() -> u64 {
    3600
}

/// Default spec TTL (seconds).
const fn default_spec_ttl_secs() -> u64 {
    3600
}

/// Default request timeout (milliseconds).
const fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Default response body cap (bytes).
const fn default_max_response_bytes() -> usize {
    4 * 1024 * 1024
}

/// Default spec-check fan-out bound.
const fn default_max_concurrent_spec_checks() -> usize {
    4
}

impl DiscoveryConfig {
    /// Creates a configuration with defaults for the given catalog URL.
    #[must_use]
    pub fn new(catalog_url: impl Into<String>) -> Self {
        Self {
            catalog_url: catalog_url.into(),
            signature_policy: SignaturePolicy::default(),
            allow_unverified_content: false,
            clock_skew_secs: default_clock_skew_secs(),
            catalog_ttl_secs: default_catalog_ttl_secs(),
            key_ttl_secs: default_key_ttl_secs(),
            spec_ttl_secs: default_spec_ttl_secs(),
            request_timeout_ms: default_request_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
            max_concurrent_spec_checks: default_max_concurrent_spec_checks(),
        }
    }

    /// Loads and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(source).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates field ranges and the catalog URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if Url::parse(&self.catalog_url).is_err() {
            return Err(ConfigError::Invalid {
                field: "catalog_url",
                reason: format!("not a valid url: {}", self.catalog_url),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_response_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_response_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_concurrent_spec_checks == 0 {
            return Err(ConfigError::Invalid {
                field: "max_concurrent_spec_checks",
                reason: "must be at least one".to_string(),
            });
        }
        Ok(())
    }

    /// Request timeout as a duration.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Catalog TTL as a duration.
    #[must_use]
    pub const fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl_secs)
    }

    /// Key TTL as a duration.
    #[must_use]
    pub const fn key_ttl(&self) -> Duration {
        Duration::from_secs(self.key_ttl_secs)
    }

    /// Spec TTL as a duration.
    #[must_use]
    pub const fn spec_ttl(&self) -> Duration {
        Duration::from_secs(self.spec_ttl_secs)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
