// crates/safety-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Safety Gate Identifiers
// Description: Closed identifier sets and opaque identifiers for Safety Gate.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Subsystems and cost-guarded features are closed sets: an unknown name is a
//! programmer error and is rejected with [`IdentifierError`] instead of being
//! coerced. Providers, checks, approvals, and overrides use opaque string
//! identifiers because they are configured or generated at runtime.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when parsing closed identifier sets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// The value is not a member of the closed set.
    #[error("unknown {kind}: {value}")]
    Unknown {
        /// Identifier kind label.
        kind: &'static str,
        /// Rejected input value.
        value: String,
    },
}

impl IdentifierError {
    /// Builds an unknown-value error for the given identifier kind.
    #[must_use]
    pub fn unknown(kind: &'static str, value: &str) -> Self {
        Self::Unknown {
            kind,
            value: value.to_string(),
        }
    }
}

/// Normalizes a textual identifier into its canonical `snake_case` form.
fn normalize(value: &str) -> String {
    value.trim().to_ascii_lowercase().replace('-', "_")
}

// ============================================================================
// SECTION: Subsystems
// ============================================================================

/// Platform subsystem guarded by a kill switch.
///
/// # Invariants
/// - Variants are stable; their `snake_case` names form the `KILL_<NAME>` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    /// Search answer generation.
    Search,
    /// Answer-engine optimization content.
    Aeo,
    /// Conversational assistant.
    Chat,
    /// Octopus multi-source ingestion pipeline.
    Octopus,
    /// Any AI provider call.
    AiGeneration,
    /// Content publishing.
    Publishing,
    /// Background job execution.
    Jobs,
    /// Content regeneration.
    Regeneration,
    /// Bulk content changes.
    BulkChanges,
    /// Feature rollout.
    Rollout,
}

impl Subsystem {
    /// Every subsystem in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Search,
        Self::Aeo,
        Self::Chat,
        Self::Octopus,
        Self::AiGeneration,
        Self::Publishing,
        Self::Jobs,
        Self::Regeneration,
        Self::BulkChanges,
        Self::Rollout,
    ];

    /// Returns the canonical `snake_case` name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Aeo => "aeo",
            Self::Chat => "chat",
            Self::Octopus => "octopus",
            Self::AiGeneration => "ai_generation",
            Self::Publishing => "publishing",
            Self::Jobs => "jobs",
            Self::Regeneration => "regeneration",
            Self::BulkChanges => "bulk_changes",
            Self::Rollout => "rollout",
        }
    }

    /// Returns the environment key that force-kills this subsystem.
    #[must_use]
    pub fn env_key(self) -> String {
        format!("KILL_{}", self.as_str().to_ascii_uppercase())
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subsystem {
    type Err = IdentifierError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(value);
        Self::ALL
            .into_iter()
            .find(|subsystem| subsystem.as_str() == normalized)
            .ok_or_else(|| IdentifierError::unknown("subsystem", value))
    }
}

// ============================================================================
// SECTION: Features
// ============================================================================

/// AI-backed feature tracked by the cost guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Search answers.
    Search,
    /// Answer-engine optimization.
    Aeo,
    /// Chat assistant.
    Chat,
    /// Octopus ingestion.
    Octopus,
    /// Long-form content generation.
    ContentGeneration,
    /// Machine translation.
    Translation,
}

impl Feature {
    /// Every feature in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Search,
        Self::Aeo,
        Self::Chat,
        Self::Octopus,
        Self::ContentGeneration,
        Self::Translation,
    ];

    /// Returns the canonical `snake_case` name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Aeo => "aeo",
            Self::Chat => "chat",
            Self::Octopus => "octopus",
            Self::ContentGeneration => "content_generation",
            Self::Translation => "translation",
        }
    }

    /// Returns the subsystem whose kill switch also gates this feature.
    #[must_use]
    pub const fn subsystem(self) -> Subsystem {
        match self {
            Self::Search => Subsystem::Search,
            Self::Aeo => Subsystem::Aeo,
            Self::Chat => Subsystem::Chat,
            Self::Octopus => Subsystem::Octopus,
            Self::ContentGeneration | Self::Translation => Subsystem::AiGeneration,
        }
    }

    /// Returns the default `(daily, monthly)` budget in USD.
    #[must_use]
    pub const fn default_limits_usd(self) -> (f64, f64) {
        match self {
            Self::Search => (50.0, 1_000.0),
            Self::Aeo => (10.0, 100.0),
            Self::Chat => (25.0, 500.0),
            Self::Octopus => (100.0, 2_000.0),
            Self::ContentGeneration => (50.0, 1_000.0),
            Self::Translation => (20.0, 400.0),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = IdentifierError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(value);
        Self::ALL
            .into_iter()
            .find(|feature| feature.as_str() == normalized)
            .ok_or_else(|| IdentifierError::unknown("feature", value))
    }
}

// ============================================================================
// SECTION: Opaque Identifiers
// ============================================================================

/// AI provider identifier (configured, not enumerated).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    /// Creates a new provider identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProviderId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Readiness check identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckId(String);

impl CheckId {
    /// Creates a new check identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for CheckId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of a time-boxed readiness approval.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalId(String);

impl ApprovalId {
    /// Creates a new approval identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of an administrator readiness override.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverrideId(String);

impl OverrideId {
    /// Creates a new override identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OverrideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
