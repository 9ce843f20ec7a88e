// crates/safety-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Safety Gate Interfaces
// Description: Collaborator contracts for time, audit logging, and health checks.
// Purpose: Define the seams external modules plug into the control plane through.
// Dependencies: crate::core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Safety Gate consumes pre-computed values from collaborators rather than
//! polling anything itself. Health checks implement [`ReadinessCheck`], the
//! wall clock is injected through [`Clock`], and every decision is emitted to
//! an [`AuditSink`]. Implementations must be fast and self-timeboxing; a
//! check that cannot answer must return an error, which the evaluator treats
//! as a failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::CheckId;
use crate::core::identifiers::IdentifierError;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of wall-clock time in unix milliseconds.
pub trait Clock: Send + Sync {
    /// Returns the current time in milliseconds since the unix epoch.
    fn now_ms(&self) -> u64;
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// Structured audit event emitted by every Safety Gate component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetyAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u64,
    /// Emitting component label.
    pub component: &'static str,
    /// Action label within the component.
    pub action: String,
    /// Subject of the action (subsystem, feature, provider, hook).
    pub subject: String,
    /// Acting principal when known.
    pub actor: Option<String>,
    /// Allow/deny outcome for decision events.
    pub allowed: Option<bool>,
    /// Human-readable reason.
    pub reason: String,
    /// Component-specific structured details.
    pub details: Value,
}

impl SafetyAuditEvent {
    /// Creates an audit event with empty details and no actor.
    #[must_use]
    pub fn new(
        component: &'static str,
        action: impl Into<String>,
        subject: impl Into<String>,
        reason: impl Into<String>,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            event: "safety_audit",
            timestamp_ms,
            component,
            action: action.into(),
            subject: subject.into(),
            actor: None,
            allowed: None,
            reason: reason.into(),
            details: Value::Null,
        }
    }

    /// Attaches an actor.
    #[must_use]
    pub fn with_actor(mut self, actor: Option<&str>) -> Self {
        self.actor = actor.map(str::to_string);
        self
    }

    /// Attaches an allow/deny outcome.
    #[must_use]
    pub const fn with_allowed(mut self, allowed: bool) -> Self {
        self.allowed = Some(allowed);
        self
    }

    /// Attaches structured details.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

/// Audit sink for Safety Gate events.
pub trait AuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &SafetyAuditEvent);
}

// ============================================================================
// SECTION: Readiness Checks
// ============================================================================

/// Outcome status of a readiness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// Check passed.
    Pass,
    /// Check passed with a warning.
    Warn,
    /// Check failed.
    Fail,
    /// Check did not apply.
    Skip,
}

impl CheckStatus {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Warn => "warn",
            Self::Fail => "fail",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckStatus {
    type Err = IdentifierError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pass" => Ok(Self::Pass),
            "warn" => Ok(Self::Warn),
            "fail" => Ok(Self::Fail),
            "skip" => Ok(Self::Skip),
            _ => Err(IdentifierError::unknown("check status", value)),
        }
    }
}

/// Whether a failing check blocks go-live outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckSeverity {
    /// A failure forces `BLOCK`.
    Hard,
    /// A failure counts toward the warning budget.
    Soft,
}

impl CheckSeverity {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Soft => "soft",
        }
    }
}

impl fmt::Display for CheckSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckSeverity {
    type Err = IdentifierError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hard" => Ok(Self::Hard),
            "soft" => Ok(Self::Soft),
            _ => Err(IdentifierError::unknown("check severity", value)),
        }
    }
}

/// Result reported by a readiness check implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Check status.
    pub status: CheckStatus,
    /// Operator-facing message.
    pub message: String,
}

impl CheckOutcome {
    /// Builds a passing outcome.
    #[must_use]
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Pass,
            message: message.into(),
        }
    }

    /// Builds a warning outcome.
    #[must_use]
    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Warn,
            message: message.into(),
        }
    }

    /// Builds a failing outcome.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Fail,
            message: message.into(),
        }
    }

    /// Builds a skipped outcome.
    #[must_use]
    pub fn skip(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Skip,
            message: message.into(),
        }
    }
}

/// Errors a readiness check may report.
#[derive(Debug, Error)]
pub enum CheckError {
    /// The check could not reach its target.
    #[error("check unavailable: {0}")]
    Unavailable(String),
    /// The check gave up on its own timeout.
    #[error("check timed out after {0} ms")]
    TimedOut(u64),
}

/// Externally implemented readiness check (database, queue depth, search index).
pub trait ReadinessCheck: Send + Sync {
    /// Stable check identifier.
    fn id(&self) -> CheckId;

    /// Human-readable check name.
    fn name(&self) -> String;

    /// Severity applied when the check fails.
    fn severity(&self) -> CheckSeverity {
        CheckSeverity::Hard
    }

    /// Runs the check.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError`] when the check cannot produce an outcome.
    fn run(&self) -> Result<CheckOutcome, CheckError>;
}
