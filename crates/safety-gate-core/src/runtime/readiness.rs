// crates/safety-gate-core/src/runtime/readiness.rs
// ============================================================================
// Module: Readiness Evaluator
// Description: Go-live evaluation over external checks with approvals and overrides.
// Purpose: Produce cached, idempotent CAN_GO_LIVE/WARN/BLOCK decisions that fail closed.
// Dependencies: crate::{core, interfaces, runtime}, serde, serde_json
// ============================================================================

//! ## Overview
//! The evaluator runs every registered [`ReadinessCheck`], aggregates the
//! results, and signs the snapshot with a truncated SHA-256 over canonical
//! JSON of the sorted `(id, status, severity)` tuples, the emergency flag, and
//! the config version. Messages and durations are excluded so repeated evaluations
//! of an unchanged system hash identically.
//!
//! Aggregation is written so that only a fully successful path yields
//! `CAN_GO_LIVE`: a check that errors, panics, or overruns its timeout is a
//! failure, and an aggregation error resolves to `BLOCK`.
//!
//! Approvals are time-boxed sign-offs consulted by enforcement for `WARN`
//! decisions; they never change the computed decision. Overrides pin the
//! returned decision until cleared and are always audited.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::history::BoundedLog;
use crate::core::identifiers::ApprovalId;
use crate::core::identifiers::CheckId;
use crate::core::identifiers::IdentifierError;
use crate::core::identifiers::OverrideId;
use crate::interfaces::AuditSink;
use crate::interfaces::CheckSeverity;
use crate::interfaces::CheckStatus;
use crate::interfaces::Clock;
use crate::interfaces::ReadinessCheck;
use crate::interfaces::SafetyAuditEvent;
use crate::runtime::emergency::EmergencyStop;

/// Audit component label.
const COMPONENT: &str = "readiness";
/// Hex characters kept from the signature digest.
const SIGNATURE_HEX_CHARS: usize = 16;
/// Generic reason for internal evaluation failures.
const EVALUATION_FAILED: &str = "readiness evaluation failed";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Readiness evaluator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadinessConfig {
    /// Version folded into every signature.
    pub config_version: String,
    /// Age at which a cached decision is recomputed.
    pub cache_ttl_ms: u64,
    /// Lifetime of an approval.
    pub approval_ttl_ms: u64,
    /// Soft blockers tolerated before the decision becomes `WARN`.
    pub max_soft_blockers: usize,
    /// Per-check time budget; slower checks fail.
    pub check_timeout_ms: u64,
    /// Maximum retained overrides.
    pub override_history_capacity: usize,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            config_version: "1".to_string(),
            cache_ttl_ms: 30_000,
            approval_ttl_ms: 3_600_000,
            max_soft_blockers: 0,
            check_timeout_ms: 5_000,
            override_history_capacity: 100,
        }
    }
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Aggregate readiness decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadinessDecisionKind {
    /// Safe to go live.
    CanGoLive,
    /// Go-live requires an active approval.
    Warn,
    /// Go-live is blocked.
    Block,
}

impl ReadinessDecisionKind {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CanGoLive => "CAN_GO_LIVE",
            Self::Warn => "WARN",
            Self::Block => "BLOCK",
        }
    }
}

impl fmt::Display for ReadinessDecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadinessDecisionKind {
    type Err = IdentifierError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "CAN_GO_LIVE" => Ok(Self::CanGoLive),
            "WARN" => Ok(Self::Warn),
            "BLOCK" => Ok(Self::Block),
            _ => Err(IdentifierError::unknown("readiness decision", value)),
        }
    }
}

/// Evaluation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EvaluationMode {
    /// Enforced evaluation.
    #[serde(rename = "live")]
    Live,
    /// Pre-flight evaluation, independent of the readiness flag.
    #[serde(rename = "dry-run")]
    DryRun,
}

impl EvaluationMode {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::DryRun => "dry-run",
        }
    }
}

impl FromStr for EvaluationMode {
    type Err = IdentifierError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "live" => Ok(Self::Live),
            "dry-run" => Ok(Self::DryRun),
            _ => Err(IdentifierError::unknown("evaluation mode", value)),
        }
    }
}

/// Result of one check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Check identifier.
    pub id: CheckId,
    /// Check name.
    pub name: String,
    /// Resolved status.
    pub status: CheckStatus,
    /// Severity applied to failures.
    pub severity: CheckSeverity,
    /// Operator-facing message.
    pub message: String,
    /// Wall time spent in the check.
    pub duration_ms: u64,
}

/// A check (or control) standing in the way of go-live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blocker {
    /// Blocking check identifier.
    pub check_id: CheckId,
    /// Blocking check name.
    pub name: String,
    /// Blocking message.
    pub message: String,
}

impl Blocker {
    /// Builds a blocker from a check result.
    fn from_result(result: &CheckResult) -> Self {
        Self {
            check_id: result.id.clone(),
            name: result.name.clone(),
            message: result.message.clone(),
        }
    }
}

/// Signature identifying the evaluated snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionSignature {
    /// Truncated SHA-256 hex digest.
    pub hash: String,
    /// Config version folded into the hash.
    pub version: String,
}

/// Readiness evaluation output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessDecision {
    /// Decision after any override.
    pub decision: ReadinessDecisionKind,
    /// Evaluation mode.
    pub mode: EvaluationMode,
    /// Health score in `0..=100`.
    pub score: u8,
    /// Blockers forcing `BLOCK`.
    pub hard_blockers: Vec<Blocker>,
    /// Warnings and soft failures.
    pub soft_blockers: Vec<Blocker>,
    /// Individual check results.
    pub checks: Vec<CheckResult>,
    /// Snapshot signature.
    pub signature: DecisionSignature,
    /// Evaluation time (unix ms).
    pub evaluated_at_ms: u64,
    /// True when the readiness flag is off and no checks ran.
    pub bypassed: bool,
    /// Override pinning this decision, if any.
    pub override_applied: Option<OverrideId>,
    /// Operator-facing reason.
    pub reason: String,
}

/// Time-boxed human sign-off for `WARN` decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    /// Approval identifier.
    pub id: ApprovalId,
    /// Approving actor.
    pub approved_by: String,
    /// Free-form note.
    pub note: String,
    /// Creation time (unix ms).
    pub created_at_ms: u64,
    /// Expiry time (unix ms).
    pub expires_at_ms: u64,
}

impl Approval {
    /// Returns true once the approval has expired.
    #[must_use]
    pub const fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

/// Administrator-forced decision.
///
/// # Invariants
/// - `logged` is always true; overrides are only constructed by
///   [`ReadinessEvaluator::create_override`], which audits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessOverride {
    /// Override identifier.
    pub id: OverrideId,
    /// Overriding actor.
    pub overridden_by: String,
    /// Forced decision.
    pub new_decision: ReadinessDecisionKind,
    /// Justification.
    pub reason: String,
    /// Creation time (unix ms).
    pub created_at_ms: u64,
    /// Always true.
    pub logged: bool,
}

/// Readiness evaluator errors.
#[derive(Debug, Error)]
pub enum ReadinessError {
    /// Approval or override input was rejected.
    #[error("invalid readiness input: {0}")]
    InvalidInput(String),
    /// Signature hashing failed.
    #[error("readiness hashing failed: {0}")]
    Hashing(#[from] HashError),
    /// Evaluator state could not be read.
    #[error("readiness evaluator unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// SECTION: Evaluator
// ============================================================================

/// Cached computed decision.
struct CacheEntry {
    /// Decision without override applied.
    decision: ReadinessDecision,
    /// Last time the entry was computed or confirmed (unix ms).
    refreshed_at_ms: u64,
}

/// Lock-protected evaluator state.
struct EvaluatorInner {
    /// Registered checks keyed by id.
    checks: BTreeMap<CheckId, Arc<dyn ReadinessCheck>>,
    /// Cached decisions per mode.
    cache: BTreeMap<EvaluationMode, CacheEntry>,
    /// Active approval.
    approval: Option<Approval>,
    /// Active override.
    active_override: Option<ReadinessOverride>,
    /// Bounded override history.
    override_history: BoundedLog<ReadinessOverride>,
    /// Identifier sequence.
    sequence: u64,
}

impl EvaluatorInner {
    /// Returns the next identifier sequence number.
    const fn next_sequence(&mut self) -> u64 {
        self.sequence = self.sequence.wrapping_add(1);
        self.sequence
    }
}

/// Canonical signature input.
#[derive(Serialize)]
struct SignatureInput<'a> {
    /// Config version.
    version: &'a str,
    /// Emergency stop flag.
    emergency_stop: bool,
    /// Sorted check tuples.
    checks: Vec<(&'a str, CheckStatus, CheckSeverity)>,
}

/// Go-live readiness evaluator.
pub struct ReadinessEvaluator {
    /// Live evaluation flag; off means live evaluation is bypassed.
    enabled: bool,
    /// Evaluator configuration.
    config: ReadinessConfig,
    /// Evaluator state.
    inner: Mutex<EvaluatorInner>,
    /// Shared emergency stop.
    emergency: Arc<EmergencyStop>,
    /// Injected clock.
    clock: Arc<dyn Clock>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
}

impl ReadinessEvaluator {
    /// Creates an evaluator with no registered checks.
    #[must_use]
    pub fn new(
        config: ReadinessConfig,
        enabled: bool,
        emergency: Arc<EmergencyStop>,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let inner = EvaluatorInner {
            checks: BTreeMap::new(),
            cache: BTreeMap::new(),
            approval: None,
            active_override: None,
            override_history: BoundedLog::new(config.override_history_capacity),
            sequence: 0,
        };
        Self {
            enabled,
            config,
            inner: Mutex::new(inner),
            emergency,
            clock,
            audit,
        }
    }

    /// Returns whether live evaluation is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Registers a check, replacing any check with the same id, and clears the cache.
    pub fn register_check(&self, check: Arc<dyn ReadinessCheck>) {
        if let Some(mut inner) = self.lock() {
            inner.checks.insert(check.id(), check);
            inner.cache.clear();
        }
    }

    /// Removes a check and clears the cache. Returns false when unknown.
    pub fn unregister_check(&self, id: &CheckId) -> bool {
        self.lock().is_some_and(|mut inner| {
            let removed = inner.checks.remove(id).is_some();
            if removed {
                inner.cache.clear();
            }
            removed
        })
    }

    /// Evaluates readiness in `mode`, reusing the cache when possible.
    ///
    /// Live evaluation with the readiness flag off returns a bypass
    /// `CAN_GO_LIVE` without running checks. An active override still applies.
    #[must_use]
    pub fn evaluate_cutover(&self, mode: EvaluationMode) -> ReadinessDecision {
        let now_ms = self.clock.now_ms();
        let Some(inner) = self.lock() else {
            return fail_closed(mode, &self.config.config_version, now_ms);
        };
        if mode == EvaluationMode::Live && !self.enabled {
            return apply_override(self.bypass_decision(now_ms), inner.active_override.as_ref());
        }
        if let Some(entry) = inner.cache.get(&mode)
            && now_ms.saturating_sub(entry.refreshed_at_ms) < self.config.cache_ttl_ms
        {
            let cached = entry.decision.clone();
            return apply_override(cached, inner.active_override.as_ref());
        }
        let checks: Vec<Arc<dyn ReadinessCheck>> = inner.checks.values().cloned().collect();
        drop(inner);

        let results: Vec<CheckResult> =
            checks.iter().map(|check| run_check(check.as_ref(), self.config.check_timeout_ms)).collect();
        let emergency_stop = self.emergency.is_active();
        let computed = match aggregate(&self.config, mode, results, emergency_stop, now_ms) {
            Ok(decision) => decision,
            Err(_) => return fail_closed(mode, &self.config.config_version, now_ms),
        };

        let Some(mut inner) = self.lock() else {
            return fail_closed(mode, &self.config.config_version, now_ms);
        };
        let unchanged = inner
            .cache
            .get_mut(&mode)
            .filter(|entry| entry.decision.signature == computed.signature);
        let decision = if let Some(entry) = unchanged {
            entry.refreshed_at_ms = now_ms;
            entry.decision.clone()
        } else {
            let entry = CacheEntry {
                decision: computed.clone(),
                refreshed_at_ms: now_ms,
            };
            inner.cache.insert(mode, entry);
            computed
        };
        let active_override = inner.active_override.clone();
        drop(inner);
        apply_override(decision, active_override.as_ref())
    }

    /// Evaluates readiness in dry-run mode regardless of the readiness flag.
    #[must_use]
    pub fn dry_run(&self) -> ReadinessDecision {
        self.evaluate_cutover(EvaluationMode::DryRun)
    }

    /// Drops every cached decision.
    pub fn clear_cache(&self) {
        if let Some(mut inner) = self.lock() {
            inner.cache.clear();
        }
    }

    /// Issues a time-boxed approval, replacing any active one.
    ///
    /// # Errors
    ///
    /// Returns [`ReadinessError::InvalidInput`] when `approved_by` is empty and
    /// [`ReadinessError::Unavailable`] when evaluator state is poisoned.
    pub fn create_approval(&self, approved_by: &str, note: &str) -> Result<Approval, ReadinessError> {
        if approved_by.trim().is_empty() {
            return Err(ReadinessError::InvalidInput("approved_by must be non-empty".to_string()));
        }
        let now_ms = self.clock.now_ms();
        let mut inner = self.lock_or_unavailable()?;
        let sequence = inner.next_sequence();
        let approval = Approval {
            id: ApprovalId::new(format!("approval-{now_ms}-{sequence}")),
            approved_by: approved_by.to_string(),
            note: note.to_string(),
            created_at_ms: now_ms,
            expires_at_ms: now_ms.saturating_add(self.config.approval_ttl_ms),
        };
        inner.approval = Some(approval.clone());
        drop(inner);
        self.audit.record(
            &SafetyAuditEvent::new(COMPONENT, "approval_created", approval.id.as_str(), note, now_ms)
                .with_actor(Some(approved_by))
                .with_details(json!({ "expires_at_ms": approval.expires_at_ms })),
        );
        Ok(approval)
    }

    /// Returns the unexpired approval, discarding an expired one.
    #[must_use]
    pub fn get_active_approval(&self) -> Option<Approval> {
        let now_ms = self.clock.now_ms();
        let mut inner = self.lock()?;
        let expired = inner.approval.as_ref().is_some_and(|approval| approval.is_expired(now_ms));
        if expired {
            let approval = inner.approval.take();
            drop(inner);
            if let Some(approval) = approval {
                self.audit.record(
                    &SafetyAuditEvent::new(
                        COMPONENT,
                        "approval_expired",
                        approval.id.as_str(),
                        "approval expired",
                        now_ms,
                    )
                    .with_actor(Some(&approval.approved_by)),
                );
            }
            return None;
        }
        inner.approval.clone()
    }

    /// Revokes the active approval. Returns false when none was active.
    pub fn revoke_approval(&self) -> bool {
        let now_ms = self.clock.now_ms();
        let Some(approval) = self.lock().and_then(|mut inner| inner.approval.take()) else {
            return false;
        };
        self.audit.record(
            &SafetyAuditEvent::new(
                COMPONENT,
                "approval_revoked",
                approval.id.as_str(),
                "approval revoked",
                now_ms,
            )
            .with_actor(Some(&approval.approved_by)),
        );
        true
    }

    /// Pins the returned decision to `new_decision` until cleared. Always audited.
    ///
    /// # Errors
    ///
    /// Returns [`ReadinessError::InvalidInput`] when the actor or reason is
    /// empty and [`ReadinessError::Unavailable`] when evaluator state is poisoned.
    pub fn create_override(
        &self,
        overridden_by: &str,
        new_decision: ReadinessDecisionKind,
        reason: &str,
    ) -> Result<ReadinessOverride, ReadinessError> {
        if overridden_by.trim().is_empty() {
            return Err(ReadinessError::InvalidInput("overridden_by must be non-empty".to_string()));
        }
        if reason.trim().is_empty() {
            return Err(ReadinessError::InvalidInput("override reason must be non-empty".to_string()));
        }
        let now_ms = self.clock.now_ms();
        let mut inner = self.lock_or_unavailable()?;
        let sequence = inner.next_sequence();
        let record = ReadinessOverride {
            id: OverrideId::new(format!("override-{now_ms}-{sequence}")),
            overridden_by: overridden_by.to_string(),
            new_decision,
            reason: reason.to_string(),
            created_at_ms: now_ms,
            logged: true,
        };
        inner.active_override = Some(record.clone());
        inner.override_history.push(record.clone());
        drop(inner);
        self.audit.record(
            &SafetyAuditEvent::new(COMPONENT, "override_created", record.id.as_str(), reason, now_ms)
                .with_actor(Some(overridden_by))
                .with_details(json!({ "new_decision": new_decision })),
        );
        Ok(record)
    }

    /// Clears the active override. Returns false when none was active.
    pub fn clear_override(&self) -> bool {
        let now_ms = self.clock.now_ms();
        let Some(record) = self.lock().and_then(|mut inner| inner.active_override.take()) else {
            return false;
        };
        self.audit.record(
            &SafetyAuditEvent::new(
                COMPONENT,
                "override_cleared",
                record.id.as_str(),
                "override cleared",
                now_ms,
            )
            .with_actor(Some(&record.overridden_by)),
        );
        true
    }

    /// Returns the active override.
    #[must_use]
    pub fn get_active_override(&self) -> Option<ReadinessOverride> {
        self.lock()?.active_override.clone()
    }

    /// Returns up to `limit` overrides, newest first.
    #[must_use]
    pub fn get_override_history(&self, limit: usize) -> Vec<ReadinessOverride> {
        self.lock().map(|inner| inner.override_history.recent(limit)).unwrap_or_default()
    }

    /// Builds the bypass decision used when live evaluation is disabled.
    fn bypass_decision(&self, now_ms: u64) -> ReadinessDecision {
        ReadinessDecision {
            decision: ReadinessDecisionKind::CanGoLive,
            mode: EvaluationMode::Live,
            score: 100,
            hard_blockers: Vec::new(),
            soft_blockers: Vec::new(),
            checks: Vec::new(),
            signature: DecisionSignature {
                hash: "bypassed".to_string(),
                version: self.config.config_version.clone(),
            },
            evaluated_at_ms: now_ms,
            bypassed: true,
            override_applied: None,
            reason: "readiness checks disabled".to_string(),
        }
    }

    /// Locks evaluator state; `None` when poisoned.
    fn lock(&self) -> Option<MutexGuard<'_, EvaluatorInner>> {
        self.inner.lock().ok()
    }

    /// Locks evaluator state, mapping poison to an error.
    fn lock_or_unavailable(&self) -> Result<MutexGuard<'_, EvaluatorInner>, ReadinessError> {
        self.inner
            .lock()
            .map_err(|_| ReadinessError::Unavailable("evaluator mutex poisoned".to_string()))
    }
}

// ============================================================================
// SECTION: Check Execution
// ============================================================================

/// Runs one check, converting errors, panics, and overruns into failures.
fn run_check(check: &dyn ReadinessCheck, timeout_ms: u64) -> CheckResult {
    let started = Instant::now();
    let outcome = catch_unwind(AssertUnwindSafe(|| check.run()));
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let (mut status, mut message) = match outcome {
        Ok(Ok(outcome)) => (outcome.status, outcome.message),
        Ok(Err(err)) => (CheckStatus::Fail, err.to_string()),
        Err(_) => (CheckStatus::Fail, "check panicked".to_string()),
    };
    if duration_ms > timeout_ms {
        status = CheckStatus::Fail;
        message = format!("exceeded timeout of {timeout_ms} ms");
    }
    CheckResult {
        id: check.id(),
        name: check.name(),
        status,
        severity: check.severity(),
        message,
        duration_ms,
    }
}

// ============================================================================
// SECTION: Aggregation
// ============================================================================

/// Aggregates check results into a signed decision.
fn aggregate(
    config: &ReadinessConfig,
    mode: EvaluationMode,
    mut results: Vec<CheckResult>,
    emergency_stop: bool,
    now_ms: u64,
) -> Result<ReadinessDecision, ReadinessError> {
    results.sort_by(|a, b| a.id.cmp(&b.id));
    let signature = signature_for(config, &results, emergency_stop)?;

    let mut hard_blockers: Vec<Blocker> = results
        .iter()
        .filter(|result| result.status == CheckStatus::Fail && result.severity == CheckSeverity::Hard)
        .map(Blocker::from_result)
        .collect();
    if emergency_stop {
        hard_blockers.push(Blocker {
            check_id: CheckId::new("emergency_stop"),
            name: "Emergency stop".to_string(),
            message: "Emergency stop is active".to_string(),
        });
    }
    let soft_blockers: Vec<Blocker> = results
        .iter()
        .filter(|result| {
            result.status == CheckStatus::Warn
                || (result.status == CheckStatus::Fail && result.severity == CheckSeverity::Soft)
        })
        .map(Blocker::from_result)
        .collect();

    let score = score_for(&results);
    let (decision, reason) = if !hard_blockers.is_empty() {
        let names: Vec<&str> = hard_blockers.iter().map(|blocker| blocker.name.as_str()).collect();
        (ReadinessDecisionKind::Block, format!("Readiness BLOCK: {}", names.join(", ")))
    } else if soft_blockers.len() > config.max_soft_blockers {
        (
            ReadinessDecisionKind::Warn,
            format!("Readiness WARN: {} soft blockers", soft_blockers.len()),
        )
    } else {
        (ReadinessDecisionKind::CanGoLive, "all readiness checks passed".to_string())
    };

    Ok(ReadinessDecision {
        decision,
        mode,
        score,
        hard_blockers,
        soft_blockers,
        checks: results,
        signature,
        evaluated_at_ms: now_ms,
        bypassed: false,
        override_applied: None,
        reason,
    })
}

/// Computes the snapshot signature over sorted results.
fn signature_for(
    config: &ReadinessConfig,
    sorted_results: &[CheckResult],
    emergency_stop: bool,
) -> Result<DecisionSignature, HashError> {
    let input = SignatureInput {
        version: &config.config_version,
        emergency_stop,
        checks: sorted_results
            .iter()
            .map(|result| (result.id.as_str(), result.status, result.severity))
            .collect(),
    };
    let digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &input)?;
    Ok(DecisionSignature {
        hash: digest.truncated(SIGNATURE_HEX_CHARS),
        version: config.config_version.clone(),
    })
}

/// Scores results as `round(100 * (pass + warn / 2) / considered)`, skipping `skip`.
fn score_for(results: &[CheckResult]) -> u8 {
    let considered = results.iter().filter(|result| result.status != CheckStatus::Skip).count();
    if considered == 0 {
        return 100;
    }
    let half_points: usize = results
        .iter()
        .map(|result| match result.status {
            CheckStatus::Pass => 2,
            CheckStatus::Warn => 1,
            CheckStatus::Fail | CheckStatus::Skip => 0,
        })
        .sum();
    let score = (half_points * 100 + considered) / (2 * considered);
    u8::try_from(score).unwrap_or(100)
}

/// Applies an active override to a computed decision.
fn apply_override(
    mut decision: ReadinessDecision,
    active_override: Option<&ReadinessOverride>,
) -> ReadinessDecision {
    if let Some(record) = active_override {
        decision.decision = record.new_decision;
        decision.override_applied = Some(record.id.clone());
        decision.reason = format!(
            "override by {} ({}): {}",
            record.overridden_by, record.new_decision, record.reason
        );
    }
    decision
}

/// Builds the generic `BLOCK` decision used on internal failure.
fn fail_closed(mode: EvaluationMode, version: &str, now_ms: u64) -> ReadinessDecision {
    ReadinessDecision {
        decision: ReadinessDecisionKind::Block,
        mode,
        score: 0,
        hard_blockers: vec![Blocker {
            check_id: CheckId::new("evaluation_error"),
            name: "Evaluation error".to_string(),
            message: EVALUATION_FAILED.to_string(),
        }],
        soft_blockers: Vec::new(),
        checks: Vec::new(),
        signature: DecisionSignature {
            hash: "unavailable".to_string(),
            version: version.to_string(),
        },
        evaluated_at_ms: now_ms,
        bypassed: false,
        override_applied: None,
        reason: EVALUATION_FAILED.to_string(),
    }
}
