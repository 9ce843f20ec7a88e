// crates/safety-gate-core/src/runtime/enforcement.rs
// ============================================================================
// Module: Enforcement Hooks
// Description: Allow/deny gates composed from the safety control components.
// Purpose: Give callers one fail-closed decision per sensitive operation.
// Dependencies: crate::{core, interfaces, runtime}, serde, serde_json
// ============================================================================

//! ## Overview
//! Each hook composes the control components in a fixed order:
//! 1. enforcement flag (off allows everything),
//! 2. emergency stop,
//! 3. kill switches for the operation's subsystem,
//! 4. cost guard (AI calls only),
//! 5. readiness with override and approval applied (publish, bulk change,
//!    rollout).
//!
//! The first gate that denies ends evaluation and its reason is returned
//! verbatim. Every decision is appended to a bounded log and audited.
//!
//! Security posture: enforcement is a control-plane guardrail and must fail
//! closed; poisoned component state resolves to a deny in the component itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

use crate::core::history::BoundedLog;
use crate::core::identifiers::Feature;
use crate::core::identifiers::ProviderId;
use crate::core::identifiers::Subsystem;
use crate::interfaces::AuditSink;
use crate::interfaces::Clock;
use crate::interfaces::SafetyAuditEvent;
use crate::runtime::cost_guard::CostGuardLedger;
use crate::runtime::emergency::EmergencyStop;
use crate::runtime::kill_switch::KillSwitchRegistry;
use crate::runtime::readiness::EvaluationMode;
use crate::runtime::readiness::ReadinessDecisionKind;
use crate::runtime::readiness::ReadinessEvaluator;

/// Audit component label.
const COMPONENT: &str = "enforcement";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Enforcement hook configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnforcementConfig {
    /// Maximum retained enforcement log entries.
    pub log_capacity: usize,
    /// Largest bulk change allowed while enforcement is enabled.
    pub max_bulk_change_items: u64,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            log_capacity: 1_000,
            max_bulk_change_items: 10_000,
        }
    }
}

// ============================================================================
// SECTION: Hook Contexts
// ============================================================================

/// Enforcement hook identifiers.
///
/// # Invariants
/// - Variants are stable for audit and stats labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementHook {
    /// Content publish.
    BeforePublish,
    /// Background job execution.
    BeforeJobExecution,
    /// Outbound AI provider call.
    BeforeAiCall,
    /// Content regeneration.
    BeforeRegeneration,
    /// Bulk content change.
    BeforeBulkChange,
    /// Feature rollout step.
    BeforeRollout,
}

impl EnforcementHook {
    /// Every hook in declaration order.
    pub const ALL: [Self; 6] = [
        Self::BeforePublish,
        Self::BeforeJobExecution,
        Self::BeforeAiCall,
        Self::BeforeRegeneration,
        Self::BeforeBulkChange,
        Self::BeforeRollout,
    ];

    /// Returns the canonical hook name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforePublish => "before_publish",
            Self::BeforeJobExecution => "before_job_execution",
            Self::BeforeAiCall => "before_ai_call",
            Self::BeforeRegeneration => "before_regeneration",
            Self::BeforeBulkChange => "before_bulk_change",
            Self::BeforeRollout => "before_rollout",
        }
    }
}

impl fmt::Display for EnforcementHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publish request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishContext {
    /// Content being published.
    pub content_id: String,
    /// Publishing actor when known.
    pub actor: Option<String>,
}

/// Job execution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobContext {
    /// Job type label.
    pub job_type: String,
}

/// AI provider call request.
///
/// # Invariants
/// - `estimated_cost_usd` is validated by the cost guard; invalid estimates deny.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiCallContext {
    /// Feature charged for the call.
    pub feature: Feature,
    /// Estimated call cost in USD.
    pub estimated_cost_usd: f64,
    /// Provider the caller intends to use.
    pub provider: Option<ProviderId>,
}

/// Content regeneration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerationContext {
    /// Content being regenerated.
    pub content_id: String,
}

/// Bulk change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkChangeContext {
    /// Number of items touched.
    pub item_count: u64,
    /// Operation label.
    pub operation: String,
}

/// Rollout step request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutContext {
    /// Feature being rolled out.
    pub feature_name: String,
    /// Target rollout percentage.
    pub percentage: u8,
}

// ============================================================================
// SECTION: Decisions and Log
// ============================================================================

/// Enforcement decision returned to callers.
///
/// # Invariants
/// - `allowed` is the authoritative decision for the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementDecision {
    /// Whether the operation may proceed.
    pub allowed: bool,
    /// Reason surfaced verbatim to operators.
    pub reason: String,
    /// Hook that produced the decision.
    pub hook: EnforcementHook,
    /// Readiness decision consulted, when the readiness gate ran.
    pub readiness: Option<ReadinessDecisionKind>,
}

/// Enforcement log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementLogEntry {
    /// Hook invoked.
    pub hook: EnforcementHook,
    /// Operation subject (content id, job type, feature, ...).
    pub subject: String,
    /// Acting principal when known.
    pub actor: Option<String>,
    /// Provider targeted by an AI call, when the caller named one.
    pub provider: Option<ProviderId>,
    /// Decision outcome.
    pub allowed: bool,
    /// Decision reason.
    pub reason: String,
    /// Readiness decision consulted, if any.
    pub readiness: Option<ReadinessDecisionKind>,
    /// Decision time (unix ms).
    pub timestamp_ms: u64,
}

/// Per-hook decision counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookCounts {
    /// Allowed decisions.
    pub allowed: u64,
    /// Blocked decisions.
    pub blocked: u64,
}

/// Aggregate enforcement statistics since startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnforcementStats {
    /// Whether enforcement is enabled.
    pub enabled: bool,
    /// Total decisions.
    pub total: u64,
    /// Allowed decisions.
    pub allowed: u64,
    /// Blocked decisions.
    pub blocked: u64,
    /// Counts per hook.
    pub by_hook: BTreeMap<EnforcementHook, HookCounts>,
    /// Fraction of decisions blocked (0 when none were made).
    pub block_rate: f64,
    /// Retained log entries.
    pub log_len: usize,
}

/// Outcome of the component gates after the global checks.
struct GateVerdict {
    /// Reason for the outcome.
    reason: String,
    /// Readiness decision consulted, if any.
    readiness: Option<ReadinessDecisionKind>,
}

impl GateVerdict {
    /// Builds a verdict without a readiness decision.
    fn plain(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            readiness: None,
        }
    }
}

/// What a hook decision concerns.
#[derive(Clone, Copy)]
struct Subject<'a> {
    /// Operation label (content id, job type, feature, ...).
    label: &'a str,
    /// Acting principal when known.
    actor: Option<&'a str>,
    /// Provider targeted by an AI call.
    provider: Option<&'a ProviderId>,
}

impl<'a> Subject<'a> {
    /// Builds a subject carrying only a label.
    const fn label(label: &'a str) -> Self {
        Self {
            label,
            actor: None,
            provider: None,
        }
    }
}

/// Gate result: `Ok` passes, `Err` blocks.
type GateResult = Result<GateVerdict, GateVerdict>;

/// Lock-protected log and counters.
struct HooksInner {
    /// Bounded decision log.
    log: BoundedLog<EnforcementLogEntry>,
    /// Counters per hook.
    counts: BTreeMap<EnforcementHook, HookCounts>,
}

// ============================================================================
// SECTION: Enforcement Hooks
// ============================================================================

/// Enforcement hooks over the shared control components.
pub struct EnforcementHooks {
    /// Enforcement flag; off allows every operation.
    enabled: bool,
    /// Hook configuration.
    config: EnforcementConfig,
    /// Shared emergency stop.
    emergency: Arc<EmergencyStop>,
    /// Shared kill switch registry.
    kill_switches: Arc<KillSwitchRegistry>,
    /// Shared cost guard ledger.
    cost_guard: Arc<CostGuardLedger>,
    /// Shared readiness evaluator.
    readiness: Arc<ReadinessEvaluator>,
    /// Decision log and counters.
    inner: Mutex<HooksInner>,
    /// Injected clock.
    clock: Arc<dyn Clock>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
}

impl EnforcementHooks {
    /// Creates hooks over the shared components.
    #[must_use]
    #[allow(clippy::too_many_arguments, reason = "Composition root wires each component explicitly.")]
    pub fn new(
        config: EnforcementConfig,
        enabled: bool,
        emergency: Arc<EmergencyStop>,
        kill_switches: Arc<KillSwitchRegistry>,
        cost_guard: Arc<CostGuardLedger>,
        readiness: Arc<ReadinessEvaluator>,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            enabled,
            config,
            emergency,
            kill_switches,
            cost_guard,
            readiness,
            inner: Mutex::new(HooksInner {
                log: BoundedLog::new(config.log_capacity),
                counts: BTreeMap::new(),
            }),
            clock,
            audit,
        }
    }

    /// Returns whether enforcement is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Gates a content publish.
    pub fn before_publish(&self, context: &PublishContext) -> EnforcementDecision {
        let subject = Subject {
            actor: context.actor.as_deref(),
            ..Subject::label(&context.content_id)
        };
        self.decide(EnforcementHook::BeforePublish, subject, || {
            self.kill_switch_gate(Subsystem::Publishing)?;
            self.readiness_gate()
        })
    }

    /// Gates a background job.
    pub fn before_job_execution(&self, context: &JobContext) -> EnforcementDecision {
        self.decide(EnforcementHook::BeforeJobExecution, Subject::label(&context.job_type), || {
            self.kill_switch_gate(Subsystem::Jobs)?;
            Ok(GateVerdict::plain("allowed"))
        })
    }

    /// Gates an AI provider call.
    pub fn before_ai_call(&self, context: &AiCallContext) -> EnforcementDecision {
        let subject = Subject {
            provider: context.provider.as_ref(),
            ..Subject::label(context.feature.as_str())
        };
        self.decide(EnforcementHook::BeforeAiCall, subject, || {
            self.kill_switch_gate(Subsystem::AiGeneration)?;
            let feature_subsystem = context.feature.subsystem();
            if feature_subsystem != Subsystem::AiGeneration {
                self.kill_switch_gate(feature_subsystem)?;
            }
            self.cost_gate(context.feature, context.estimated_cost_usd)
        })
    }

    /// Gates a content regeneration.
    pub fn before_regeneration(&self, context: &RegenerationContext) -> EnforcementDecision {
        self.decide(EnforcementHook::BeforeRegeneration, Subject::label(&context.content_id), || {
            self.kill_switch_gate(Subsystem::Regeneration)?;
            Ok(GateVerdict::plain("allowed"))
        })
    }

    /// Gates a bulk change.
    pub fn before_bulk_change(&self, context: &BulkChangeContext) -> EnforcementDecision {
        self.decide(EnforcementHook::BeforeBulkChange, Subject::label(&context.operation), || {
            self.kill_switch_gate(Subsystem::BulkChanges)?;
            if context.item_count > self.config.max_bulk_change_items {
                return Err(GateVerdict::plain(format!(
                    "Bulk change of {} items exceeds limit of {}",
                    context.item_count, self.config.max_bulk_change_items
                )));
            }
            self.readiness_gate()
        })
    }

    /// Gates a rollout step.
    pub fn before_rollout(&self, context: &RolloutContext) -> EnforcementDecision {
        self.decide(EnforcementHook::BeforeRollout, Subject::label(&context.feature_name), || {
            self.kill_switch_gate(Subsystem::Rollout)?;
            self.readiness_gate()
        })
    }

    /// Returns up to `limit` log entries, newest first.
    #[must_use]
    pub fn get_enforcement_log(&self, limit: usize) -> Vec<EnforcementLogEntry> {
        self.inner.lock().map(|inner| inner.log.recent(limit)).unwrap_or_default()
    }

    /// Returns aggregate statistics since startup.
    #[must_use]
    pub fn get_enforcement_stats(&self) -> EnforcementStats {
        let (by_hook, log_len) = self
            .inner
            .lock()
            .map(|inner| (inner.counts.clone(), inner.log.len()))
            .unwrap_or_default();
        let allowed: u64 = by_hook.values().map(|counts| counts.allowed).sum();
        let blocked: u64 = by_hook.values().map(|counts| counts.blocked).sum();
        let total = allowed + blocked;
        #[allow(clippy::cast_precision_loss, reason = "Counters stay far below 2^52.")]
        let block_rate = if total == 0 { 0.0 } else { blocked as f64 / total as f64 };
        EnforcementStats {
            enabled: self.enabled,
            total,
            allowed,
            blocked,
            by_hook,
            block_rate,
            log_len,
        }
    }

    /// Runs the global checks then `gates`, and records the decision.
    fn decide(
        &self,
        hook: EnforcementHook,
        subject: Subject<'_>,
        gates: impl FnOnce() -> GateResult,
    ) -> EnforcementDecision {
        let (allowed, verdict) = if !self.enabled {
            (true, GateVerdict::plain("enforcement disabled"))
        } else if self.emergency.is_active() {
            (false, GateVerdict::plain("Emergency stop active"))
        } else {
            match gates() {
                Ok(verdict) => (true, verdict),
                Err(verdict) => (false, verdict),
            }
        };
        let decision = EnforcementDecision {
            allowed,
            reason: verdict.reason,
            hook,
            readiness: verdict.readiness,
        };
        self.record(subject, &decision);
        decision
    }

    /// Blocks when `subsystem` is killed.
    fn kill_switch_gate(&self, subsystem: Subsystem) -> Result<(), GateVerdict> {
        if !self.kill_switches.is_killed(subsystem) {
            return Ok(());
        }
        let reason = self.kill_switches.get_state(subsystem).map(|state| state.reason);
        Err(GateVerdict::plain(match reason {
            Some(reason) if !reason.is_empty() => format!("Kill switch active for {subsystem}: {reason}"),
            _ => format!("Kill switch active for {subsystem}"),
        }))
    }

    /// Blocks when the cost guard denies or cannot evaluate the call.
    fn cost_gate(&self, feature: Feature, estimated_cost_usd: f64) -> GateResult {
        match self.cost_guard.check_cost(feature, estimated_cost_usd) {
            Ok(result) if result.allowed => Ok(GateVerdict::plain(result.reason)),
            Ok(result) => Err(GateVerdict::plain(format!("Cost guard blocked: {}", result.reason))),
            Err(err) => Err(GateVerdict::plain(format!("Cost guard blocked: {err}"))),
        }
    }

    /// Applies the live readiness decision; `WARN` needs an active approval.
    fn readiness_gate(&self) -> GateResult {
        let decision = self.readiness.evaluate_cutover(EvaluationMode::Live);
        let readiness = Some(decision.decision);
        match decision.decision {
            ReadinessDecisionKind::CanGoLive => Ok(GateVerdict {
                reason: decision.reason,
                readiness,
            }),
            ReadinessDecisionKind::Warn => match self.readiness.get_active_approval() {
                Some(approval) => Ok(GateVerdict {
                    reason: format!("{} (approved by {})", decision.reason, approval.approved_by),
                    readiness,
                }),
                None => Err(GateVerdict {
                    reason: format!("{} requires approval", decision.reason),
                    readiness,
                }),
            },
            ReadinessDecisionKind::Block => Err(GateVerdict {
                reason: decision.reason,
                readiness,
            }),
        }
    }

    /// Appends the decision to the log and audits it.
    fn record(&self, subject: Subject<'_>, decision: &EnforcementDecision) {
        let now_ms = self.clock.now_ms();
        let entry = EnforcementLogEntry {
            hook: decision.hook,
            subject: subject.label.to_string(),
            actor: subject.actor.map(str::to_string),
            provider: subject.provider.cloned(),
            allowed: decision.allowed,
            reason: decision.reason.clone(),
            readiness: decision.readiness,
            timestamp_ms: now_ms,
        };
        if let Ok(mut inner) = self.inner.lock() {
            let counts = inner.counts.entry(decision.hook).or_default();
            if decision.allowed {
                counts.allowed += 1;
            } else {
                counts.blocked += 1;
            }
            inner.log.push(entry);
        }
        self.audit.record(
            &SafetyAuditEvent::new(
                COMPONENT,
                decision.hook.as_str(),
                subject.label,
                decision.reason.as_str(),
                now_ms,
            )
            .with_actor(subject.actor)
            .with_allowed(decision.allowed)
            .with_details(json!({
                "readiness": decision.readiness,
                "provider": subject.provider,
            })),
        );
    }
}
