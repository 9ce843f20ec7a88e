// crates/safety-gate-core/src/lib.rs
// ============================================================================
// Module: Safety Gate Core Library
// Description: Public API surface for the Safety Gate operational control plane.
// Purpose: Expose identifiers, interfaces, and the runtime safety components.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Safety Gate is the shared gate every sensitive automated action passes
//! through before it executes. Publishing, AI calls, bulk changes, job
//! execution, and feature rollout each ask one enforcement hook whether they
//! are allowed; the hook composes kill switches, cost guards, and the
//! readiness evaluator, and records every decision.
//!
//! The core never performs network or disk I/O on its own. Health checks,
//! cost computation, and provider calls live in collaborators that feed
//! pre-computed values in through [`interfaces`].
//!
//! Security posture: every internal failure resolves to a blocking outcome.
//! Nothing in steady-state evaluation defaults to allow on error.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AuditSink;
pub use interfaces::CheckError;
pub use interfaces::CheckOutcome;
pub use interfaces::CheckSeverity;
pub use interfaces::CheckStatus;
pub use interfaces::Clock;
pub use interfaces::ReadinessCheck;
pub use interfaces::SafetyAuditEvent;
pub use runtime::FileAuditSink;
pub use runtime::MemoryAuditSink;
pub use runtime::NoopAuditSink;
pub use runtime::StderrAuditSink;
pub use runtime::ManualClock;
pub use runtime::SystemClock;
pub use runtime::ControlPlaneSettings;
pub use runtime::SafetyControlPlane;
pub use runtime::CalendarRollover;
pub use runtime::CostCheckResult;
pub use runtime::CostGuardConfig;
pub use runtime::CostGuardError;
pub use runtime::CostGuardLedger;
pub use runtime::FeatureLimitConfig;
pub use runtime::FeatureSpend;
pub use runtime::FeatureUsage;
pub use runtime::TotalSpending;
pub use runtime::UsageDetails;
pub use runtime::UsageEvent;
pub use runtime::EmergencyStop;
pub use runtime::AiCallContext;
pub use runtime::BulkChangeContext;
pub use runtime::EnforcementConfig;
pub use runtime::EnforcementDecision;
pub use runtime::EnforcementHook;
pub use runtime::EnforcementHooks;
pub use runtime::EnforcementLogEntry;
pub use runtime::EnforcementStats;
pub use runtime::HookCounts;
pub use runtime::JobContext;
pub use runtime::PublishContext;
pub use runtime::RegenerationContext;
pub use runtime::RolloutContext;
pub use runtime::KillSwitchAction;
pub use runtime::KillSwitchConfig;
pub use runtime::KillSwitchEvent;
pub use runtime::KillSwitchRegistry;
pub use runtime::KillSwitchState;
pub use runtime::KillSwitchStats;
pub use runtime::SwitchSource;
pub use runtime::guard_source;
pub use runtime::ConcurrencyLevel;
pub use runtime::ConcurrencyTier;
pub use runtime::DisabledBy;
pub use runtime::ProviderAction;
pub use runtime::ProviderActionKind;
pub use runtime::ProviderHealthConfig;
pub use runtime::ProviderHealthMonitor;
pub use runtime::ProviderHealthSnapshot;
pub use runtime::ProviderMetrics;
pub use runtime::ProviderState;
pub use runtime::ProviderStatus;
pub use runtime::Approval;
pub use runtime::Blocker;
pub use runtime::CheckResult;
pub use runtime::DecisionSignature;
pub use runtime::EvaluationMode;
pub use runtime::ReadinessConfig;
pub use runtime::ReadinessDecision;
pub use runtime::ReadinessDecisionKind;
pub use runtime::ReadinessError;
pub use runtime::ReadinessEvaluator;
pub use runtime::ReadinessOverride;
