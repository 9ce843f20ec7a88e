// crates/safety-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Safety Gate Runtime
// Description: Kill switches, cost guards, provider health, readiness, and enforcement.
// Purpose: Implement the safety components and the composition root that shares them.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules hold the process-wide safety state. Each component guards
//! its state with one lock, and enforcement hooks reach across components in
//! a fixed order. Build everything through [`SafetyControlPlane`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod clock;
pub mod control_plane;
pub mod cost_guard;
pub mod emergency;
pub mod enforcement;
pub mod kill_switch;
pub mod provider_health;
pub mod readiness;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use control_plane::ControlPlaneSettings;
pub use control_plane::SafetyControlPlane;
pub use cost_guard::CalendarRollover;
pub use cost_guard::CostCheckResult;
pub use cost_guard::CostGuardConfig;
pub use cost_guard::CostGuardError;
pub use cost_guard::CostGuardLedger;
pub use cost_guard::FeatureLimitConfig;
pub use cost_guard::FeatureSpend;
pub use cost_guard::FeatureUsage;
pub use cost_guard::TotalSpending;
pub use cost_guard::UsageDetails;
pub use cost_guard::UsageEvent;
pub use emergency::EmergencyStop;
pub use enforcement::AiCallContext;
pub use enforcement::BulkChangeContext;
pub use enforcement::EnforcementConfig;
pub use enforcement::EnforcementDecision;
pub use enforcement::EnforcementHook;
pub use enforcement::EnforcementHooks;
pub use enforcement::EnforcementLogEntry;
pub use enforcement::EnforcementStats;
pub use enforcement::HookCounts;
pub use enforcement::JobContext;
pub use enforcement::PublishContext;
pub use enforcement::RegenerationContext;
pub use enforcement::RolloutContext;
pub use kill_switch::KillSwitchAction;
pub use kill_switch::KillSwitchConfig;
pub use kill_switch::KillSwitchEvent;
pub use kill_switch::KillSwitchRegistry;
pub use kill_switch::KillSwitchState;
pub use kill_switch::KillSwitchStats;
pub use kill_switch::SwitchSource;
pub use kill_switch::guard_source;
pub use provider_health::ConcurrencyLevel;
pub use provider_health::ConcurrencyTier;
pub use provider_health::DisabledBy;
pub use provider_health::ProviderAction;
pub use provider_health::ProviderActionKind;
pub use provider_health::ProviderHealthConfig;
pub use provider_health::ProviderHealthMonitor;
pub use provider_health::ProviderHealthSnapshot;
pub use provider_health::ProviderMetrics;
pub use provider_health::ProviderState;
pub use provider_health::ProviderStatus;
pub use readiness::Approval;
pub use readiness::Blocker;
pub use readiness::CheckResult;
pub use readiness::DecisionSignature;
pub use readiness::EvaluationMode;
pub use readiness::ReadinessConfig;
pub use readiness::ReadinessDecision;
pub use readiness::ReadinessDecisionKind;
pub use readiness::ReadinessError;
pub use readiness::ReadinessEvaluator;
pub use readiness::ReadinessOverride;
