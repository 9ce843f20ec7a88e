// crates/safety-gate-core/src/runtime/control_plane.rs
// ============================================================================
// Module: Safety Control Plane
// Description: Composition root wiring the safety components together.
// Purpose: Construct each component once and share it across request handlers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! [`SafetyControlPlane`] owns one instance of every component behind an
//! `Arc`. Production builds one at startup and injects it into handlers;
//! tests build a fresh one per case with a manual clock.
//!
//! Cross-component calls follow one order: emergency stop, kill switch, cost
//! guard, readiness. No component calls back into a caller while holding its
//! own lock.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::core::flags::EnvironmentControls;
use crate::core::flags::FeatureFlags;
use crate::interfaces::AuditSink;
use crate::interfaces::Clock;
use crate::runtime::cost_guard::CostGuardConfig;
use crate::runtime::cost_guard::CostGuardLedger;
use crate::runtime::emergency::EmergencyStop;
use crate::runtime::enforcement::EnforcementConfig;
use crate::runtime::enforcement::EnforcementHooks;
use crate::runtime::kill_switch::KillSwitchConfig;
use crate::runtime::kill_switch::KillSwitchRegistry;
use crate::runtime::provider_health::ProviderHealthConfig;
use crate::runtime::provider_health::ProviderHealthMonitor;
use crate::runtime::readiness::ReadinessConfig;
use crate::runtime::readiness::ReadinessEvaluator;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Resolved settings for every component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlPlaneSettings {
    /// Component enable flags.
    pub flags: FeatureFlags,
    /// Environment-mandated controls.
    pub environment: EnvironmentControls,
    /// Kill switch registry settings.
    pub kill_switch: KillSwitchConfig,
    /// Cost guard settings.
    pub cost_guard: CostGuardConfig,
    /// Provider health settings.
    pub provider_health: ProviderHealthConfig,
    /// Readiness settings.
    pub readiness: ReadinessConfig,
    /// Enforcement hook settings.
    pub enforcement: EnforcementConfig,
}

// ============================================================================
// SECTION: Control Plane
// ============================================================================

/// Shared safety components.
pub struct SafetyControlPlane {
    /// Global emergency stop.
    emergency_stop: Arc<EmergencyStop>,
    /// Kill switch registry.
    kill_switches: Arc<KillSwitchRegistry>,
    /// Cost guard ledger.
    cost_guard: Arc<CostGuardLedger>,
    /// Provider health monitor.
    provider_health: Arc<ProviderHealthMonitor>,
    /// Readiness evaluator.
    readiness: Arc<ReadinessEvaluator>,
    /// Enforcement hooks.
    enforcement: Arc<EnforcementHooks>,
}

impl SafetyControlPlane {
    /// Builds every component from `settings`.
    #[must_use]
    pub fn new(settings: ControlPlaneSettings, clock: Arc<dyn Clock>, audit: Arc<dyn AuditSink>) -> Self {
        let ControlPlaneSettings {
            flags,
            environment,
            kill_switch,
            cost_guard,
            provider_health,
            readiness,
            enforcement,
        } = settings;
        let emergency_stop = Arc::new(EmergencyStop::new(
            environment.emergency_stop,
            Arc::clone(&clock),
            Arc::clone(&audit),
        ));
        let kill_switches = Arc::new(KillSwitchRegistry::new(
            kill_switch,
            flags.kill_switches,
            &environment,
            Arc::clone(&clock),
            Arc::clone(&audit),
        ));
        let cost_guard = Arc::new(CostGuardLedger::new(
            &cost_guard,
            flags.cost_guards,
            Arc::clone(&clock),
            Arc::clone(&audit),
        ));
        let provider_health = Arc::new(ProviderHealthMonitor::new(
            provider_health,
            flags.provider_failover,
            Arc::clone(&clock),
            Arc::clone(&audit),
        ));
        let readiness = Arc::new(ReadinessEvaluator::new(
            readiness,
            flags.readiness,
            Arc::clone(&emergency_stop),
            Arc::clone(&clock),
            Arc::clone(&audit),
        ));
        let enforcement = Arc::new(EnforcementHooks::new(
            enforcement,
            flags.enforcement,
            Arc::clone(&emergency_stop),
            Arc::clone(&kill_switches),
            Arc::clone(&cost_guard),
            Arc::clone(&readiness),
            clock,
            audit,
        ));
        Self {
            emergency_stop,
            kill_switches,
            cost_guard,
            provider_health,
            readiness,
            enforcement,
        }
    }

    /// Returns the emergency stop.
    #[must_use]
    pub fn emergency_stop(&self) -> Arc<EmergencyStop> {
        Arc::clone(&self.emergency_stop)
    }

    /// Returns the kill switch registry.
    #[must_use]
    pub fn kill_switches(&self) -> Arc<KillSwitchRegistry> {
        Arc::clone(&self.kill_switches)
    }

    /// Returns the cost guard ledger.
    #[must_use]
    pub fn cost_guard(&self) -> Arc<CostGuardLedger> {
        Arc::clone(&self.cost_guard)
    }

    /// Returns the provider health monitor.
    #[must_use]
    pub fn provider_health(&self) -> Arc<ProviderHealthMonitor> {
        Arc::clone(&self.provider_health)
    }

    /// Returns the readiness evaluator.
    #[must_use]
    pub fn readiness(&self) -> Arc<ReadinessEvaluator> {
        Arc::clone(&self.readiness)
    }

    /// Returns the enforcement hooks.
    #[must_use]
    pub fn enforcement(&self) -> Arc<EnforcementHooks> {
        Arc::clone(&self.enforcement)
    }
}
