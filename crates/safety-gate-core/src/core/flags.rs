// crates/safety-gate-core/src/core/flags.rs
// ============================================================================
// Module: Safety Gate Control Flags
// Description: Per-component enable flags and environment-mandated controls.
// Purpose: Carry startup flag state into the runtime components.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Component enable flags switch a whole component into transparent bypass
//! when off. Environment controls are the startup-only kill switches and the
//! initial emergency-stop state; they always win over runtime API calls.
//! Parsing from the process environment lives in `safety-gate-config`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::Subsystem;

// ============================================================================
// SECTION: Feature Flags
// ============================================================================

/// Per-component enable flags (`ENABLE_*`).
///
/// # Invariants
/// - A `false` flag means the component is bypassed, never that it blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureFlags {
    /// Kill switch registry enforcement (`ENABLE_KILL_SWITCHES`).
    pub kill_switches: bool,
    /// Cost guard enforcement (`ENABLE_COST_GUARDS`).
    pub cost_guards: bool,
    /// Provider failover and throttling (`ENABLE_PROVIDER_FAILOVER`).
    pub provider_failover: bool,
    /// Live readiness evaluation (`ENABLE_READINESS_CHECKS`).
    pub readiness: bool,
    /// Enforcement hooks (`ENABLE_ENFORCEMENT_HOOKS`).
    pub enforcement: bool,
}

impl FeatureFlags {
    /// Returns flags with every component enabled.
    #[must_use]
    pub const fn all_enabled() -> Self {
        Self {
            kill_switches: true,
            cost_guards: true,
            provider_failover: true,
            readiness: true,
            enforcement: true,
        }
    }
}

// ============================================================================
// SECTION: Environment Controls
// ============================================================================

/// Controls mandated by the process environment at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentControls {
    /// Subsystems force-killed via `KILL_<SUBSYSTEM>`.
    pub killed: BTreeSet<Subsystem>,
    /// Initial emergency-stop state (`EMERGENCY_STOP_ENABLED`).
    pub emergency_stop: bool,
}
