// crates/safety-gate-config/src/env.rs
// ============================================================================
// Module: Environment Overlay
// Description: Parsing of KILL_*, EMERGENCY_STOP_ENABLED, and ENABLE_* variables.
// Purpose: Resolve environment controls to their safest interpretation.
// Dependencies: safety-gate-core
// ============================================================================

//! ## Overview
//! Environment variables override the config file. Booleans accept
//! `1/true/yes/on` and `0/false/no/off` or an empty value, case-insensitively.
//! Anything else is malformed and resolves to `true`, which keeps the
//! control active: a kill switch stays killed, the emergency stop stays
//! engaged, and a component flag stays enforcing. Every malformed value is
//! reported in [`EnvOverlay::warnings`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;

use safety_gate_core::FeatureFlags;
use safety_gate_core::Subsystem;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix of per-subsystem kill variables.
const KILL_PREFIX: &str = "KILL_";
/// Emergency stop variable.
pub const EMERGENCY_STOP_VAR: &str = "EMERGENCY_STOP_ENABLED";
/// Kill switch registry flag.
pub const ENABLE_KILL_SWITCHES_VAR: &str = "ENABLE_KILL_SWITCHES";
/// Cost guard flag.
pub const ENABLE_COST_GUARDS_VAR: &str = "ENABLE_COST_GUARDS";
/// Provider failover flag.
pub const ENABLE_PROVIDER_FAILOVER_VAR: &str = "ENABLE_PROVIDER_FAILOVER";
/// Readiness flag.
pub const ENABLE_READINESS_CHECKS_VAR: &str = "ENABLE_READINESS_CHECKS";
/// Enforcement hooks flag.
pub const ENABLE_ENFORCEMENT_HOOKS_VAR: &str = "ENABLE_ENFORCEMENT_HOOKS";

// ============================================================================
// SECTION: Overlay
// ============================================================================

/// Controls and flags read from the environment.
///
/// # Invariants
/// - `None` flags leave the config file value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay {
    /// Subsystems killed via `KILL_<SUBSYSTEM>`.
    pub killed: BTreeSet<Subsystem>,
    /// `EMERGENCY_STOP_ENABLED`.
    pub emergency_stop: Option<bool>,
    /// `ENABLE_KILL_SWITCHES`.
    pub kill_switches: Option<bool>,
    /// `ENABLE_COST_GUARDS`.
    pub cost_guards: Option<bool>,
    /// `ENABLE_PROVIDER_FAILOVER`.
    pub provider_failover: Option<bool>,
    /// `ENABLE_READINESS_CHECKS`.
    pub readiness: Option<bool>,
    /// `ENABLE_ENFORCEMENT_HOOKS`.
    pub enforcement: Option<bool>,
    /// Malformed or unrecognized variables.
    pub warnings: Vec<String>,
}

impl EnvOverlay {
    /// Reads the overlay from the process environment, skipping non-UTF-8 entries.
    #[must_use]
    pub fn from_process_env() -> Self {
        Self::from_vars(
            env::vars_os().filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?))),
        )
    }

    /// Reads the overlay from explicit `(name, value)` pairs.
    #[must_use]
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut overlay = Self::default();
        for (key, value) in vars {
            overlay.apply(key.as_ref(), value.as_ref());
        }
        overlay
    }

    /// Applies the overlay on top of file-configured flags.
    #[must_use]
    pub fn apply_flags(&self, mut flags: FeatureFlags) -> FeatureFlags {
        if let Some(value) = self.kill_switches {
            flags.kill_switches = value;
        }
        if let Some(value) = self.cost_guards {
            flags.cost_guards = value;
        }
        if let Some(value) = self.provider_failover {
            flags.provider_failover = value;
        }
        if let Some(value) = self.readiness {
            flags.readiness = value;
        }
        if let Some(value) = self.enforcement {
            flags.enforcement = value;
        }
        flags
    }

    /// Records one variable.
    fn apply(&mut self, key: &str, value: &str) {
        let slot = match key {
            EMERGENCY_STOP_VAR => &mut self.emergency_stop,
            ENABLE_KILL_SWITCHES_VAR => &mut self.kill_switches,
            ENABLE_COST_GUARDS_VAR => &mut self.cost_guards,
            ENABLE_PROVIDER_FAILOVER_VAR => &mut self.provider_failover,
            ENABLE_READINESS_CHECKS_VAR => &mut self.readiness,
            ENABLE_ENFORCEMENT_HOOKS_VAR => &mut self.enforcement,
            _ if key.starts_with(KILL_PREFIX) => {
                self.apply_kill(key, value);
                return;
            }
            _ => return,
        };
        *slot = Some(resolve_bool(key, value, &mut self.warnings));
    }

    /// Records one `KILL_<SUBSYSTEM>` variable.
    fn apply_kill(&mut self, key: &str, value: &str) {
        let Some(subsystem) = Subsystem::ALL.into_iter().find(|subsystem| subsystem.env_key() == key) else {
            self.warnings.push(format!("{key} does not name a known subsystem; ignored"));
            return;
        };
        if resolve_bool(key, value, &mut self.warnings) {
            self.killed.insert(subsystem);
        }
    }
}

// ============================================================================
// SECTION: Boolean Parsing
// ============================================================================

/// Parses an environment boolean; `None` when malformed.
#[must_use]
pub fn parse_env_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Parses a control boolean, resolving malformed values to `true`.
fn resolve_bool(key: &str, value: &str, warnings: &mut Vec<String>) -> bool {
    parse_env_bool(value).unwrap_or_else(|| {
        warnings.push(format!("{key} has malformed value '{value}'; treated as true"));
        true
    })
}
