//! Environment overlay tests for safety-gate-config.
// crates/safety-gate-config/tests/env_overlay.rs
// =============================================================================
// Module: Environment Overlay Tests
// Description: Validate KILL_*, EMERGENCY_STOP_ENABLED, and ENABLE_* parsing.
// Purpose: Ensure malformed controls resolve active and env wins over file.
// =============================================================================

use std::collections::BTreeSet;

use safety_gate_config::EnvOverlay;
use safety_gate_config::parse_env_bool;
use safety_gate_core::Subsystem;

mod common;

use common::TestResult;

#[test]
fn boolean_spellings_parse() -> TestResult {
    let cases = [
        ("1", Some(true)),
        ("TRUE", Some(true)),
        (" yes ", Some(true)),
        ("On", Some(true)),
        ("0", Some(false)),
        ("false", Some(false)),
        ("no", Some(false)),
        ("OFF", Some(false)),
        ("", Some(false)),
        ("maybe", None),
        ("2", None),
    ];
    for (input, expected) in cases {
        if parse_env_bool(input) != expected {
            return Err(format!("parse_env_bool('{input}') returned an unexpected value"));
        }
    }
    Ok(())
}

#[test]
fn kill_variables_populate_killed_set() -> TestResult {
    let overlay = EnvOverlay::from_vars([
        ("KILL_SEARCH", "true"),
        ("KILL_BULK_CHANGES", "1"),
        ("KILL_CHAT", "false"),
        ("PATH", "/usr/bin"),
    ]);
    let expected: BTreeSet<Subsystem> = [Subsystem::Search, Subsystem::BulkChanges].into_iter().collect();
    if overlay.killed != expected {
        return Err("killed set did not match KILL_ variables".to_string());
    }
    if !overlay.warnings.is_empty() {
        return Err(format!("unexpected warnings: {}", overlay.warnings.join("; ")));
    }
    Ok(())
}

#[test]
fn malformed_controls_resolve_active_with_warning() -> TestResult {
    let overlay = EnvOverlay::from_vars([
        ("KILL_PUBLISHING", "sometimes"),
        ("EMERGENCY_STOP_ENABLED", "enabled"),
        ("ENABLE_ENFORCEMENT_HOOKS", "y"),
    ]);
    if !overlay.killed.contains(&Subsystem::Publishing) {
        return Err("malformed KILL_PUBLISHING should kill publishing".to_string());
    }
    if overlay.emergency_stop != Some(true) || overlay.enforcement != Some(true) {
        return Err("malformed booleans should resolve to true".to_string());
    }
    if overlay.warnings.len() != 3 {
        return Err(format!("expected three warnings, got {}", overlay.warnings.len()));
    }
    if !overlay.warnings.iter().any(|warning| warning.contains("EMERGENCY_STOP_ENABLED has malformed value 'enabled'")) {
        return Err("warning should name the variable and value".to_string());
    }
    Ok(())
}

#[test]
fn unknown_kill_variable_is_ignored_with_warning() -> TestResult {
    let overlay = EnvOverlay::from_vars([("KILL_BILLING", "true")]);
    if !overlay.killed.is_empty() {
        return Err("unknown subsystem should not be killed".to_string());
    }
    match overlay.warnings.as_slice() {
        [warning] if warning.contains("KILL_BILLING") => Ok(()),
        _ => Err("expected a single warning for KILL_BILLING".to_string()),
    }
}

#[test]
fn env_flags_override_file_flags() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.flags.kill_switches = true;
    config.flags.cost_guards = true;
    let overlay = EnvOverlay::from_vars([("ENABLE_COST_GUARDS", "false"), ("ENABLE_READINESS_CHECKS", "1")]);

    let settings = config.control_plane_settings(&overlay);
    if !settings.flags.kill_switches {
        return Err("unset env flag should keep the file value".to_string());
    }
    if settings.flags.cost_guards {
        return Err("env should disable cost guards".to_string());
    }
    if !settings.flags.readiness {
        return Err("env should enable readiness".to_string());
    }
    Ok(())
}

#[test]
fn emergency_stop_env_wins_over_file() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.flags.emergency_stop = true;

    let released = config.control_plane_settings(&EnvOverlay::from_vars([("EMERGENCY_STOP_ENABLED", "0")]));
    if released.environment.emergency_stop {
        return Err("env should release the file emergency stop".to_string());
    }
    let inherited = config.control_plane_settings(&EnvOverlay::default());
    if !inherited.environment.emergency_stop {
        return Err("file emergency stop should apply without env".to_string());
    }
    Ok(())
}

#[test]
fn killed_subsystems_flow_into_settings() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    let overlay = EnvOverlay::from_vars([("KILL_ROLLOUT", "yes")]);
    let settings = config.control_plane_settings(&overlay);
    if !settings.environment.killed.contains(&Subsystem::Rollout) {
        return Err("KILL_ROLLOUT should reach the control plane settings".to_string());
    }
    Ok(())
}
