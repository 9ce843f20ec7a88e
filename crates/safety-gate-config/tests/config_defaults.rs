//! Config defaults, loading, and audit sink tests for safety-gate-config.
// crates/safety-gate-config/tests/config_defaults.rs
// =============================================================================
// Module: Config Defaults and Loading Tests
// Description: Validate default behavior, example parsing, and file loading.
// Purpose: Ensure minimal config is valid and the loader enforces its limits.
// =============================================================================

use std::fs;

use safety_gate_config::AuditSinkKind;
use safety_gate_config::ConfigError;
use safety_gate_config::SafetyGateConfig;
use safety_gate_config::config_toml_example;
use safety_gate_core::Feature;
use safety_gate_core::SafetyAuditEvent;

mod common;

use common::TestResult;

#[test]
fn default_config_validates() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    if config != SafetyGateConfig::default() {
        return Err("empty toml should equal the default config".to_string());
    }
    Ok(())
}

#[test]
fn components_are_bypassed_by_default() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    let flags = config.flags;
    if flags.kill_switches
        || flags.cost_guards
        || flags.provider_failover
        || flags.readiness
        || flags.enforcement
        || flags.emergency_stop
    {
        return Err("every flag should default to false".to_string());
    }
    if config.audit.sink != AuditSinkKind::None {
        return Err("audit sink should default to none".to_string());
    }
    Ok(())
}

#[test]
fn example_config_parses_and_validates() -> TestResult {
    let config = SafetyGateConfig::from_toml_str(&config_toml_example()).map_err(|err| err.to_string())?;
    if !config.flags.enforcement || config.flags.emergency_stop {
        return Err("example should enable enforcement without the emergency stop".to_string());
    }
    let aeo = config
        .cost_guard
        .features
        .iter()
        .find(|limit| limit.feature == Feature::Aeo)
        .ok_or_else(|| "example should override aeo limits".to_string())?;
    if (aeo.daily_limit_usd - 10.0).abs() > f64::EPSILON {
        return Err(format!("unexpected aeo daily limit {}", aeo.daily_limit_usd));
    }
    if config.audit.sink != AuditSinkKind::File {
        return Err("example should use the file audit sink".to_string());
    }
    Ok(())
}

#[test]
fn unknown_fields_are_rejected() -> TestResult {
    match SafetyGateConfig::from_toml_str("[flags]\nkill_switch = true\n") {
        Err(ConfigError::Parse(_)) => Ok(()),
        Err(other) => Err(format!("expected parse error, got {other}")),
        Ok(_) => Err("misspelled flag should not parse".to_string()),
    }
}

#[test]
fn load_reads_explicit_path() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("safety-gate.toml");
    fs::write(&path, "[flags]\ncost_guards = true\n").map_err(|err| err.to_string())?;
    let config = SafetyGateConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    if !config.flags.cost_guards || config.flags.kill_switches {
        return Err("loaded flags did not match file".to_string());
    }
    Ok(())
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("safety-gate.toml");
    let padding = format!("# {}\n", "x".repeat(1024 * 1024));
    fs::write(&path, padding).map_err(|err| err.to_string())?;
    common::assert_invalid(SafetyGateConfig::load(Some(&path)).map(|_| ()), "size limit")
}

#[test]
fn load_reports_missing_file_as_io() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    match SafetyGateConfig::load(Some(&dir.path().join("absent.toml"))) {
        Err(ConfigError::Io(_)) => Ok(()),
        Err(other) => Err(format!("expected io error, got {other}")),
        Ok(_) => Err("missing file should not load".to_string()),
    }
}

#[test]
fn file_audit_sink_writes_json_lines() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("audit.jsonl");
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.audit.sink = AuditSinkKind::File;
    config.audit.path = Some(path.to_string_lossy().into_owned());
    config.validate().map_err(|err| err.to_string())?;

    let sink = config.build_audit_sink().map_err(|err| err.to_string())?;
    sink.record(&SafetyAuditEvent::new("kill_switch", "enabled", "search", "drill", 7));

    let contents = fs::read_to_string(&path).map_err(|err| err.to_string())?;
    let event: serde_json::Value = serde_json::from_str(contents.trim()).map_err(|err| err.to_string())?;
    if event["component"] != "kill_switch" || event["timestamp_ms"] != 7 {
        return Err(format!("unexpected audit line {contents}"));
    }
    Ok(())
}

#[test]
fn unopenable_audit_path_is_io_error() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.audit.sink = AuditSinkKind::File;
    config.audit.path = Some(dir.path().join("missing").join("audit.jsonl").to_string_lossy().into_owned());
    match config.build_audit_sink() {
        Err(ConfigError::Io(message)) if message.starts_with("audit.path") => Ok(()),
        Err(other) => Err(format!("expected io error, got {other}")),
        Ok(_) => Err("audit sink in a missing directory should fail".to_string()),
    }
}
