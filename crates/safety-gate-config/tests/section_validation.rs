//! Per-section validation tests for safety-gate-config.
// crates/safety-gate-config/tests/section_validation.rs
// =============================================================================
// Module: Section Validation Tests
// Description: Validate fail-closed checks for every config section.
// Purpose: Ensure out-of-range values are rejected with the offending field.
// =============================================================================

use safety_gate_config::AuditSinkKind;
use safety_gate_config::SafetyGateConfig;
use safety_gate_core::Feature;
use safety_gate_core::FeatureLimitConfig;
use safety_gate_core::ProviderId;

mod common;

use common::TestResult;
use common::assert_invalid;

fn base() -> Result<SafetyGateConfig, String> {
    common::minimal_config().map_err(|err| err.to_string())
}

// ============================================================================
// SECTION: Capacities
// ============================================================================

#[test]
fn zero_history_capacity_is_rejected() -> TestResult {
    let mut config = base()?;
    config.kill_switch.history_capacity = 0;
    assert_invalid(config.validate(), "kill_switch.history_capacity")
}

#[test]
fn oversized_log_capacity_is_rejected() -> TestResult {
    let mut config = base()?;
    config.enforcement.log_capacity = 100_001;
    assert_invalid(config.validate(), "enforcement.log_capacity")
}

// ============================================================================
// SECTION: Cost Guard
// ============================================================================

#[test]
fn ceiling_must_exceed_warning() -> TestResult {
    let mut config = base()?;
    config.cost_guard.warning_threshold_percent = 90.0;
    config.cost_guard.hard_ceiling_percent = 90.0;
    assert_invalid(config.validate(), "hard_ceiling_percent")
}

#[test]
fn non_finite_warning_is_rejected() -> TestResult {
    let mut config = base()?;
    config.cost_guard.warning_threshold_percent = f64::NAN;
    assert_invalid(config.validate(), "warning_threshold_percent")
}

#[test]
fn duplicate_feature_limits_are_rejected() -> TestResult {
    let mut config = base()?;
    let limit = FeatureLimitConfig {
        feature: Feature::Chat,
        daily_limit_usd: 5.0,
        monthly_limit_usd: 50.0,
    };
    config.cost_guard.features = vec![limit, limit];
    assert_invalid(config.validate(), "chat more than once")
}

#[test]
fn daily_limit_above_monthly_is_rejected() -> TestResult {
    let mut config = base()?;
    config.cost_guard.features = vec![FeatureLimitConfig {
        feature: Feature::Search,
        daily_limit_usd: 100.0,
        monthly_limit_usd: 50.0,
    }];
    assert_invalid(config.validate(), "daily_limit_usd exceeds monthly_limit_usd")
}

#[test]
fn feature_limits_parse_from_toml() -> TestResult {
    let config = SafetyGateConfig::from_toml_str(
        "[[cost_guard.features]]\nfeature = \"translation\"\ndaily_limit_usd = 2.5\nmonthly_limit_usd = 30.0\n",
    )
    .map_err(|err| err.to_string())?;
    match config.cost_guard.features.as_slice() {
        [limit] if limit.feature == Feature::Translation => Ok(()),
        other => Err(format!("unexpected feature limits: {} entries", other.len())),
    }
}

#[test]
fn unknown_feature_fails_to_parse() -> TestResult {
    let result = SafetyGateConfig::from_toml_str(
        "[[cost_guard.features]]\nfeature = \"billing\"\ndaily_limit_usd = 1.0\nmonthly_limit_usd = 2.0\n",
    );
    if result.is_ok() {
        return Err("unknown feature should fail".to_string());
    }
    Ok(())
}

// ============================================================================
// SECTION: Provider Health
// ============================================================================

#[test]
fn failover_cannot_repeat_primary() -> TestResult {
    let mut config = base()?;
    config.provider_health.failover = vec![ProviderId::new("openai")];
    assert_invalid(config.validate(), "must not include the primary")
}

#[test]
fn failover_duplicates_are_rejected() -> TestResult {
    let mut config = base()?;
    config.provider_health.failover = vec![ProviderId::new("gemini"), ProviderId::new("gemini")];
    assert_invalid(config.validate(), "gemini more than once")
}

#[test]
fn error_rates_must_be_ordered() -> TestResult {
    let mut config = base()?;
    config.provider_health.degraded_error_rate = 0.6;
    config.provider_health.critical_error_rate = 0.5;
    assert_invalid(config.validate(), "critical_error_rate")
}

#[test]
fn window_must_cover_min_samples() -> TestResult {
    let mut config = base()?;
    config.provider_health.min_samples = 20;
    config.provider_health.window_size = 10;
    assert_invalid(config.validate(), "window_size")
}

#[test]
fn empty_primary_is_rejected() -> TestResult {
    let mut config = base()?;
    config.provider_health.primary = ProviderId::new(" ");
    assert_invalid(config.validate(), "provider_health.primary")
}

// ============================================================================
// SECTION: Readiness, Enforcement, Audit
// ============================================================================

#[test]
fn readiness_requires_positive_timeouts() -> TestResult {
    let mut config = base()?;
    config.readiness.check_timeout_ms = 0;
    assert_invalid(config.validate(), "readiness.check_timeout_ms")?;
    let mut config = base()?;
    config.readiness.approval_ttl_ms = 0;
    assert_invalid(config.validate(), "readiness.approval_ttl_ms")?;
    let mut config = base()?;
    config.readiness.config_version = String::new();
    assert_invalid(config.validate(), "readiness.config_version")
}

#[test]
fn bulk_limit_must_be_positive() -> TestResult {
    let mut config = base()?;
    config.enforcement.max_bulk_change_items = 0;
    assert_invalid(config.validate(), "max_bulk_change_items")
}

#[test]
fn file_sink_requires_path() -> TestResult {
    let mut config = base()?;
    config.audit.sink = AuditSinkKind::File;
    assert_invalid(config.validate(), "audit.path is required")
}

#[test]
fn path_without_file_sink_is_rejected() -> TestResult {
    let mut config = base()?;
    config.audit.sink = AuditSinkKind::Stderr;
    config.audit.path = Some("audit.jsonl".to_string());
    assert_invalid(config.validate(), "audit.path is only valid")
}

#[test]
fn overlong_audit_path_component_is_rejected() -> TestResult {
    let mut config = base()?;
    config.audit.sink = AuditSinkKind::File;
    config.audit.path = Some(format!("logs/{}.jsonl", "a".repeat(300)));
    assert_invalid(config.validate(), "path component too long")
}
