// crates/safety-gate-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for operators and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example `safety-gate.toml`. Every value shown is the default
//! except the enabled flags, the file audit sink, and one budget override.

/// Returns a canonical example `safety-gate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[flags]
kill_switches = true
cost_guards = true
provider_failover = true
readiness = true
enforcement = true
emergency_stop = false

[kill_switch]
history_capacity = 1000

[cost_guard]
warning_threshold_percent = 80.0
hard_ceiling_percent = 100.0
history_capacity = 1000

[[cost_guard.features]]
feature = "aeo"
daily_limit_usd = 10.0
monthly_limit_usd = 100.0

[provider_health]
primary = "openai"
failover = ["anthropic", "gemini"]
degraded_error_rate = 0.2
critical_error_rate = 0.5
min_samples = 10
window_size = 50
action_log_capacity = 1000
max_concurrency = 10

[readiness]
config_version = "1"
cache_ttl_ms = 30000
approval_ttl_ms = 3600000
max_soft_blockers = 0
check_timeout_ms = 5000
override_history_capacity = 100

[enforcement]
log_capacity = 1000
max_bulk_change_items = 10000

[audit]
sink = "file"
path = "safety-gate-audit.jsonl"
"#,
    )
}
