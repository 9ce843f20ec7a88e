// crates/safety-gate-core/tests/kill_switch.rs
// ============================================================================
// Module: Kill Switch Tests
// Description: Tests for kill switch precedence, expiry, and history.
// ============================================================================
//! ## Overview
//! Validates env-over-api precedence, lazy TTL expiry, the registry bypass
//! flag, and the audit trail.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use safety_gate_core::EnvironmentControls;
use safety_gate_core::KillSwitchAction;
use safety_gate_core::KillSwitchConfig;
use safety_gate_core::KillSwitchRegistry;
use safety_gate_core::ManualClock;
use safety_gate_core::MemoryAuditSink;
use safety_gate_core::Subsystem;
use safety_gate_core::SwitchSource;
use safety_gate_core::SystemClock;
use safety_gate_core::guard_source;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn registry_with(
    killed: &[Subsystem],
    enabled: bool,
) -> (KillSwitchRegistry, ManualClock, Arc<MemoryAuditSink>) {
    let clock = ManualClock::new(1_000);
    let audit = Arc::new(MemoryAuditSink::default());
    let env = EnvironmentControls {
        killed: killed.iter().copied().collect::<BTreeSet<_>>(),
        emergency_stop: false,
    };
    let registry = KillSwitchRegistry::new(
        KillSwitchConfig::default(),
        enabled,
        &env,
        Arc::new(clock.clone()),
        audit.clone(),
    );
    (registry, clock, audit)
}

// ============================================================================
// SECTION: Startup and Precedence
// ============================================================================

#[test]
fn nothing_is_killed_at_startup_without_env() {
    let (registry, _clock, _audit) = registry_with(&[], true);
    for subsystem in Subsystem::ALL {
        assert!(!registry.is_killed(subsystem), "{subsystem} should start released");
    }
    assert!(registry.get_killed_subsystems().is_empty());
}

#[test]
fn env_kill_is_seeded_with_env_source() {
    let (registry, _clock, audit) = registry_with(&[Subsystem::Publishing], true);
    assert!(registry.is_killed(Subsystem::Publishing));
    assert!(!registry.is_killed(Subsystem::Search));

    let state = registry.get_state(Subsystem::Publishing).unwrap();
    assert_eq!(state.source, SwitchSource::Env);
    assert_eq!(state.enabled_by.as_deref(), Some("environment"));
    assert_eq!(audit.events_for("kill_switch").len(), 1);
}

#[test]
fn api_cannot_release_env_switch() {
    let (registry, _clock, _audit) = registry_with(&[Subsystem::Chat], true);
    assert!(!registry.disable(Subsystem::Chat, SwitchSource::Api, "try to release"));
    assert!(registry.is_killed(Subsystem::Chat));
    assert!(!registry.toggle(Subsystem::Chat, SwitchSource::Api, "flip", Some("ops")));
    assert!(registry.is_killed(Subsystem::Chat));

    let history = registry.get_event_history(10);
    assert_eq!(history[0].action, KillSwitchAction::Rejected);
    assert_eq!(history[0].source, SwitchSource::Api);
}

#[test]
fn env_source_can_release_env_switch() {
    let (registry, _clock, _audit) = registry_with(&[Subsystem::Chat], true);
    assert!(registry.disable(Subsystem::Chat, SwitchSource::Env, "env cleared"));
    assert!(!registry.is_killed(Subsystem::Chat));
}

#[test]
fn guard_source_only_protects_active_env_switches() {
    let (registry, _clock, _audit) = registry_with(&[Subsystem::Jobs], true);
    let env_state = registry.get_state(Subsystem::Jobs).unwrap();
    assert!(!guard_source(&env_state, SwitchSource::Api, 1_000));
    assert!(guard_source(&env_state, SwitchSource::Env, 1_000));

    let released = registry.get_state(Subsystem::Search).unwrap();
    assert!(guard_source(&released, SwitchSource::Api, 1_000));
}

// ============================================================================
// SECTION: API Mutations
// ============================================================================

#[test]
fn api_enable_and_disable_round_trip() {
    let (registry, _clock, audit) = registry_with(&[], true);
    assert!(registry.enable(Subsystem::Aeo, SwitchSource::Api, "incident 42", Some("alice"), None));
    assert!(registry.is_killed(Subsystem::Aeo));
    let state = registry.get_state(Subsystem::Aeo).unwrap();
    assert_eq!(state.enabled_by.as_deref(), Some("alice"));
    assert_eq!(state.reason, "incident 42");

    assert!(registry.disable(Subsystem::Aeo, SwitchSource::Api, "resolved"));
    assert!(!registry.is_killed(Subsystem::Aeo));

    let actions: Vec<KillSwitchAction> =
        registry.get_event_history(10).into_iter().map(|event| event.action).collect();
    assert_eq!(actions, vec![KillSwitchAction::Disabled, KillSwitchAction::Enabled]);
    assert_eq!(audit.events_for("kill_switch").len(), 2);
}

#[test]
fn toggle_flips_api_switch() {
    let (registry, _clock, _audit) = registry_with(&[], true);
    assert!(registry.toggle(Subsystem::Rollout, SwitchSource::Api, "pause", Some("bob")));
    assert!(registry.is_killed(Subsystem::Rollout));
    assert!(registry.toggle(Subsystem::Rollout, SwitchSource::Api, "resume", Some("bob")));
    assert!(!registry.is_killed(Subsystem::Rollout));
}

#[test]
fn empty_reason_and_zero_ttl_are_rejected() {
    let (registry, _clock, _audit) = registry_with(&[], true);
    assert!(!registry.enable(Subsystem::Search, SwitchSource::Api, "  ", None, None));
    assert!(!registry.enable(Subsystem::Search, SwitchSource::Api, "maintenance", None, Some(0)));
    assert!(!registry.is_killed(Subsystem::Search));
    assert!(registry.get_event_history(10).iter().all(|event| event.action == KillSwitchAction::Rejected));
}

#[test]
fn disabling_released_switch_succeeds_without_event() {
    let (registry, _clock, _audit) = registry_with(&[], true);
    assert!(registry.disable(Subsystem::Search, SwitchSource::Api, "noop"));
    assert!(registry.get_event_history(10).is_empty());
}

// ============================================================================
// SECTION: Expiry
// ============================================================================

#[test]
fn timed_switch_expires_lazily_on_read() {
    let (registry, clock, _audit) = registry_with(&[], true);
    assert!(registry.enable(Subsystem::Search, SwitchSource::Api, "maintenance", None, Some(100)));
    assert!(registry.is_killed(Subsystem::Search));

    clock.advance(99);
    assert!(registry.is_killed(Subsystem::Search));

    clock.advance(1);
    assert!(!registry.is_killed(Subsystem::Search));
    let history = registry.get_event_history(1);
    assert_eq!(history[0].action, KillSwitchAction::Expired);
}

#[test]
fn timed_switch_expires_with_wall_clock() {
    let audit = Arc::new(MemoryAuditSink::default());
    let registry = KillSwitchRegistry::new(
        KillSwitchConfig::default(),
        true,
        &EnvironmentControls::default(),
        Arc::new(SystemClock),
        audit,
    );
    assert!(registry.enable(Subsystem::Search, SwitchSource::Api, "maintenance", None, Some(100)));
    assert!(registry.is_killed(Subsystem::Search));
    thread::sleep(Duration::from_millis(150));
    assert!(!registry.is_killed(Subsystem::Search));
}

// ============================================================================
// SECTION: Bypass and Stats
// ============================================================================

#[test]
fn disabled_registry_never_reports_killed() {
    let (registry, _clock, _audit) = registry_with(&[Subsystem::Search], false);
    assert!(!registry.is_registry_enabled());
    assert!(!registry.is_killed(Subsystem::Search));
    assert!(registry.enable(Subsystem::Chat, SwitchSource::Api, "drill", None, None));
    assert!(!registry.is_killed(Subsystem::Chat));
    assert_eq!(registry.get_killed_subsystems(), vec![Subsystem::Search, Subsystem::Chat]);
}

#[test]
fn stats_count_sources_and_timed_switches() {
    let (registry, _clock, _audit) = registry_with(&[Subsystem::Jobs], true);
    assert!(registry.enable(Subsystem::Chat, SwitchSource::Api, "drill", None, Some(5_000)));
    assert!(registry.enable(Subsystem::Aeo, SwitchSource::Api, "drill", None, None));

    let stats = registry.get_stats();
    assert!(stats.registry_enabled);
    assert_eq!(stats.total_subsystems, 10);
    assert_eq!(stats.killed, 3);
    assert_eq!(stats.env_controlled, 1);
    assert_eq!(stats.api_controlled, 2);
    assert_eq!(stats.timed, 1);
    assert_eq!(stats.history_len, 3);
    assert_eq!(registry.get_all_states().len(), 10);
}

#[test]
fn history_is_bounded() {
    let clock = ManualClock::new(0);
    let registry = KillSwitchRegistry::new(
        KillSwitchConfig {
            history_capacity: 4,
        },
        true,
        &EnvironmentControls::default(),
        Arc::new(clock),
        Arc::new(MemoryAuditSink::default()),
    );
    for _ in 0 .. 5 {
        assert!(registry.toggle(Subsystem::Search, SwitchSource::Api, "flap", None));
    }
    assert_eq!(registry.get_event_history(100).len(), 4);
    assert_eq!(registry.get_stats().history_len, 4);
}
