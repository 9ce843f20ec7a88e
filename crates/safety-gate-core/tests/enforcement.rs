// crates/safety-gate-core/tests/enforcement.rs
// ============================================================================
// Module: Enforcement Hook Tests
// Description: End-to-end hook decisions over a wired control plane.
// Purpose: Ensure hooks compose the components in order and fail closed.
// Dependencies: safety-gate-core
// ============================================================================
//! ## Overview
//! Builds a [`SafetyControlPlane`] per case and drives each hook through the
//! emergency stop, kill switch, cost guard, and readiness gates.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::float_cmp,
    reason = "Test-only panic-based assertions and exact fixture comparisons are permitted."
)]

use std::collections::BTreeSet;
use std::sync::Arc;

use safety_gate_core::AiCallContext;
use safety_gate_core::BulkChangeContext;
use safety_gate_core::CheckError;
use safety_gate_core::CheckId;
use safety_gate_core::CheckOutcome;
use safety_gate_core::ControlPlaneSettings;
use safety_gate_core::EnforcementHook;
use safety_gate_core::EnvironmentControls;
use safety_gate_core::Feature;
use safety_gate_core::FeatureFlags;
use safety_gate_core::JobContext;
use safety_gate_core::ManualClock;
use safety_gate_core::MemoryAuditSink;
use safety_gate_core::ProviderId;
use safety_gate_core::PublishContext;
use safety_gate_core::ReadinessCheck;
use safety_gate_core::ReadinessDecisionKind;
use safety_gate_core::RegenerationContext;
use safety_gate_core::RolloutContext;
use safety_gate_core::SafetyControlPlane;
use safety_gate_core::Subsystem;
use safety_gate_core::SwitchSource;
use safety_gate_core::UsageDetails;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Check that always warns.
struct WarningCheck;

impl ReadinessCheck for WarningCheck {
    fn id(&self) -> CheckId {
        CheckId::new("error_rate")
    }

    fn name(&self) -> String {
        "Error rate".to_string()
    }

    fn run(&self) -> Result<CheckOutcome, CheckError> {
        Ok(CheckOutcome::warn("error rate elevated"))
    }
}

/// Check that always fails.
struct FailingCheck;

impl ReadinessCheck for FailingCheck {
    fn id(&self) -> CheckId {
        CheckId::new("database")
    }

    fn name(&self) -> String {
        "Database".to_string()
    }

    fn run(&self) -> Result<CheckOutcome, CheckError> {
        Ok(CheckOutcome::fail("primary unreachable"))
    }
}

fn plane(flags: FeatureFlags, environment: EnvironmentControls) -> (SafetyControlPlane, Arc<MemoryAuditSink>) {
    let audit = Arc::new(MemoryAuditSink::default());
    let settings = ControlPlaneSettings {
        flags,
        environment,
        ..ControlPlaneSettings::default()
    };
    let plane = SafetyControlPlane::new(settings, Arc::new(ManualClock::new(50_000)), audit.clone());
    (plane, audit)
}

fn enabled_plane() -> (SafetyControlPlane, Arc<MemoryAuditSink>) {
    plane(FeatureFlags::all_enabled(), EnvironmentControls::default())
}

fn publish() -> PublishContext {
    PublishContext {
        content_id: "article-7".to_string(),
        actor: Some("editor".to_string()),
    }
}

fn bulk(item_count: u64) -> BulkChangeContext {
    BulkChangeContext {
        item_count,
        operation: "retag".to_string(),
    }
}

fn rollout() -> RolloutContext {
    RolloutContext {
        feature_name: "new_search".to_string(),
        percentage: 25,
    }
}

// ============================================================================
// SECTION: Global Gates
// ============================================================================

#[test]
fn disabled_enforcement_allows_everything() {
    let (plane, _audit) = plane(FeatureFlags::default(), EnvironmentControls::default());
    let hooks = plane.enforcement();
    let decision = hooks.before_bulk_change(&bulk(100_000));
    assert!(decision.allowed);
    assert_eq!(decision.reason, "enforcement disabled");
}

#[test]
fn emergency_stop_blocks_every_hook() {
    let (plane, _audit) = enabled_plane();
    assert!(plane.emergency_stop().activate("oncall", "incident"));
    let hooks = plane.enforcement();

    let decisions = [
        hooks.before_publish(&publish()),
        hooks.before_job_execution(&JobContext {
            job_type: "sitemap".to_string(),
        }),
        hooks.before_ai_call(&AiCallContext {
            feature: Feature::Chat,
            estimated_cost_usd: 0.01,
            provider: None,
        }),
        hooks.before_regeneration(&RegenerationContext {
            content_id: "article-7".to_string(),
        }),
        hooks.before_bulk_change(&bulk(1)),
        hooks.before_rollout(&rollout()),
    ];
    for decision in decisions {
        assert!(!decision.allowed, "{} should be blocked", decision.hook);
        assert!(decision.reason.contains("Emergency stop"));
    }
}

#[test]
fn startup_emergency_stop_is_honored() {
    let environment = EnvironmentControls {
        killed: BTreeSet::new(),
        emergency_stop: true,
    };
    let (plane, _audit) = plane(FeatureFlags::all_enabled(), environment);
    assert!(!plane.enforcement().before_publish(&publish()).allowed);
    assert!(plane.emergency_stop().deactivate("oncall"));
    assert!(plane.enforcement().before_publish(&publish()).allowed);
}

// ============================================================================
// SECTION: Component Gates
// ============================================================================

#[test]
fn kill_switch_reason_is_surfaced() {
    let (plane, _audit) = enabled_plane();
    assert!(plane.kill_switches().enable(
        Subsystem::Publishing,
        SwitchSource::Api,
        "CMS migration",
        Some("ops"),
        None
    ));
    let decision = plane.enforcement().before_publish(&publish());
    assert!(!decision.allowed);
    assert_eq!(decision.reason, "Kill switch active for publishing: CMS migration");
    assert_eq!(decision.readiness, None);
}

#[test]
fn env_killed_jobs_block_job_execution() {
    let environment = EnvironmentControls {
        killed: [Subsystem::Jobs].into_iter().collect(),
        emergency_stop: false,
    };
    let (plane, _audit) = plane(FeatureFlags::all_enabled(), environment);
    let decision = plane.enforcement().before_job_execution(&JobContext {
        job_type: "sitemap".to_string(),
    });
    assert!(!decision.allowed);
    assert!(decision.reason.starts_with("Kill switch active for jobs"));
}

#[test]
fn feature_kill_switch_blocks_ai_call() {
    let (plane, _audit) = enabled_plane();
    assert!(plane.kill_switches().enable(Subsystem::Chat, SwitchSource::Api, "abuse spike", None, None));
    let hooks = plane.enforcement();
    let chat = hooks.before_ai_call(&AiCallContext {
        feature: Feature::Chat,
        estimated_cost_usd: 0.01,
        provider: None,
    });
    assert!(!chat.allowed);
    let search = hooks.before_ai_call(&AiCallContext {
        feature: Feature::Search,
        estimated_cost_usd: 0.01,
        provider: None,
    });
    assert!(search.allowed);
}

#[test]
fn exhausted_budget_blocks_ai_call() {
    let (plane, _audit) = enabled_plane();
    plane.cost_guard().record_usage(Feature::Aeo, 10.0, UsageDetails::default()).unwrap();
    let decision = plane.enforcement().before_ai_call(&AiCallContext {
        feature: Feature::Aeo,
        estimated_cost_usd: 1.0,
        provider: None,
    });
    assert!(!decision.allowed);
    assert!(decision.reason.starts_with("Cost guard blocked"));
}

#[test]
fn invalid_cost_estimate_blocks_ai_call() {
    let (plane, _audit) = enabled_plane();
    let decision = plane.enforcement().before_ai_call(&AiCallContext {
        feature: Feature::Translation,
        estimated_cost_usd: f64::NAN,
        provider: None,
    });
    assert!(!decision.allowed);
}

#[test]
fn bulk_change_over_limit_is_blocked() {
    let (plane, _audit) = enabled_plane();
    let hooks = plane.enforcement();
    let over = hooks.before_bulk_change(&bulk(10_001));
    assert!(!over.allowed);
    assert_eq!(over.reason, "Bulk change of 10001 items exceeds limit of 10000");
    assert!(hooks.before_bulk_change(&bulk(10_000)).allowed);
}

// ============================================================================
// SECTION: Readiness Gate
// ============================================================================

#[test]
fn readiness_block_stops_publish() {
    let (plane, _audit) = enabled_plane();
    plane.readiness().register_check(Arc::new(FailingCheck));
    let decision = plane.enforcement().before_publish(&publish());
    assert!(!decision.allowed);
    assert_eq!(decision.readiness, Some(ReadinessDecisionKind::Block));
    assert!(decision.reason.contains("Database"));
}

#[test]
fn readiness_warn_requires_active_approval() {
    let (plane, _audit) = enabled_plane();
    plane.readiness().register_check(Arc::new(WarningCheck));
    let hooks = plane.enforcement();

    let pending = hooks.before_rollout(&rollout());
    assert!(!pending.allowed);
    assert_eq!(pending.readiness, Some(ReadinessDecisionKind::Warn));
    assert!(pending.reason.ends_with("requires approval"));

    plane.readiness().create_approval("vp-eng", "accepting elevated errors").unwrap();
    let approved = hooks.before_rollout(&rollout());
    assert!(approved.allowed);
    assert!(approved.reason.contains("approved by vp-eng"));
}

#[test]
fn readiness_override_unblocks_publish() {
    let (plane, _audit) = enabled_plane();
    plane.readiness().register_check(Arc::new(FailingCheck));
    plane
        .readiness()
        .create_override("cto", ReadinessDecisionKind::CanGoLive, "replica serving reads")
        .unwrap();
    let decision = plane.enforcement().before_publish(&publish());
    assert!(decision.allowed);
    assert_eq!(decision.readiness, Some(ReadinessDecisionKind::CanGoLive));
}

#[test]
fn block_override_applies_with_readiness_flag_off() {
    let flags = FeatureFlags {
        readiness: false,
        ..FeatureFlags::all_enabled()
    };
    let (plane, _audit) = plane(flags, EnvironmentControls::default());
    let hooks = plane.enforcement();
    assert!(hooks.before_publish(&publish()).allowed);

    plane
        .readiness()
        .create_override("ops", ReadinessDecisionKind::Block, "release freeze")
        .unwrap();
    let blocked = hooks.before_publish(&publish());
    assert!(!blocked.allowed);
    assert_eq!(blocked.readiness, Some(ReadinessDecisionKind::Block));
    assert!(blocked.reason.contains("release freeze"));
    assert!(!hooks.before_bulk_change(&bulk(5)).allowed);
    assert!(!hooks.before_rollout(&rollout()).allowed);

    assert!(plane.readiness().clear_override());
    assert!(hooks.before_publish(&publish()).allowed);
}

#[test]
fn regeneration_skips_readiness() {
    let (plane, _audit) = enabled_plane();
    plane.readiness().register_check(Arc::new(FailingCheck));
    let decision = plane.enforcement().before_regeneration(&RegenerationContext {
        content_id: "article-7".to_string(),
    });
    assert!(decision.allowed);
    assert_eq!(decision.readiness, None);
}

// ============================================================================
// SECTION: Log and Stats
// ============================================================================

#[test]
fn log_and_stats_track_decisions() {
    let (plane, audit) = enabled_plane();
    let hooks = plane.enforcement();
    assert!(hooks.before_publish(&publish()).allowed);
    assert!(!hooks.before_bulk_change(&bulk(20_000)).allowed);
    assert!(hooks.before_bulk_change(&bulk(5)).allowed);

    let log = hooks.get_enforcement_log(10);
    assert_eq!(log.len(), 3);
    assert_eq!(log[0].hook, EnforcementHook::BeforeBulkChange);
    assert!(log[0].allowed);
    assert_eq!(log[2].actor.as_deref(), Some("editor"));
    assert_eq!(log[2].subject, "article-7");
    assert_eq!(log[2].timestamp_ms, 50_000);

    let stats = hooks.get_enforcement_stats();
    assert!(stats.enabled);
    assert_eq!(stats.total, 3);
    assert_eq!(stats.allowed, 2);
    assert_eq!(stats.blocked, 1);
    assert_eq!(stats.by_hook[&EnforcementHook::BeforeBulkChange].blocked, 1);
    assert_eq!(stats.by_hook[&EnforcementHook::BeforePublish].allowed, 1);
    assert!((stats.block_rate - 1.0 / 3.0).abs() < 1e-9);

    let events = audit.events_for("enforcement");
    assert_eq!(events.len(), 3);
    assert_eq!(events[1].allowed, Some(false));
}

#[test]
fn ai_call_log_records_intended_provider() {
    let (plane, audit) = enabled_plane();
    let hooks = plane.enforcement();
    let decision = hooks.before_ai_call(&AiCallContext {
        feature: Feature::Search,
        estimated_cost_usd: 0.02,
        provider: Some(ProviderId::new("anthropic")),
    });
    assert!(decision.allowed);
    assert!(hooks.before_job_execution(&JobContext {
        job_type: "sitemap".to_string(),
    })
    .allowed);

    let log = hooks.get_enforcement_log(10);
    assert_eq!(log[1].provider, Some(ProviderId::new("anthropic")));
    assert_eq!(log[0].provider, None);

    let events = audit.events_for("enforcement");
    assert_eq!(events[0].details["provider"], "anthropic");
    assert!(events[1].details["provider"].is_null());
}

#[test]
fn empty_stats_have_zero_block_rate() {
    let (plane, _audit) = enabled_plane();
    let stats = plane.enforcement().get_enforcement_stats();
    assert_eq!(stats.total, 0);
    assert_eq!(stats.block_rate, 0.0);
    assert!(plane.enforcement().get_enforcement_log(10).is_empty());
}
