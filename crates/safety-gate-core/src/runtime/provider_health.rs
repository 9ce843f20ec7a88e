// crates/safety-gate-core/src/runtime/provider_health.rs
// ============================================================================
// Module: Provider Health Monitor
// Description: Per-provider health state machine, failover, and throttling.
// Purpose: Route AI calls away from failing providers and shed load under stress.
// Dependencies: crate::{core, interfaces}, serde, serde_json
// ============================================================================

//! ## Overview
//! Each configured provider keeps a rolling window of recent outcomes. Once
//! the window holds `min_samples` outcomes, its failure rate drives the state:
//!
//! - `healthy -> degraded` at `degraded_error_rate`,
//! - `healthy|degraded -> disabled` (`disabled_by = auto`) at `critical_error_rate`,
//! - `degraded -> healthy` when the rate falls back below `degraded_error_rate`.
//!
//! A disabled provider never recovers on its own, whether it was disabled
//! automatically or by an operator; only [`ProviderHealthMonitor::enable_provider`]
//! returns it to `healthy`. Timeouts count as failures.
//!
//! When every provider is disabled, [`ProviderHealthMonitor::get_current_provider`]
//! returns `None` and the concurrency tier is `paused`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

use crate::core::history::BoundedLog;
use crate::core::identifiers::IdentifierError;
use crate::core::identifiers::ProviderId;
use crate::interfaces::AuditSink;
use crate::interfaces::Clock;
use crate::interfaces::SafetyAuditEvent;

/// Audit component label.
const COMPONENT: &str = "provider_health";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Provider health monitor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderHealthConfig {
    /// Preferred provider.
    pub primary: ProviderId,
    /// Failover candidates in priority order.
    pub failover: Vec<ProviderId>,
    /// Window failure rate that marks a provider degraded.
    pub degraded_error_rate: f64,
    /// Window failure rate that disables a provider.
    pub critical_error_rate: f64,
    /// Outcomes required before rates drive transitions.
    pub min_samples: usize,
    /// Rolling window length.
    pub window_size: usize,
    /// Maximum retained provider actions.
    pub action_log_capacity: usize,
    /// Parallelism granted when every provider is healthy.
    pub max_concurrency: u32,
}

impl Default for ProviderHealthConfig {
    fn default() -> Self {
        Self {
            primary: ProviderId::new("openai"),
            failover: vec![ProviderId::new("anthropic"), ProviderId::new("gemini")],
            degraded_error_rate: 0.2,
            critical_error_rate: 0.5,
            min_samples: 10,
            window_size: 50,
            action_log_capacity: 1_000,
            max_concurrency: 10,
        }
    }
}

impl ProviderHealthConfig {
    /// Returns primary followed by failover candidates, without duplicates.
    #[must_use]
    pub fn priority_order(&self) -> Vec<ProviderId> {
        let mut order = vec![self.primary.clone()];
        for provider in &self.failover {
            if !order.contains(provider) {
                order.push(provider.clone());
            }
        }
        order
    }
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Health state of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderState {
    /// Serving normally.
    Healthy,
    /// Elevated failure rate; still selectable.
    Degraded,
    /// Not selectable until explicitly enabled.
    Disabled,
}

impl ProviderState {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderState {
    type Err = IdentifierError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "healthy" => Ok(Self::Healthy),
            "degraded" => Ok(Self::Degraded),
            "disabled" => Ok(Self::Disabled),
            _ => Err(IdentifierError::unknown("provider state", value)),
        }
    }
}

/// Who disabled a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisabledBy {
    /// Failure rate crossed the critical threshold.
    Auto,
    /// Operator action.
    Manual,
}

impl DisabledBy {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for DisabledBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisabledBy {
    type Err = IdentifierError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            _ => Err(IdentifierError::unknown("disabled by", value)),
        }
    }
}

/// Request counters for a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMetrics {
    /// Lifetime requests since the last enable.
    pub request_count: u64,
    /// Lifetime successes since the last enable.
    pub success_count: u64,
    /// Lifetime failures (timeouts included) since the last enable.
    pub failure_count: u64,
    /// Lifetime timeouts since the last enable.
    pub timeout_count: u64,
    /// Failure rate over the rolling window.
    pub window_error_rate: f64,
    /// Outcomes currently in the rolling window.
    pub window_samples: usize,
    /// Mean latency over the rolling window.
    pub average_latency_ms: u64,
    /// Time of the most recent request (unix ms).
    pub last_request_at_ms: Option<u64>,
}

impl ProviderMetrics {
    /// Returns zeroed metrics.
    const fn empty() -> Self {
        Self {
            request_count: 0,
            success_count: 0,
            failure_count: 0,
            timeout_count: 0,
            window_error_rate: 0.0,
            window_samples: 0,
            average_latency_ms: 0,
            last_request_at_ms: None,
        }
    }
}

/// Status projection for one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderStatus {
    /// Provider identifier.
    pub provider: ProviderId,
    /// Current state.
    pub state: ProviderState,
    /// Request counters.
    pub metrics: ProviderMetrics,
    /// Who disabled the provider, when disabled.
    pub disabled_by: Option<DisabledBy>,
    /// Why the provider was disabled.
    pub disabled_reason: Option<String>,
    /// Position in the failover order (0 = primary).
    pub priority: usize,
    /// Time of the last state change (unix ms).
    pub last_state_change_ms: Option<u64>,
}

/// Kind of provider action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderActionKind {
    /// Auto transition to degraded.
    Degraded,
    /// Auto transition back to healthy.
    Recovered,
    /// Auto transition to disabled.
    AutoDisabled,
    /// Operator disabled the provider.
    ManuallyDisabled,
    /// Operator enabled the provider.
    Enabled,
}

impl ProviderActionKind {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Degraded => "degraded",
            Self::Recovered => "recovered",
            Self::AutoDisabled => "auto_disabled",
            Self::ManuallyDisabled => "manually_disabled",
            Self::Enabled => "enabled",
        }
    }
}

/// Provider action log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAction {
    /// Affected provider.
    pub provider: ProviderId,
    /// Action kind.
    pub action: ProviderActionKind,
    /// State before the action.
    pub from: ProviderState,
    /// State after the action.
    pub to: ProviderState,
    /// Reason for the action.
    pub reason: String,
    /// Action time (unix ms).
    pub timestamp_ms: u64,
}

/// Throttle tier derived from provider health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyTier {
    /// Every provider healthy.
    Full,
    /// One provider degraded or disabled.
    Reduced,
    /// Two or more providers degraded or disabled.
    Minimal,
    /// No selectable provider.
    Paused,
}

/// Concurrency guidance for batch callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyLevel {
    /// Throttle tier.
    pub tier: ConcurrencyTier,
    /// Maximum parallel requests callers should issue.
    pub max_parallel: u32,
    /// Providers not in the healthy state.
    pub unhealthy_providers: usize,
}

/// Monitor-wide snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderHealthSnapshot {
    /// Whether failover and throttling are enabled.
    pub failover_enabled: bool,
    /// Provider callers should use, if any.
    pub current_provider: Option<ProviderId>,
    /// Concurrency guidance.
    pub concurrency: ConcurrencyLevel,
    /// Whether non-critical work should run.
    pub should_run_non_critical: bool,
    /// Status per provider in priority order.
    pub providers: Vec<ProviderStatus>,
}

// ============================================================================
// SECTION: Monitor
// ============================================================================

/// One outcome in a rolling window.
#[derive(Debug, Clone, Copy)]
struct Sample {
    /// Whether the request succeeded.
    success: bool,
    /// Observed latency.
    latency_ms: u64,
}

/// Tracked provider state.
struct ProviderEntry {
    /// Status projection.
    status: ProviderStatus,
    /// Rolling outcome window.
    window: VecDeque<Sample>,
}

impl ProviderEntry {
    /// Recomputes window-derived metrics.
    fn refresh_window_metrics(&mut self) {
        let samples = self.window.len();
        let failures = self.window.iter().filter(|sample| !sample.success).count();
        let latency_total: u64 = self.window.iter().map(|sample| sample.latency_ms).sum();
        self.status.metrics.window_samples = samples;
        self.status.metrics.window_error_rate =
            if samples == 0 { 0.0 } else { failures as f64 / samples as f64 };
        let count = u64::try_from(samples).unwrap_or(u64::MAX);
        self.status.metrics.average_latency_ms = latency_total.checked_div(count).unwrap_or(0);
    }
}

/// Lock-protected monitor state.
struct MonitorInner {
    /// Provider state keyed by id.
    entries: BTreeMap<ProviderId, ProviderEntry>,
    /// Failover order, primary first.
    order: Vec<ProviderId>,
    /// Bounded action log.
    actions: BoundedLog<ProviderAction>,
}

impl MonitorInner {
    /// Returns statuses in priority order.
    fn statuses(&self) -> Vec<ProviderStatus> {
        self.order
            .iter()
            .filter_map(|provider| self.entries.get(provider))
            .map(|entry| entry.status.clone())
            .collect()
    }

    /// Applies a state change and records the action.
    fn transition(
        &mut self,
        provider: &ProviderId,
        action: ProviderActionKind,
        to: ProviderState,
        reason: String,
        now_ms: u64,
    ) -> Option<ProviderAction> {
        let entry = self.entries.get_mut(provider)?;
        let from = entry.status.state;
        entry.status.state = to;
        entry.status.last_state_change_ms = Some(now_ms);
        let record = ProviderAction {
            provider: provider.clone(),
            action,
            from,
            to,
            reason,
            timestamp_ms: now_ms,
        };
        self.actions.push(record.clone());
        Some(record)
    }
}

/// Health monitor over the configured AI providers.
pub struct ProviderHealthMonitor {
    /// Failover and throttling flag.
    enabled: bool,
    /// Monitor configuration.
    config: ProviderHealthConfig,
    /// Monitor state.
    inner: Mutex<MonitorInner>,
    /// Injected clock.
    clock: Arc<dyn Clock>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
}

impl ProviderHealthMonitor {
    /// Creates a monitor tracking the configured providers as healthy.
    #[must_use]
    pub fn new(
        config: ProviderHealthConfig,
        enabled: bool,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let order = config.priority_order();
        let entries = order
            .iter()
            .enumerate()
            .map(|(priority, provider)| {
                let entry = ProviderEntry {
                    status: ProviderStatus {
                        provider: provider.clone(),
                        state: ProviderState::Healthy,
                        metrics: ProviderMetrics::empty(),
                        disabled_by: None,
                        disabled_reason: None,
                        priority,
                        last_state_change_ms: None,
                    },
                    window: VecDeque::new(),
                };
                (provider.clone(), entry)
            })
            .collect();
        let inner = MonitorInner {
            entries,
            order,
            actions: BoundedLog::new(config.action_log_capacity),
        };
        Self {
            enabled,
            config,
            inner: Mutex::new(inner),
            clock,
            audit,
        }
    }

    /// Returns whether failover and throttling are enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Records a request outcome. Returns false for unknown providers.
    pub fn record_request(
        &self,
        provider: &ProviderId,
        latency_ms: u64,
        success: bool,
        is_timeout: bool,
    ) -> bool {
        let now_ms = self.clock.now_ms();
        let success = success && !is_timeout;
        let Some(mut inner) = self.lock() else {
            return false;
        };
        let Some(entry) = inner.entries.get_mut(provider) else {
            return false;
        };
        let metrics = &mut entry.status.metrics;
        metrics.request_count = metrics.request_count.saturating_add(1);
        if success {
            metrics.success_count = metrics.success_count.saturating_add(1);
        } else {
            metrics.failure_count = metrics.failure_count.saturating_add(1);
        }
        if is_timeout {
            metrics.timeout_count = metrics.timeout_count.saturating_add(1);
        }
        metrics.last_request_at_ms = Some(now_ms);
        entry.window.push_back(Sample {
            success,
            latency_ms,
        });
        while entry.window.len() > self.config.window_size.max(1) {
            entry.window.pop_front();
        }
        entry.refresh_window_metrics();
        let state = entry.status.state;
        let samples = entry.status.metrics.window_samples;
        let rate = entry.status.metrics.window_error_rate;

        let action = if !self.enabled
            || state == ProviderState::Disabled
            || samples < self.config.min_samples
        {
            None
        } else if rate >= self.config.critical_error_rate {
            let reason = format!("error rate {:.0}% over {samples} requests", rate * 100.0);
            if let Some(entry) = inner.entries.get_mut(provider) {
                entry.status.disabled_by = Some(DisabledBy::Auto);
                entry.status.disabled_reason = Some(reason.clone());
            }
            inner.transition(
                provider,
                ProviderActionKind::AutoDisabled,
                ProviderState::Disabled,
                reason,
                now_ms,
            )
        } else if rate >= self.config.degraded_error_rate && state == ProviderState::Healthy {
            let reason = format!("error rate {:.0}% over {samples} requests", rate * 100.0);
            inner.transition(
                provider,
                ProviderActionKind::Degraded,
                ProviderState::Degraded,
                reason,
                now_ms,
            )
        } else if rate < self.config.degraded_error_rate && state == ProviderState::Degraded {
            let reason = format!("error rate recovered to {:.0}%", rate * 100.0);
            inner.transition(
                provider,
                ProviderActionKind::Recovered,
                ProviderState::Healthy,
                reason,
                now_ms,
            )
        } else {
            None
        };
        drop(inner);
        if let Some(action) = action {
            self.emit(&action, None);
        }
        true
    }

    /// Returns the status of `provider`, or `None` when unknown.
    #[must_use]
    pub fn get_provider_status(&self, provider: &ProviderId) -> Option<ProviderStatus> {
        self.lock()?.entries.get(provider).map(|entry| entry.status.clone())
    }

    /// Returns every provider status in priority order.
    #[must_use]
    pub fn get_provider_statuses(&self) -> Vec<ProviderStatus> {
        self.lock().map(|inner| inner.statuses()).unwrap_or_default()
    }

    /// Disables `provider` until it is explicitly enabled.
    ///
    /// Returns false for unknown providers or an empty reason.
    pub fn disable_provider(&self, provider: &ProviderId, reason: &str) -> bool {
        let reason = reason.trim();
        if reason.is_empty() {
            return false;
        }
        let now_ms = self.clock.now_ms();
        let Some(mut inner) = self.lock() else {
            return false;
        };
        let Some(entry) = inner.entries.get_mut(provider) else {
            return false;
        };
        entry.status.disabled_by = Some(DisabledBy::Manual);
        entry.status.disabled_reason = Some(reason.to_string());
        let action = inner.transition(
            provider,
            ProviderActionKind::ManuallyDisabled,
            ProviderState::Disabled,
            reason.to_string(),
            now_ms,
        );
        drop(inner);
        if let Some(action) = action {
            self.emit(&action, Some("operator"));
        }
        true
    }

    /// Returns `provider` to healthy with a fresh window. Returns false when unknown.
    pub fn enable_provider(&self, provider: &ProviderId) -> bool {
        let now_ms = self.clock.now_ms();
        let Some(mut inner) = self.lock() else {
            return false;
        };
        let Some(entry) = inner.entries.get_mut(provider) else {
            return false;
        };
        entry.status.disabled_by = None;
        entry.status.disabled_reason = None;
        entry.status.metrics = ProviderMetrics::empty();
        entry.window.clear();
        let action = inner.transition(
            provider,
            ProviderActionKind::Enabled,
            ProviderState::Healthy,
            "provider enabled".to_string(),
            now_ms,
        );
        drop(inner);
        if let Some(action) = action {
            self.emit(&action, Some("operator"));
        }
        true
    }

    /// Returns the provider callers should use.
    ///
    /// The primary is returned unless disabled; otherwise the first
    /// non-disabled failover candidate. `None` means every provider is
    /// disabled. The failover flag only gates automatic transitions, so a
    /// manually disabled provider is skipped either way.
    #[must_use]
    pub fn get_current_provider(&self) -> Option<ProviderId> {
        let inner = self.lock()?;
        inner
            .order
            .iter()
            .find(|provider| {
                inner
                    .entries
                    .get(*provider)
                    .is_some_and(|entry| entry.status.state != ProviderState::Disabled)
            })
            .cloned()
    }

    /// Returns true when non-critical AI work should run.
    #[must_use]
    pub fn should_run_non_critical(&self) -> bool {
        self.get_concurrency_level().tier == ConcurrencyTier::Full
    }

    /// Derives the concurrency tier from provider health.
    ///
    /// With failover off throttling is bypassed until no provider is usable.
    #[must_use]
    pub fn get_concurrency_level(&self) -> ConcurrencyLevel {
        let max = self.config.max_concurrency.max(1);
        let statuses = self.get_provider_statuses();
        let unhealthy =
            statuses.iter().filter(|status| status.state != ProviderState::Healthy).count();
        let usable =
            statuses.iter().filter(|status| status.state != ProviderState::Disabled).count();
        let (tier, max_parallel) = match (usable, unhealthy) {
            (0, _) => (ConcurrencyTier::Paused, 0),
            _ if !self.enabled => (ConcurrencyTier::Full, max),
            (_, 0) => (ConcurrencyTier::Full, max),
            (_, 1) => (ConcurrencyTier::Reduced, (max / 2).max(1)),
            _ => (ConcurrencyTier::Minimal, 1),
        };
        ConcurrencyLevel {
            tier,
            max_parallel,
            unhealthy_providers: unhealthy,
        }
    }

    /// Returns a monitor-wide snapshot.
    #[must_use]
    pub fn get_state(&self) -> ProviderHealthSnapshot {
        let concurrency = self.get_concurrency_level();
        ProviderHealthSnapshot {
            failover_enabled: self.enabled,
            current_provider: self.get_current_provider(),
            concurrency,
            should_run_non_critical: concurrency.tier == ConcurrencyTier::Full,
            providers: self.get_provider_statuses(),
        }
    }

    /// Returns up to `limit` provider actions, newest first.
    #[must_use]
    pub fn get_recent_actions(&self, limit: usize) -> Vec<ProviderAction> {
        self.lock().map(|inner| inner.actions.recent(limit)).unwrap_or_default()
    }

    /// Locks monitor state; `None` when poisoned.
    fn lock(&self) -> Option<MutexGuard<'_, MonitorInner>> {
        self.inner.lock().ok()
    }

    /// Forwards an action to the audit sink.
    fn emit(&self, action: &ProviderAction, actor: Option<&str>) {
        let event = SafetyAuditEvent::new(
            COMPONENT,
            action.action.as_str(),
            action.provider.as_str(),
            action.reason.clone(),
            action.timestamp_ms,
        )
        .with_actor(actor)
        .with_details(json!({
            "from": action.from,
            "to": action.to,
        }));
        self.audit.record(&event);
    }
}
