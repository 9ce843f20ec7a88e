// crates/safety-gate-core/src/runtime/cost_guard.rs
// ============================================================================
// Module: Cost Guard Ledger
// Description: Per-feature daily/monthly spend tracking with budget ceilings.
// Purpose: Block or flag AI spend before a feature exhausts its budget.
// Dependencies: crate::{core, interfaces}, serde, serde_json, time
// ============================================================================

//! ## Overview
//! The ledger keeps one [`FeatureUsage`] per [`Feature`]. Usage percent is the
//! larger of the daily and monthly ratios. At or above the hard ceiling the
//! feature is degraded and calls are denied; at or above the warning
//! threshold calls are still allowed but flagged. An estimate that would
//! overshoot a remaining budget is flagged with `would_exceed`, never denied
//! on its own.
//!
//! `degraded` is recomputed on every mutation (usage, limits, resets), so
//! raising limits clears it immediately. Counters never reset on their own:
//! schedulers call [`CostGuardLedger::reset_daily`],
//! [`CostGuardLedger::reset_monthly`], or [`CostGuardLedger::roll_calendar`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use time::Date;
use time::OffsetDateTime;

use crate::core::history::BoundedLog;
use crate::core::identifiers::Feature;
use crate::core::identifiers::ProviderId;
use crate::interfaces::AuditSink;
use crate::interfaces::Clock;
use crate::interfaces::SafetyAuditEvent;

/// Audit component label.
const COMPONENT: &str = "cost_guard";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Budget override for one feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureLimitConfig {
    /// Feature whose limits are overridden.
    pub feature: Feature,
    /// Daily budget in USD.
    pub daily_limit_usd: f64,
    /// Monthly budget in USD.
    pub monthly_limit_usd: f64,
}

/// Cost guard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostGuardConfig {
    /// Usage percent at which calls are flagged.
    pub warning_threshold_percent: f64,
    /// Usage percent at which calls are denied and the feature degrades.
    pub hard_ceiling_percent: f64,
    /// Maximum retained usage events.
    pub history_capacity: usize,
    /// Per-feature limit overrides.
    pub features: Vec<FeatureLimitConfig>,
}

impl Default for CostGuardConfig {
    fn default() -> Self {
        Self {
            warning_threshold_percent: 80.0,
            hard_ceiling_percent: 100.0,
            history_capacity: 1_000,
            features: Vec::new(),
        }
    }
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Cost guard errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CostGuardError {
    /// A cost or estimate was negative or not finite.
    #[error("invalid cost amount: {0}")]
    InvalidAmount(String),
    /// Limits were non-positive, not finite, or inconsistent.
    #[error("invalid feature limits: {0}")]
    InvalidLimits(String),
    /// Ledger state could not be read.
    #[error("cost guard unavailable: {0}")]
    Unavailable(String),
}

/// Spend counters and limits for one feature.
///
/// # Invariants
/// - `degraded` is true iff `usage_percent() >= hard_ceiling_percent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureUsage {
    /// Tracked feature.
    pub feature: Feature,
    /// Spend since the last daily reset.
    pub daily_used_usd: f64,
    /// Daily budget.
    pub daily_limit_usd: f64,
    /// Spend since the last monthly reset.
    pub monthly_used_usd: f64,
    /// Monthly budget.
    pub monthly_limit_usd: f64,
    /// True once the hard ceiling is reached.
    pub degraded: bool,
    /// Recorded requests since the last monthly reset.
    pub request_count: u64,
    /// Time of the most recent recorded usage (unix ms).
    pub last_used_at_ms: Option<u64>,
}

impl FeatureUsage {
    /// Creates zeroed usage with the given limits.
    fn new(feature: Feature, daily_limit_usd: f64, monthly_limit_usd: f64) -> Self {
        Self {
            feature,
            daily_used_usd: 0.0,
            daily_limit_usd,
            monthly_used_usd: 0.0,
            monthly_limit_usd,
            degraded: false,
            request_count: 0,
            last_used_at_ms: None,
        }
    }

    /// Returns `max(daily/daily_limit, monthly/monthly_limit) * 100`.
    #[must_use]
    pub fn usage_percent(&self) -> f64 {
        let daily = self.daily_used_usd / self.daily_limit_usd;
        let monthly = self.monthly_used_usd / self.monthly_limit_usd;
        daily.max(monthly) * 100.0
    }

    /// Returns the unspent daily budget, never negative.
    #[must_use]
    pub fn remaining_daily_usd(&self) -> f64 {
        (self.daily_limit_usd - self.daily_used_usd).max(0.0)
    }

    /// Returns the unspent monthly budget, never negative.
    #[must_use]
    pub fn remaining_monthly_usd(&self) -> f64 {
        (self.monthly_limit_usd - self.monthly_used_usd).max(0.0)
    }
}

/// Outcome of a pre-call budget check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCheckResult {
    /// Checked feature.
    pub feature: Feature,
    /// Whether the call may proceed.
    pub allowed: bool,
    /// Whether the feature is at or above its hard ceiling.
    pub degraded: bool,
    /// Whether usage is at or above the warning threshold.
    pub warning: bool,
    /// Whether spending the estimate would overshoot a remaining budget.
    pub would_exceed: bool,
    /// Current usage percent.
    pub usage_percent: f64,
    /// Unspent daily budget (infinite when bypassed).
    pub remaining_daily_usd: f64,
    /// Unspent monthly budget (infinite when bypassed).
    pub remaining_monthly_usd: f64,
    /// Operator-facing reason.
    pub reason: String,
}

/// Optional metadata attached to a usage record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageDetails {
    /// Provider that served the call.
    pub provider: Option<ProviderId>,
    /// Model name.
    pub model: Option<String>,
    /// Prompt tokens.
    pub input_tokens: u64,
    /// Completion tokens.
    pub output_tokens: u64,
}

impl UsageDetails {
    /// Builds details carrying only token counts.
    #[must_use]
    pub const fn tokens(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            provider: None,
            model: None,
            input_tokens,
            output_tokens,
        }
    }
}

/// Retained usage event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    /// Charged feature.
    pub feature: Feature,
    /// Actual cost in USD.
    pub cost_usd: f64,
    /// Call metadata.
    pub details: UsageDetails,
    /// Record time (unix ms).
    pub timestamp_ms: u64,
}

/// Spend for one feature in a [`TotalSpending`] report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpend {
    /// Spend since the last daily reset.
    pub daily_usd: f64,
    /// Spend since the last monthly reset.
    pub monthly_usd: f64,
}

/// Ledger-wide spend totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalSpending {
    /// Sum of daily spend.
    pub daily_usd: f64,
    /// Sum of monthly spend.
    pub monthly_usd: f64,
    /// Per-feature breakdown.
    pub by_feature: BTreeMap<Feature, FeatureSpend>,
}

/// Which counters [`CostGuardLedger::roll_calendar`] reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRollover {
    /// Daily counters were reset.
    pub daily_reset: bool,
    /// Monthly counters were reset.
    pub monthly_reset: bool,
}

// ============================================================================
// SECTION: Ledger
// ============================================================================

/// Lock-protected ledger state.
struct LedgerInner {
    /// Usage per feature.
    usage: BTreeMap<Feature, FeatureUsage>,
    /// Bounded usage history.
    history: BoundedLog<UsageEvent>,
    /// Start of the current daily period (unix ms).
    daily_period_start_ms: u64,
    /// Start of the current monthly period (unix ms).
    monthly_period_start_ms: u64,
}

/// Per-feature spend ledger.
pub struct CostGuardLedger {
    /// Enforcement flag; off means `check_cost` always allows.
    enabled: bool,
    /// Warning threshold percent.
    warning_threshold_percent: f64,
    /// Hard ceiling percent.
    hard_ceiling_percent: f64,
    /// Ledger state.
    inner: Mutex<LedgerInner>,
    /// Injected clock.
    clock: Arc<dyn Clock>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
}

impl CostGuardLedger {
    /// Creates a ledger with default limits overlaid by configured overrides.
    #[must_use]
    pub fn new(
        config: &CostGuardConfig,
        enabled: bool,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let mut usage: BTreeMap<Feature, FeatureUsage> = Feature::ALL
            .into_iter()
            .map(|feature| {
                let (daily, monthly) = feature.default_limits_usd();
                (feature, FeatureUsage::new(feature, daily, monthly))
            })
            .collect();
        for limit in &config.features {
            if validate_limits(limit.daily_limit_usd, limit.monthly_limit_usd).is_ok() {
                usage.insert(
                    limit.feature,
                    FeatureUsage::new(limit.feature, limit.daily_limit_usd, limit.monthly_limit_usd),
                );
            }
        }
        let now_ms = clock.now_ms();
        Self {
            enabled,
            warning_threshold_percent: config.warning_threshold_percent,
            hard_ceiling_percent: config.hard_ceiling_percent,
            inner: Mutex::new(LedgerInner {
                usage,
                history: BoundedLog::new(config.history_capacity),
                daily_period_start_ms: now_ms,
                monthly_period_start_ms: now_ms,
            }),
            clock,
            audit,
        }
    }

    /// Returns whether cost enforcement is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Checks whether `feature` may spend `estimated_cost_usd`.
    ///
    /// # Errors
    ///
    /// Returns [`CostGuardError::InvalidAmount`] for negative or non-finite
    /// estimates and [`CostGuardError::Unavailable`] when ledger state is poisoned.
    pub fn check_cost(
        &self,
        feature: Feature,
        estimated_cost_usd: f64,
    ) -> Result<CostCheckResult, CostGuardError> {
        if !self.enabled {
            return Ok(CostCheckResult {
                feature,
                allowed: true,
                degraded: false,
                warning: false,
                would_exceed: false,
                usage_percent: 0.0,
                remaining_daily_usd: f64::INFINITY,
                remaining_monthly_usd: f64::INFINITY,
                reason: "cost guard disabled".to_string(),
            });
        }
        validate_amount(estimated_cost_usd)?;
        let usage = self.lock()?.usage.get(&feature).cloned().ok_or_else(|| {
            CostGuardError::Unavailable(format!("no ledger entry for {feature}"))
        })?;
        let usage_percent = usage.usage_percent();
        let degraded = usage_percent >= self.hard_ceiling_percent;
        let warning = usage_percent >= self.warning_threshold_percent;
        let exceeds_daily = usage.daily_used_usd + estimated_cost_usd > usage.daily_limit_usd;
        let exceeds_monthly = usage.monthly_used_usd + estimated_cost_usd > usage.monthly_limit_usd;
        let reason = if degraded {
            format!("{feature} budget limit exceeded ({usage_percent:.1}% of limit)")
        } else if exceeds_daily {
            format!("{feature} call would exceed daily budget ({usage_percent:.1}% of limit)")
        } else if exceeds_monthly {
            format!("{feature} call would exceed monthly budget ({usage_percent:.1}% of limit)")
        } else if warning {
            format!("{feature} approaching budget limit ({usage_percent:.1}% of limit)")
        } else {
            "within budget".to_string()
        };
        Ok(CostCheckResult {
            feature,
            allowed: !degraded,
            degraded,
            warning,
            would_exceed: exceeds_daily || exceeds_monthly,
            usage_percent,
            remaining_daily_usd: usage.remaining_daily_usd(),
            remaining_monthly_usd: usage.remaining_monthly_usd(),
            reason,
        })
    }

    /// Records actual spend for `feature` and returns the updated usage.
    ///
    /// # Errors
    ///
    /// Returns [`CostGuardError::InvalidAmount`] for negative or non-finite
    /// costs and [`CostGuardError::Unavailable`] when ledger state is poisoned.
    pub fn record_usage(
        &self,
        feature: Feature,
        cost_usd: f64,
        details: UsageDetails,
    ) -> Result<FeatureUsage, CostGuardError> {
        validate_amount(cost_usd)?;
        let now_ms = self.clock.now_ms();
        let mut inner = self.lock()?;
        let Some(usage) = inner.usage.get_mut(&feature) else {
            return Err(CostGuardError::Unavailable(format!("no ledger entry for {feature}")));
        };
        let was_warning = usage.usage_percent() >= self.warning_threshold_percent;
        usage.daily_used_usd += cost_usd;
        usage.monthly_used_usd += cost_usd;
        usage.request_count = usage.request_count.saturating_add(1);
        usage.last_used_at_ms = Some(now_ms);
        let transition = refresh_degraded(usage, self.hard_ceiling_percent);
        let crossed_warning =
            !was_warning && usage.usage_percent() >= self.warning_threshold_percent;
        let snapshot = usage.clone();
        inner.history.push(UsageEvent {
            feature,
            cost_usd,
            details,
            timestamp_ms: now_ms,
        });
        drop(inner);
        if crossed_warning && !snapshot.degraded {
            self.emit("warning", &snapshot, "usage crossed warning threshold", now_ms);
        }
        if let Some(degraded) = transition {
            self.emit_transition(&snapshot, degraded, now_ms);
        }
        Ok(snapshot)
    }

    /// Replaces the budget for `feature` and recomputes `degraded`.
    ///
    /// # Errors
    ///
    /// Returns [`CostGuardError::InvalidLimits`] for non-positive, non-finite,
    /// or inverted limits and [`CostGuardError::Unavailable`] when poisoned.
    pub fn set_feature_limits(
        &self,
        feature: Feature,
        daily_limit_usd: f64,
        monthly_limit_usd: f64,
    ) -> Result<FeatureUsage, CostGuardError> {
        validate_limits(daily_limit_usd, monthly_limit_usd)?;
        let now_ms = self.clock.now_ms();
        let mut inner = self.lock()?;
        let usage = inner
            .usage
            .entry(feature)
            .or_insert_with(|| FeatureUsage::new(feature, daily_limit_usd, monthly_limit_usd));
        usage.daily_limit_usd = daily_limit_usd;
        usage.monthly_limit_usd = monthly_limit_usd;
        let transition = refresh_degraded(usage, self.hard_ceiling_percent);
        let snapshot = usage.clone();
        drop(inner);
        self.emit("limits_updated", &snapshot, "feature limits updated", now_ms);
        if let Some(degraded) = transition {
            self.emit_transition(&snapshot, degraded, now_ms);
        }
        Ok(snapshot)
    }

    /// Returns usage for `feature`, or `None` when ledger state is unavailable.
    #[must_use]
    pub fn get_feature_usage(&self, feature: Feature) -> Option<FeatureUsage> {
        self.lock().ok()?.usage.get(&feature).cloned()
    }

    /// Returns usage for every feature.
    #[must_use]
    pub fn get_all_usage(&self) -> Vec<FeatureUsage> {
        self.lock().map(|inner| inner.usage.values().cloned().collect()).unwrap_or_default()
    }

    /// Returns ledger-wide spend totals.
    #[must_use]
    pub fn get_total_spending(&self) -> TotalSpending {
        let usage = self.get_all_usage();
        let by_feature: BTreeMap<Feature, FeatureSpend> = usage
            .iter()
            .map(|entry| {
                (
                    entry.feature,
                    FeatureSpend {
                        daily_usd: entry.daily_used_usd,
                        monthly_usd: entry.monthly_used_usd,
                    },
                )
            })
            .collect();
        TotalSpending {
            daily_usd: usage.iter().map(|entry| entry.daily_used_usd).sum(),
            monthly_usd: usage.iter().map(|entry| entry.monthly_used_usd).sum(),
            by_feature,
        }
    }

    /// Zeroes daily counters for every feature; monthly counters are kept.
    ///
    /// # Errors
    ///
    /// Returns [`CostGuardError::Unavailable`] when ledger state is poisoned;
    /// a `reset_failed` audit event is emitted instead of `reset_daily`.
    pub fn reset_daily(&self) -> Result<(), CostGuardError> {
        self.reset("reset_daily", "daily counters reset", false)
    }

    /// Zeroes daily and monthly counters for every feature.
    ///
    /// # Errors
    ///
    /// Returns [`CostGuardError::Unavailable`] when ledger state is poisoned;
    /// a `reset_failed` audit event is emitted instead of `reset_monthly`.
    pub fn reset_monthly(&self) -> Result<(), CostGuardError> {
        self.reset("reset_monthly", "daily and monthly counters reset", true)
    }

    /// Resets counters whose UTC calendar period has ended since the last reset.
    ///
    /// Intended for a scheduler tick; nothing calls it implicitly. A reset that
    /// cannot be applied reports `false` for its period.
    pub fn roll_calendar(&self) -> CalendarRollover {
        let now_ms = self.clock.now_ms();
        let Ok(inner) = self.lock() else {
            return CalendarRollover::default();
        };
        let daily_start = inner.daily_period_start_ms;
        let monthly_start = inner.monthly_period_start_ms;
        drop(inner);
        let (Some(today), Some(daily_day), Some(monthly_day)) =
            (utc_date(now_ms), utc_date(daily_start), utc_date(monthly_start))
        else {
            return CalendarRollover::default();
        };
        let monthly_reset =
            (today.year(), today.month()) != (monthly_day.year(), monthly_day.month());
        let daily_due = monthly_reset || today != daily_day;
        if monthly_reset {
            let applied = self.reset_monthly().is_ok();
            return CalendarRollover {
                daily_reset: applied,
                monthly_reset: applied,
            };
        }
        CalendarRollover {
            daily_reset: daily_due && self.reset_daily().is_ok(),
            monthly_reset: false,
        }
    }

    /// Returns true when `feature` is at its hard ceiling. Unavailable state reports degraded.
    #[must_use]
    pub fn is_feature_degraded(&self, feature: Feature) -> bool {
        self.lock()
            .map(|inner| inner.usage.get(&feature).is_some_and(|usage| usage.degraded))
            .unwrap_or(true)
    }

    /// Returns every degraded feature.
    #[must_use]
    pub fn get_degraded_features(&self) -> Vec<Feature> {
        self.get_all_usage()
            .into_iter()
            .filter(|usage| usage.degraded)
            .map(|usage| usage.feature)
            .collect()
    }

    /// Returns up to `limit` usage events, newest first.
    #[must_use]
    pub fn get_usage_history(&self, limit: usize) -> Vec<UsageEvent> {
        self.lock().map(|inner| inner.history.recent(limit)).unwrap_or_default()
    }

    /// Applies a reset and audits it, or audits the failure.
    fn reset(&self, action: &str, reason: &str, monthly: bool) -> Result<(), CostGuardError> {
        let now_ms = self.clock.now_ms();
        let transitions = match self.reset_with(now_ms, monthly) {
            Ok(transitions) => transitions,
            Err(err) => {
                self.audit.record(
                    &SafetyAuditEvent::new(COMPONENT, "reset_failed", "all_features", err.to_string(), now_ms)
                        .with_details(json!({ "requested": action })),
                );
                return Err(err);
            }
        };
        self.audit.record(&SafetyAuditEvent::new(COMPONENT, action, "all_features", reason, now_ms));
        for (snapshot, degraded) in transitions {
            self.emit_transition(&snapshot, degraded, now_ms);
        }
        Ok(())
    }

    /// Applies a reset and returns degraded transitions.
    fn reset_with(&self, now_ms: u64, monthly: bool) -> Result<Vec<(FeatureUsage, bool)>, CostGuardError> {
        let mut inner = self.lock()?;
        inner.daily_period_start_ms = now_ms;
        if monthly {
            inner.monthly_period_start_ms = now_ms;
        }
        let mut transitions = Vec::new();
        for usage in inner.usage.values_mut() {
            usage.daily_used_usd = 0.0;
            if monthly {
                usage.monthly_used_usd = 0.0;
                usage.request_count = 0;
            }
            if let Some(degraded) = refresh_degraded(usage, self.hard_ceiling_percent) {
                transitions.push((usage.clone(), degraded));
            }
        }
        Ok(transitions)
    }

    /// Locks ledger state.
    fn lock(&self) -> Result<MutexGuard<'_, LedgerInner>, CostGuardError> {
        self.inner
            .lock()
            .map_err(|_| CostGuardError::Unavailable("ledger mutex poisoned".to_string()))
    }

    /// Emits a degraded/recovered transition.
    fn emit_transition(&self, usage: &FeatureUsage, degraded: bool, now_ms: u64) {
        if degraded {
            self.emit("degraded", usage, "hard ceiling reached", now_ms);
        } else {
            self.emit("recovered", usage, "usage back below hard ceiling", now_ms);
        }
    }

    /// Emits an audit event for `usage`.
    fn emit(&self, action: &str, usage: &FeatureUsage, reason: &str, now_ms: u64) {
        let event = SafetyAuditEvent::new(COMPONENT, action, usage.feature.as_str(), reason, now_ms)
            .with_details(json!({
                "daily_used_usd": usage.daily_used_usd,
                "daily_limit_usd": usage.daily_limit_usd,
                "monthly_used_usd": usage.monthly_used_usd,
                "monthly_limit_usd": usage.monthly_limit_usd,
                "usage_percent": usage.usage_percent(),
            }));
        self.audit.record(&event);
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Recomputes `degraded`; returns the new value when it changed.
fn refresh_degraded(usage: &mut FeatureUsage, hard_ceiling_percent: f64) -> Option<bool> {
    let degraded = usage.usage_percent() >= hard_ceiling_percent;
    if degraded == usage.degraded {
        return None;
    }
    usage.degraded = degraded;
    Some(degraded)
}

/// Rejects negative or non-finite amounts.
fn validate_amount(amount: f64) -> Result<(), CostGuardError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(CostGuardError::InvalidAmount(format!("{amount} must be finite and >= 0")));
    }
    Ok(())
}

/// Rejects non-positive, non-finite, or inverted limits.
fn validate_limits(daily_limit_usd: f64, monthly_limit_usd: f64) -> Result<(), CostGuardError> {
    for (label, value) in [("daily", daily_limit_usd), ("monthly", monthly_limit_usd)] {
        if !value.is_finite() || value <= 0.0 {
            return Err(CostGuardError::InvalidLimits(format!(
                "{label} limit {value} must be finite and > 0"
            )));
        }
    }
    if daily_limit_usd > monthly_limit_usd {
        return Err(CostGuardError::InvalidLimits(
            "daily limit must not exceed monthly limit".to_string(),
        ));
    }
    Ok(())
}

/// Converts unix milliseconds into a UTC calendar date.
fn utc_date(unix_ms: u64) -> Option<Date> {
    let seconds = i64::try_from(unix_ms / 1_000).ok()?;
    OffsetDateTime::from_unix_timestamp(seconds).ok().map(OffsetDateTime::date)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
