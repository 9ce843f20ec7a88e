// crates/safety-gate-core/src/runtime/kill_switch.rs
// ============================================================================
// Module: Kill Switch Registry
// Description: Per-subsystem circuit breakers with source precedence and TTLs.
// Purpose: Let operators halt a subsystem instantly while env mandates always win.
// Dependencies: crate::{core, interfaces}, serde, serde_json
// ============================================================================

//! ## Overview
//! Every [`Subsystem`] has exactly one switch. Switches seeded from
//! `KILL_<SUBSYSTEM>` carry [`SwitchSource::Env`] and can never be released by
//! an API call; [`guard_source`] is the single place that rule lives.
//!
//! Timed switches store their expiry and are re-checked on every read, so a
//! switch is inactive at its deadline even if nothing else ran. Every
//! mutation, rejection, and lazy expiry is appended to a bounded history.
//!
//! With the registry flag off, [`KillSwitchRegistry::is_killed`] always
//! reports `false`; switch state is still tracked and visible.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

use crate::core::flags::EnvironmentControls;
use crate::core::history::BoundedLog;
use crate::core::identifiers::IdentifierError;
use crate::core::identifiers::Subsystem;
use crate::interfaces::AuditSink;
use crate::interfaces::Clock;
use crate::interfaces::SafetyAuditEvent;

/// Audit component label.
const COMPONENT: &str = "kill_switch";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Origin of a kill-switch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchSource {
    /// Process environment at startup; highest precedence.
    Env,
    /// Runtime administrative API.
    Api,
}

impl SwitchSource {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Env => "env",
            Self::Api => "api",
        }
    }
}

impl fmt::Display for SwitchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwitchSource {
    type Err = IdentifierError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "env" => Ok(Self::Env),
            "api" => Ok(Self::Api),
            _ => Err(IdentifierError::unknown("switch source", value)),
        }
    }
}

/// Current state of one subsystem's switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillSwitchState {
    /// Guarded subsystem.
    pub subsystem: Subsystem,
    /// True when the subsystem is killed.
    pub enabled: bool,
    /// Source of the last change.
    pub source: SwitchSource,
    /// Reason for the last change.
    pub reason: String,
    /// Actor that engaged the switch.
    pub enabled_by: Option<String>,
    /// Engage time (unix ms).
    pub enabled_at_ms: Option<u64>,
    /// Expiry for timed overrides (unix ms).
    pub expires_at_ms: Option<u64>,
}

impl KillSwitchState {
    /// Returns the released, api-sourced default state.
    fn released(subsystem: Subsystem) -> Self {
        Self {
            subsystem,
            enabled: false,
            source: SwitchSource::Api,
            reason: String::new(),
            enabled_by: None,
            enabled_at_ms: None,
            expires_at_ms: None,
        }
    }

    /// Returns true when a timed override has reached its deadline.
    #[must_use]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms.is_some_and(|expires_at| now_ms >= expires_at)
    }

    /// Returns true when the switch is engaged and unexpired.
    #[must_use]
    pub fn is_active(&self, now_ms: u64) -> bool {
        self.enabled && !self.is_expired(now_ms)
    }
}

/// Kind of entry in the kill-switch history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillSwitchAction {
    /// Switch engaged.
    Enabled,
    /// Switch released.
    Disabled,
    /// Timed switch released on read after its deadline.
    Expired,
    /// Mutation refused by source precedence or input validation.
    Rejected,
}

impl KillSwitchAction {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Expired => "expired",
            Self::Rejected => "rejected",
        }
    }
}

/// Immutable audit record of a kill-switch change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillSwitchEvent {
    /// Affected subsystem.
    pub subsystem: Subsystem,
    /// Recorded action.
    pub action: KillSwitchAction,
    /// Source of the request.
    pub source: SwitchSource,
    /// Request reason.
    pub reason: String,
    /// Requesting actor when known.
    pub actor: Option<String>,
    /// Event time (unix ms).
    pub timestamp_ms: u64,
    /// Expiry for timed overrides (unix ms).
    pub expires_at_ms: Option<u64>,
}

/// Aggregate registry counters for dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillSwitchStats {
    /// Whether registry enforcement is enabled.
    pub registry_enabled: bool,
    /// Number of tracked subsystems.
    pub total_subsystems: usize,
    /// Number of currently killed subsystems.
    pub killed: usize,
    /// Killed subsystems mandated by the environment.
    pub env_controlled: usize,
    /// Killed subsystems engaged through the API.
    pub api_controlled: usize,
    /// Killed subsystems with a pending expiry.
    pub timed: usize,
    /// Number of retained history events.
    pub history_len: usize,
}

/// Kill-switch registry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KillSwitchConfig {
    /// Maximum retained history events.
    pub history_capacity: usize,
}

impl Default for KillSwitchConfig {
    fn default() -> Self {
        Self {
            history_capacity: 1_000,
        }
    }
}

// ============================================================================
// SECTION: Source Precedence
// ============================================================================

/// Returns true when `requested` may mutate `current`.
///
/// An active env-sourced switch only accepts env-sourced requests.
#[must_use]
pub fn guard_source(current: &KillSwitchState, requested: SwitchSource, now_ms: u64) -> bool {
    !(current.is_active(now_ms) && current.source == SwitchSource::Env && requested != SwitchSource::Env)
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Lock-protected registry state.
struct RegistryInner {
    /// Switch state per subsystem.
    states: BTreeMap<Subsystem, KillSwitchState>,
    /// Bounded audit history.
    history: BoundedLog<KillSwitchEvent>,
}

impl RegistryInner {
    /// Returns the state for `subsystem`, creating the released default.
    fn state_mut(&mut self, subsystem: Subsystem) -> &mut KillSwitchState {
        self.states.entry(subsystem).or_insert_with(|| KillSwitchState::released(subsystem))
    }

    /// Releases an expired timed switch and returns the expiry event.
    fn expire_if_due(&mut self, subsystem: Subsystem, now_ms: u64) -> Option<KillSwitchEvent> {
        let state = self.state_mut(subsystem);
        if !(state.enabled && state.is_expired(now_ms)) {
            return None;
        }
        let event = KillSwitchEvent {
            subsystem,
            action: KillSwitchAction::Expired,
            source: state.source,
            reason: format!("timed override expired: {}", state.reason),
            actor: state.enabled_by.clone(),
            timestamp_ms: now_ms,
            expires_at_ms: state.expires_at_ms,
        };
        *state = KillSwitchState {
            reason: event.reason.clone(),
            source: state.source,
            ..KillSwitchState::released(subsystem)
        };
        self.history.push(event.clone());
        Some(event)
    }

    /// Expires every due switch and returns the emitted events.
    fn expire_all(&mut self, now_ms: u64) -> Vec<KillSwitchEvent> {
        Subsystem::ALL
            .into_iter()
            .filter_map(|subsystem| self.expire_if_due(subsystem, now_ms))
            .collect()
    }
}

/// Per-subsystem kill-switch registry.
pub struct KillSwitchRegistry {
    /// Registry enforcement flag; off means `is_killed` is always false.
    enabled: bool,
    /// Registry state.
    inner: Mutex<RegistryInner>,
    /// Injected clock.
    clock: Arc<dyn Clock>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
}

impl KillSwitchRegistry {
    /// Creates a registry seeded from environment-mandated kills.
    #[must_use]
    pub fn new(
        config: KillSwitchConfig,
        enabled: bool,
        env: &EnvironmentControls,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let now_ms = clock.now_ms();
        let mut inner = RegistryInner {
            states: Subsystem::ALL
                .into_iter()
                .map(|subsystem| (subsystem, KillSwitchState::released(subsystem)))
                .collect(),
            history: BoundedLog::new(config.history_capacity),
        };
        let mut seeded = Vec::new();
        for subsystem in &env.killed {
            let event = engage(
                &mut inner,
                *subsystem,
                SwitchSource::Env,
                "killed by environment",
                Some("environment"),
                None,
                now_ms,
            );
            seeded.push(event);
        }
        let registry = Self {
            enabled,
            inner: Mutex::new(inner),
            clock,
            audit,
        };
        registry.emit(&seeded);
        registry
    }

    /// Returns whether registry enforcement is enabled.
    #[must_use]
    pub const fn is_registry_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns true when `subsystem` is killed and the registry is enabled.
    ///
    /// Expiry is checked on every call. A poisoned registry reports killed.
    #[must_use]
    pub fn is_killed(&self, subsystem: Subsystem) -> bool {
        if !self.enabled {
            return false;
        }
        let now_ms = self.clock.now_ms();
        let Some(mut inner) = self.lock() else {
            return true;
        };
        let expired = inner.expire_if_due(subsystem, now_ms);
        let killed = inner.state_mut(subsystem).enabled;
        drop(inner);
        self.emit(expired.as_slice());
        killed
    }

    /// Engages a switch, optionally timed. Returns false when refused.
    pub fn enable(
        &self,
        subsystem: Subsystem,
        source: SwitchSource,
        reason: &str,
        actor: Option<&str>,
        ttl_ms: Option<u64>,
    ) -> bool {
        let request = Mutation {
            subsystem,
            source,
            reason,
            actor,
            now_ms: self.clock.now_ms(),
        };
        self.mutate(request, |inner, events| enable_locked(inner, request, ttl_ms, events))
    }

    /// Releases a switch. Returns false when refused by source precedence.
    pub fn disable(&self, subsystem: Subsystem, source: SwitchSource, reason: &str) -> bool {
        let request = Mutation {
            subsystem,
            source,
            reason,
            actor: None,
            now_ms: self.clock.now_ms(),
        };
        self.mutate(request, |inner, events| disable_locked(inner, request, events))
    }

    /// Flips a switch. Returns false when refused.
    ///
    /// The current state is read and changed under one lock, so concurrent
    /// toggles serialize.
    pub fn toggle(
        &self,
        subsystem: Subsystem,
        source: SwitchSource,
        reason: &str,
        actor: Option<&str>,
    ) -> bool {
        let request = Mutation {
            subsystem,
            source,
            reason,
            actor,
            now_ms: self.clock.now_ms(),
        };
        self.mutate(request, |inner, events| {
            if inner.state_mut(subsystem).is_active(request.now_ms) {
                disable_locked(inner, request, events)
            } else {
                enable_locked(inner, request, None, events)
            }
        })
    }

    /// Returns the current state of `subsystem`, or `None` if the registry is poisoned.
    #[must_use]
    pub fn get_state(&self, subsystem: Subsystem) -> Option<KillSwitchState> {
        let now_ms = self.clock.now_ms();
        let mut inner = self.lock()?;
        let expired = inner.expire_if_due(subsystem, now_ms);
        let state = inner.state_mut(subsystem).clone();
        drop(inner);
        self.emit(expired.as_slice());
        Some(state)
    }

    /// Returns every switch state in subsystem order.
    #[must_use]
    pub fn get_all_states(&self) -> Vec<KillSwitchState> {
        let now_ms = self.clock.now_ms();
        let Some(mut inner) = self.lock() else {
            return Vec::new();
        };
        let expired = inner.expire_all(now_ms);
        let states = inner.states.values().cloned().collect();
        drop(inner);
        self.emit(&expired);
        states
    }

    /// Returns subsystems whose switch is engaged, regardless of the registry flag.
    ///
    /// A poisoned registry reports every subsystem.
    #[must_use]
    pub fn get_killed_subsystems(&self) -> Vec<Subsystem> {
        let now_ms = self.clock.now_ms();
        let Some(mut inner) = self.lock() else {
            return Subsystem::ALL.to_vec();
        };
        let expired = inner.expire_all(now_ms);
        let killed = inner
            .states
            .values()
            .filter(|state| state.enabled)
            .map(|state| state.subsystem)
            .collect();
        drop(inner);
        self.emit(&expired);
        killed
    }

    /// Returns up to `limit` history events, newest first.
    #[must_use]
    pub fn get_event_history(&self, limit: usize) -> Vec<KillSwitchEvent> {
        self.lock().map(|inner| inner.history.recent(limit)).unwrap_or_default()
    }

    /// Returns aggregate counters.
    #[must_use]
    pub fn get_stats(&self) -> KillSwitchStats {
        let states = self.get_all_states();
        let active: Vec<&KillSwitchState> = states.iter().filter(|state| state.enabled).collect();
        let history_len = self.lock().map_or(0, |inner| inner.history.len());
        KillSwitchStats {
            registry_enabled: self.enabled,
            total_subsystems: Subsystem::ALL.len(),
            killed: active.len(),
            env_controlled: active.iter().filter(|state| state.source == SwitchSource::Env).count(),
            api_controlled: active.iter().filter(|state| state.source == SwitchSource::Api).count(),
            timed: active.iter().filter(|state| state.expires_at_ms.is_some()).count(),
            history_len,
        }
    }

    /// Locks registry state; `None` when poisoned.
    fn lock(&self) -> Option<MutexGuard<'_, RegistryInner>> {
        self.inner.lock().ok()
    }

    /// Runs `apply` under the registry lock after lazy expiry, then audits the events.
    fn mutate(
        &self,
        request: Mutation<'_>,
        apply: impl FnOnce(&mut RegistryInner, &mut Vec<KillSwitchEvent>) -> bool,
    ) -> bool {
        let Some(mut inner) = self.lock() else {
            return false;
        };
        let mut events: Vec<KillSwitchEvent> =
            inner.expire_if_due(request.subsystem, request.now_ms).into_iter().collect();
        let accepted = apply(&mut *inner, &mut events);
        drop(inner);
        self.emit(&events);
        accepted
    }

    /// Forwards history events to the audit sink.
    fn emit(&self, events: &[KillSwitchEvent]) {
        for event in events {
            let audit = SafetyAuditEvent::new(
                COMPONENT,
                event.action.as_str(),
                event.subsystem.as_str(),
                event.reason.clone(),
                event.timestamp_ms,
            )
            .with_actor(event.actor.as_deref())
            .with_details(json!({
                "source": event.source,
                "expires_at_ms": event.expires_at_ms,
            }));
            self.audit.record(&audit);
        }
    }
}

// ============================================================================
// SECTION: Mutation Helpers
// ============================================================================

/// One requested switch mutation.
#[derive(Clone, Copy)]
struct Mutation<'a> {
    /// Target subsystem.
    subsystem: Subsystem,
    /// Requesting source.
    source: SwitchSource,
    /// Operator reason.
    reason: &'a str,
    /// Acting principal when known.
    actor: Option<&'a str>,
    /// Request time (unix ms).
    now_ms: u64,
}

/// Engages a switch when the request is valid and precedence allows it.
fn enable_locked(
    inner: &mut RegistryInner,
    request: Mutation<'_>,
    ttl_ms: Option<u64>,
    events: &mut Vec<KillSwitchEvent>,
) -> bool {
    let Mutation {
        subsystem,
        source,
        reason,
        actor,
        now_ms,
    } = request;
    if reason.trim().is_empty() || ttl_ms == Some(0) {
        events.push(reject(inner, subsystem, source, "invalid enable request", actor, now_ms));
        return false;
    }
    if !guard_source(inner.state_mut(subsystem), source, now_ms) {
        events.push(reject(inner, subsystem, source, reason, actor, now_ms));
        return false;
    }
    events.push(engage(inner, subsystem, source, reason, actor, ttl_ms, now_ms));
    true
}

/// Releases a switch when the request is valid and precedence allows it.
fn disable_locked(
    inner: &mut RegistryInner,
    request: Mutation<'_>,
    events: &mut Vec<KillSwitchEvent>,
) -> bool {
    let Mutation {
        subsystem,
        source,
        reason,
        actor,
        now_ms,
    } = request;
    if reason.trim().is_empty() {
        events.push(reject(inner, subsystem, source, "invalid disable request", actor, now_ms));
        return false;
    }
    if !guard_source(inner.state_mut(subsystem), source, now_ms) {
        events.push(reject(inner, subsystem, source, reason, actor, now_ms));
        return false;
    }
    events.extend(release(inner, subsystem, source, reason, now_ms));
    true
}

/// Engages a switch and records the event.
fn engage(
    inner: &mut RegistryInner,
    subsystem: Subsystem,
    source: SwitchSource,
    reason: &str,
    actor: Option<&str>,
    ttl_ms: Option<u64>,
    now_ms: u64,
) -> KillSwitchEvent {
    let expires_at_ms = ttl_ms.map(|ttl| now_ms.saturating_add(ttl));
    *inner.state_mut(subsystem) = KillSwitchState {
        subsystem,
        enabled: true,
        source,
        reason: reason.to_string(),
        enabled_by: actor.map(str::to_string),
        enabled_at_ms: Some(now_ms),
        expires_at_ms,
    };
    let event = KillSwitchEvent {
        subsystem,
        action: KillSwitchAction::Enabled,
        source,
        reason: reason.to_string(),
        actor: actor.map(str::to_string),
        timestamp_ms: now_ms,
        expires_at_ms,
    };
    inner.history.push(event.clone());
    event
}

/// Releases an engaged switch; already-released switches record nothing.
fn release(
    inner: &mut RegistryInner,
    subsystem: Subsystem,
    source: SwitchSource,
    reason: &str,
    now_ms: u64,
) -> Option<KillSwitchEvent> {
    let state = inner.state_mut(subsystem);
    if !state.enabled {
        return None;
    }
    *state = KillSwitchState {
        source,
        reason: reason.to_string(),
        ..KillSwitchState::released(subsystem)
    };
    let event = KillSwitchEvent {
        subsystem,
        action: KillSwitchAction::Disabled,
        source,
        reason: reason.to_string(),
        actor: None,
        timestamp_ms: now_ms,
        expires_at_ms: None,
    };
    inner.history.push(event.clone());
    Some(event)
}

/// Records a refused mutation.
fn reject(
    inner: &mut RegistryInner,
    subsystem: Subsystem,
    source: SwitchSource,
    reason: &str,
    actor: Option<&str>,
    now_ms: u64,
) -> KillSwitchEvent {
    let event = KillSwitchEvent {
        subsystem,
        action: KillSwitchAction::Rejected,
        source,
        reason: reason.to_string(),
        actor: actor.map(str::to_string),
        timestamp_ms: now_ms,
        expires_at_ms: None,
    };
    inner.history.push(event.clone());
    event
}
