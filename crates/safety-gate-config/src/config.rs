// crates/safety-gate-config/src/config.rs
// ============================================================================
// Module: Safety Gate Configuration
// Description: Configuration loading and validation for Safety Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: safety-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from `safety-gate.toml` with strict size and path
//! limits. Every section is optional and defaults to a bypassed but valid
//! control plane. Invalid values fail closed with [`ConfigError::Invalid`]
//! naming the offending field. Environment variables are layered on top by
//! [`SafetyGateConfig::control_plane_settings`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use safety_gate_core::AuditSink;
use safety_gate_core::ControlPlaneSettings;
use safety_gate_core::CostGuardConfig;
use safety_gate_core::EnforcementConfig;
use safety_gate_core::EnvironmentControls;
use safety_gate_core::FeatureFlags;
use safety_gate_core::FileAuditSink;
use safety_gate_core::KillSwitchConfig;
use safety_gate_core::NoopAuditSink;
use safety_gate_core::ProviderHealthConfig;
use safety_gate_core::ReadinessConfig;
use safety_gate_core::StderrAuditSink;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::env::EnvOverlay;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "safety-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "SAFETY_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Upper bound for any history or log capacity.
const MAX_HISTORY_CAPACITY: usize = 100_000;

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// Safety Gate configuration loaded from `safety-gate.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SafetyGateConfig {
    /// Component enable flags and the startup emergency stop.
    pub flags: FlagsConfig,
    /// Kill switch registry settings.
    pub kill_switch: KillSwitchConfig,
    /// Cost guard settings.
    pub cost_guard: CostGuardConfig,
    /// Provider health settings.
    pub provider_health: ProviderHealthConfig,
    /// Readiness settings.
    pub readiness: ReadinessConfig,
    /// Enforcement hook settings.
    pub enforcement: EnforcementConfig,
    /// Audit sink settings.
    pub audit: AuditConfig,
}

/// `[flags]` section.
///
/// # Invariants
/// - Every flag defaults to `false`; components are bypassed until enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlagsConfig {
    /// Kill switch registry enforcement.
    pub kill_switches: bool,
    /// Cost guard enforcement.
    pub cost_guards: bool,
    /// Provider failover and throttling.
    pub provider_failover: bool,
    /// Live readiness evaluation.
    pub readiness: bool,
    /// Enforcement hooks.
    pub enforcement: bool,
    /// Emergency stop engaged at startup.
    pub emergency_stop: bool,
}

impl FlagsConfig {
    /// Returns the component flags without the emergency stop.
    #[must_use]
    pub const fn feature_flags(&self) -> FeatureFlags {
        FeatureFlags {
            kill_switches: self.kill_switches,
            cost_guards: self.cost_guards,
            provider_failover: self.provider_failover,
            readiness: self.readiness,
            enforcement: self.enforcement,
        }
    }
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Discard audit events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// Append-only JSON lines file.
    File,
}

/// `[audit]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink kind.
    pub sink: AuditSinkKind,
    /// Output path for the file sink.
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required when audit.sink = \"file\"".to_string()))
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid when audit.sink = \"file\"".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl SafetyGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_capacity("kill_switch.history_capacity", self.kill_switch.history_capacity)?;
        validate_cost_guard(&self.cost_guard)?;
        validate_provider_health(&self.provider_health)?;
        validate_readiness(&self.readiness)?;
        validate_enforcement(&self.enforcement)?;
        self.audit.validate()
    }

    /// Resolves component settings with the environment overlay applied.
    ///
    /// Environment values win over file values.
    #[must_use]
    pub fn control_plane_settings(&self, overlay: &EnvOverlay) -> ControlPlaneSettings {
        ControlPlaneSettings {
            flags: overlay.apply_flags(self.flags.feature_flags()),
            environment: EnvironmentControls {
                killed: overlay.killed.clone(),
                emergency_stop: overlay.emergency_stop.unwrap_or(self.flags.emergency_stop),
            },
            kill_switch: self.kill_switch,
            cost_guard: self.cost_guard.clone(),
            provider_health: self.provider_health.clone(),
            readiness: self.readiness.clone(),
            enforcement: self.enforcement,
        }
    }

    /// Builds the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit file cannot be opened.
    pub fn build_audit_sink(&self) -> Result<Arc<dyn AuditSink>, ConfigError> {
        match (self.audit.sink, &self.audit.path) {
            (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
            (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
            (AuditSinkKind::File, Some(path)) => {
                let sink = FileAuditSink::new(Path::new(path.trim()))
                    .map_err(|err| ConfigError::Io(format!("audit.path: {err}")))?;
                Ok(Arc::new(sink))
            }
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required when audit.sink = \"file\"".to_string()))
            }
        }
    }
}

// ============================================================================
// SECTION: Section Validation
// ============================================================================

/// Validates `[cost_guard]`.
fn validate_cost_guard(config: &CostGuardConfig) -> Result<(), ConfigError> {
    let warning = config.warning_threshold_percent;
    let ceiling = config.hard_ceiling_percent;
    if !warning.is_finite() || warning <= 0.0 {
        return Err(ConfigError::Invalid(
            "cost_guard.warning_threshold_percent must be positive and finite".to_string(),
        ));
    }
    if !ceiling.is_finite() || ceiling <= warning {
        return Err(ConfigError::Invalid(
            "cost_guard.hard_ceiling_percent must be finite and exceed warning_threshold_percent".to_string(),
        ));
    }
    validate_capacity("cost_guard.history_capacity", config.history_capacity)?;
    let mut seen = BTreeSet::new();
    for limit in &config.features {
        if !seen.insert(limit.feature) {
            return Err(ConfigError::Invalid(format!(
                "cost_guard.features lists {} more than once",
                limit.feature
            )));
        }
        let daily = limit.daily_limit_usd;
        let monthly = limit.monthly_limit_usd;
        if !daily.is_finite() || !monthly.is_finite() || daily <= 0.0 || monthly <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "cost_guard.features.{} limits must be positive and finite",
                limit.feature
            )));
        }
        if daily > monthly {
            return Err(ConfigError::Invalid(format!(
                "cost_guard.features.{} daily_limit_usd exceeds monthly_limit_usd",
                limit.feature
            )));
        }
    }
    Ok(())
}

/// Validates `[provider_health]`.
fn validate_provider_health(config: &ProviderHealthConfig) -> Result<(), ConfigError> {
    if config.primary.as_str().trim().is_empty() {
        return Err(ConfigError::Invalid("provider_health.primary must be non-empty".to_string()));
    }
    let mut seen = BTreeSet::new();
    for provider in &config.failover {
        if provider.as_str().trim().is_empty() {
            return Err(ConfigError::Invalid("provider_health.failover entries must be non-empty".to_string()));
        }
        if *provider == config.primary {
            return Err(ConfigError::Invalid(format!(
                "provider_health.failover must not include the primary provider {provider}"
            )));
        }
        if !seen.insert(provider) {
            return Err(ConfigError::Invalid(format!("provider_health.failover lists {provider} more than once")));
        }
    }
    let degraded = config.degraded_error_rate;
    let critical = config.critical_error_rate;
    if !(degraded > 0.0 && degraded < 1.0) {
        return Err(ConfigError::Invalid(
            "provider_health.degraded_error_rate must be between 0 and 1".to_string(),
        ));
    }
    if !(critical > degraded && critical <= 1.0) {
        return Err(ConfigError::Invalid(
            "provider_health.critical_error_rate must exceed degraded_error_rate and be at most 1".to_string(),
        ));
    }
    if config.min_samples == 0 {
        return Err(ConfigError::Invalid("provider_health.min_samples must be greater than zero".to_string()));
    }
    if config.window_size < config.min_samples || config.window_size > MAX_HISTORY_CAPACITY {
        return Err(ConfigError::Invalid(
            "provider_health.window_size must be at least min_samples and within limits".to_string(),
        ));
    }
    validate_capacity("provider_health.action_log_capacity", config.action_log_capacity)?;
    if config.max_concurrency == 0 {
        return Err(ConfigError::Invalid(
            "provider_health.max_concurrency must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Validates `[readiness]`.
fn validate_readiness(config: &ReadinessConfig) -> Result<(), ConfigError> {
    if config.config_version.trim().is_empty() {
        return Err(ConfigError::Invalid("readiness.config_version must be non-empty".to_string()));
    }
    if config.approval_ttl_ms == 0 {
        return Err(ConfigError::Invalid("readiness.approval_ttl_ms must be greater than zero".to_string()));
    }
    if config.check_timeout_ms == 0 {
        return Err(ConfigError::Invalid("readiness.check_timeout_ms must be greater than zero".to_string()));
    }
    validate_capacity("readiness.override_history_capacity", config.override_history_capacity)
}

/// Validates `[enforcement]`.
fn validate_enforcement(config: &EnforcementConfig) -> Result<(), ConfigError> {
    validate_capacity("enforcement.log_capacity", config.log_capacity)?;
    if config.max_bulk_change_items == 0 {
        return Err(ConfigError::Invalid(
            "enforcement.max_bulk_change_items must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Validates a history or log capacity.
fn validate_capacity(field: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_HISTORY_CAPACITY {
        return Err(ConfigError::Invalid(format!("{field} must be between 1 and {MAX_HISTORY_CAPACITY}")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from an explicit path, env var, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}
