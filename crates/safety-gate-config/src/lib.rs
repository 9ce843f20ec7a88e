// crates/safety-gate-config/src/lib.rs
// ============================================================================
// Module: Safety Gate Config Library
// Description: Canonical config model, environment overlay, and validation.
// Purpose: Single source of truth for safety-gate.toml and environment semantics.
// Dependencies: safety-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `safety-gate-config` defines the configuration model for Safety Gate. It
//! loads `safety-gate.toml`, validates it fail-closed, overlays the process
//! environment (`KILL_<SUBSYSTEM>`, `EMERGENCY_STOP_ENABLED`, `ENABLE_*`), and
//! resolves the result into the settings the control plane is built from.
//!
//! Security posture: config and environment inputs are untrusted; malformed
//! controls resolve to their active state.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use env::EnvOverlay;
pub use env::parse_env_bool;
pub use examples::config_toml_example;
