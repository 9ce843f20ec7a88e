// crates/safety-gate-core/src/runtime/emergency.rs
// ============================================================================
// Module: Emergency Stop
// Description: Global stop flag forcing every enforcement hook to block.
// Purpose: Provide one audited switch that halts all sensitive automation.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! The emergency stop starts from `EMERGENCY_STOP_ENABLED` and can be toggled
//! by operators at runtime. Reads are lock-free so the flag can be consulted
//! ahead of every other component without joining the lock order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use crate::interfaces::AuditSink;
use crate::interfaces::Clock;
use crate::interfaces::SafetyAuditEvent;

// ============================================================================
// SECTION: Emergency Stop
// ============================================================================

/// Process-wide emergency stop flag.
pub struct EmergencyStop {
    /// Current flag state.
    active: AtomicBool,
    /// Injected clock.
    clock: Arc<dyn Clock>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
}

impl EmergencyStop {
    /// Creates the flag with its startup state.
    #[must_use]
    pub fn new(initial: bool, clock: Arc<dyn Clock>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            active: AtomicBool::new(initial),
            clock,
            audit,
        }
    }

    /// Returns true while the emergency stop is engaged.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Engages the stop. Returns true when the state changed.
    pub fn activate(&self, actor: &str, reason: &str) -> bool {
        let changed = !self.active.swap(true, Ordering::SeqCst);
        self.emit("activated", actor, reason, changed);
        changed
    }

    /// Releases the stop. Returns true when the state changed.
    pub fn deactivate(&self, actor: &str) -> bool {
        let changed = self.active.swap(false, Ordering::SeqCst);
        self.emit("deactivated", actor, "emergency stop released", changed);
        changed
    }

    /// Records a toggle attempt.
    fn emit(&self, action: &str, actor: &str, reason: &str, changed: bool) {
        let event = SafetyAuditEvent::new(
            "emergency_stop",
            action,
            "global",
            reason,
            self.clock.now_ms(),
        )
        .with_actor(Some(actor))
        .with_details(serde_json::json!({ "changed": changed }));
        self.audit.record(&event);
    }
}
