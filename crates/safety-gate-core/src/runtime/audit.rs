// crates/safety-gate-core/src/runtime/audit.rs
// ============================================================================
// Module: Safety Gate Audit Sinks
// Description: JSON-lines audit sinks for control-plane decisions.
// Purpose: Emit structured audit logs without hard dependencies.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! Sinks receive every [`SafetyAuditEvent`] the components emit. They are
//! intentionally lightweight so deployments can route events to their
//! preferred logging pipeline. Sink failures are swallowed: logging must never
//! change an enforcement outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::core::history::BoundedLog;
use crate::interfaces::AuditSink;
use crate::interfaces::SafetyAuditEvent;

// ============================================================================
// SECTION: Stderr Sink
// ============================================================================

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &SafetyAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

// ============================================================================
// SECTION: File Sink
// ============================================================================

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &SafetyAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

// ============================================================================
// SECTION: Noop + Memory Sinks
// ============================================================================

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &SafetyAuditEvent) {}
}

/// Bounded in-memory audit sink for embedding and tests.
pub struct MemoryAuditSink {
    /// Retained events, oldest first.
    events: Mutex<BoundedLog<SafetyAuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates a memory sink retaining at most `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(BoundedLog::new(capacity)),
        }
    }

    /// Returns retained events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<SafetyAuditEvent> {
        self.events.lock().map(|log| log.to_vec()).unwrap_or_default()
    }

    /// Returns retained events emitted by `component`, oldest first.
    #[must_use]
    pub fn events_for(&self, component: &str) -> Vec<SafetyAuditEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.component == component)
            .collect()
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new(1_000)
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &SafetyAuditEvent) {
        if let Ok(mut log) = self.events.lock() {
            log.push(event.clone());
        }
    }
}
