// crates/safety-gate-core/src/core/mod.rs
// ============================================================================
// Module: Safety Gate Core Types
// Description: Identifiers, hashing, bounded history, and control flags.
// Purpose: Provide stable, serializable building blocks shared by every component.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Core types are the vocabulary shared by the runtime components: closed
//! identifier sets for subsystems and features, canonical hashing for
//! readiness signatures, the bounded ring buffer behind every audit trail,
//! and the environment-derived control flags.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod flags;
pub mod hashing;
pub mod history;
pub mod identifiers;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use flags::EnvironmentControls;
pub use flags::FeatureFlags;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use history::BoundedLog;
pub use identifiers::ApprovalId;
pub use identifiers::CheckId;
pub use identifiers::Feature;
pub use identifiers::IdentifierError;
pub use identifiers::OverrideId;
pub use identifiers::ProviderId;
pub use identifiers::Subsystem;
