//! Error types for enemy loading and the per-frame simulation

use thiserror::Error;

use crate::sim::collision::ColliderHandle;

/// Simulation errors
///
/// Load-time failures (`DataFormat`, `DuplicateKey`) abort only the load call.
/// Per-frame failures (`InvalidHandle`, `InvalidArgument`) are contract
/// violations reported to the caller before any state is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Malformed, missing or unreadable enemy data
    #[error("Malformed enemy data: {0}")]
    DataFormat(String),

    /// Two records share an archetype identifier
    #[error("Duplicate enemy archetype identifier: {0}")]
    DuplicateKey(String),

    /// Behavior tag with no matching strategy
    #[error("Unsupported behavior kind: {0}")]
    UnsupportedBehaviorKind(String),

    /// Collider tag with no matching shape
    #[error("Unsupported collider kind: {0}")]
    UnsupportedColliderKind(String),

    /// Stale or unknown collider handle
    #[error("Invalid collider handle: {0:?}")]
    InvalidHandle(ColliderHandle),

    /// Rejected argument (negative/NaN delta time, non-positive shape dimension)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Spawn requested for an archetype the store does not hold
    #[error("Unknown enemy archetype: {0}")]
    UnknownArchetype(String),

    /// Every entity id has been handed out
    #[error("Entity ids exhausted")]
    EntityIdsExhausted,
}

/// Result type for simulation operations
pub type Result<T> = std::result::Result<T, SimError>;
