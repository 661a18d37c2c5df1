//! Deterministic simulation module
//!
//! All enemy and collision logic lives here. This module must be pure and deterministic:
//! - Caller-supplied timestep only
//! - Stable iteration order (by entity ID and collider handle)
//! - No rendering, audio or asset dependencies

pub mod behavior;
pub mod collision;
pub mod enemy;
pub mod grid;
pub mod layers;
pub mod shape;
pub mod spec;
pub mod state;
pub mod tick;

pub use behavior::{BackAndForthBehavior, Behavior, BehaviorOverrides, MotionState, PatrolBehavior};
pub use collision::{Collider, ColliderHandle, CollisionPair, CollisionSystem, EntityId};
pub use enemy::{Enemy, SpawnInfo};
pub use layers::{CollisionGroups, CollisionLayer};
pub use shape::{Circle, RectF, Shape};
pub use spec::{
    AnimationSpec, BehaviorKind, ColliderKind, ColliderSpec, EnemySpec, EnemySpecStore,
    MovementParams, RawEnemyRecord, RawEnemyTable, TravelAxis,
};
pub use state::SimState;
pub use tick::{EnemyFault, FrameReport, tick};
