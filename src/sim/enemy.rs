//! Runtime enemy instances
//!
//! An enemy binds a shared archetype, its own behavior strategy and one
//! registered collider. Its collider must be released through `despawn`
//! before the enemy goes away.

use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::behavior::{Behavior, BehaviorOverrides, MotionState};
use super::collision::{Collider, ColliderHandle, CollisionSystem, EntityId};
use super::spec::{AnimationSpec, BehaviorKind, EnemySpec};
use crate::settings::SimSettings;
use crate::{Result, check_delta_time};

/// Where and what to spawn (usually read from a level file)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnInfo {
    /// Archetype identifier
    pub archetype: String,
    /// Center position
    pub position: Vec2,
    #[serde(default)]
    pub overrides: BehaviorOverrides,
}

impl SpawnInfo {
    pub fn new(archetype: impl Into<String>, position: Vec2) -> Self {
        Self {
            archetype: archetype.into(),
            position,
            overrides: BehaviorOverrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: BehaviorOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// A live enemy
#[derive(Debug)]
pub struct Enemy {
    id: EntityId,
    spec: Arc<EnemySpec>,
    behavior: Behavior,
    motion: MotionState,
    velocity: Vec2,
    collider: ColliderHandle,
    alive: bool,
    released: bool,
}

impl Enemy {
    /// Build an enemy and register its collider
    pub fn spawn(
        id: EntityId,
        spec: Arc<EnemySpec>,
        spawn: &SpawnInfo,
        settings: &SimSettings,
        collisions: &mut CollisionSystem,
    ) -> Result<Self> {
        check_position(spawn.position)?;
        let behavior = Behavior::from_spec(&spec, &spawn.overrides, settings)?;
        let motion = behavior.initial_state(&spec, spawn.position);

        let collider = Collider::new(spec.collider.shape_at(spawn.position), id, spec.layer);
        let collider = collisions.register(collider)?;

        log::debug!(
            "Spawned '{}' as {:?} at ({}, {}) with {:?}",
            spec.id,
            id,
            spawn.position.x,
            spawn.position.y,
            behavior.kind()
        );

        Ok(Self {
            id,
            spec,
            behavior,
            motion,
            velocity: Vec2::ZERO,
            collider,
            alive: true,
            released: false,
        })
    }

    /// Advance one frame: move by the behavior's delta and sync the collider
    ///
    /// Dead enemies ignore updates. Bad `dt` is rejected before anything moves.
    pub fn update(&mut self, dt: f32, collisions: &mut CollisionSystem) -> Result<()> {
        let dt = check_delta_time(dt)?;
        if !self.alive {
            return Ok(());
        }

        let mut motion = self.motion.clone();
        let delta = self.behavior.update(&mut motion, dt)?;
        motion.position += delta;

        collisions.update_bounds(self.collider, self.spec.collider.shape_at(motion.position))?;

        self.motion = motion;
        if dt > 0.0 {
            self.velocity = delta / dt;
        }
        Ok(())
    }

    /// Release the collider and consume the enemy
    pub fn despawn(mut self, collisions: &mut CollisionSystem) {
        collisions.unregister(self.collider);
        self.released = true;
    }

    /// Mark dead; the collider stays registered until `despawn`
    pub fn kill(&mut self) {
        self.alive = false;
        self.velocity = Vec2::ZERO;
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn spec(&self) -> &Arc<EnemySpec> {
        &self.spec
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub fn motion(&self) -> &MotionState {
        &self.motion
    }

    pub fn position(&self) -> Vec2 {
        self.motion.position
    }

    /// Velocity over the last non-zero frame
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn facing_right(&self) -> bool {
        self.motion.facing_right
    }

    pub fn collider(&self) -> ColliderHandle {
        self.collider
    }

    /// Clip the renderer should play: "idle" when stationary, "move" otherwise
    pub fn animation_clip(&self) -> Option<(&str, &AnimationSpec)> {
        let name = match self.behavior.kind() {
            BehaviorKind::Stationary => "idle",
            _ => "move",
        };
        self.spec
            .animations
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
    }
}

impl Drop for Enemy {
    fn drop(&mut self) {
        if !self.released {
            log::warn!(
                "Enemy {:?} ('{}') dropped without despawn; collider {:?} is dangling",
                self.id,
                self.spec.id,
                self.collider
            );
        }
    }
}

fn check_position(p: Vec2) -> Result<()> {
    if p.is_finite() {
        Ok(())
    } else {
        Err(crate::SimError::InvalidArgument(format!(
            "spawn position must be finite, got ({}, {})",
            p.x, p.y
        )))
    }
}
