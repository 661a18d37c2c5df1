//! Per-frame motion policies
//!
//! A `Behavior` holds the immutable parameters of one strategy; everything
//! that changes between frames lives in the enemy's `MotionState`. Updates
//! return a movement delta and never move the enemy themselves.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::spec::{BehaviorKind, EnemySpec, TravelAxis};
use crate::settings::SimSettings;
use crate::{Result, SimError, check_delta_time, step_toward};

/// Transient movement state owned by one enemy
#[derive(Debug, Clone, PartialEq)]
pub struct MotionState {
    /// Current center position
    pub position: Vec2,
    /// Spawn position; waypoints and ranges are relative to it
    pub anchor: Vec2,
    /// +1 or -1 along the travel axis (BackAndForth)
    pub direction: f32,
    /// Next waypoint to head for (Patrol)
    pub waypoint_index: usize,
    pub facing_right: bool,
}

impl MotionState {
    pub fn new(spawn: Vec2) -> Self {
        Self {
            position: spawn,
            anchor: spawn,
            direction: 1.0,
            waypoint_index: 0,
            facing_right: false,
        }
    }
}

/// Per-spawn tweaks layered over the archetype's movement parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorOverrides {
    /// Behavior tag replacing the archetype's
    pub behavior: Option<String>,
    pub speed: Option<f32>,
    pub waypoints: Option<Vec<Vec2>>,
    pub range: Option<(f32, f32)>,
}

/// Cyclic walk through waypoints
#[derive(Debug, Clone, PartialEq)]
pub struct PatrolBehavior {
    pub speed: f32,
    /// Offsets from the anchor, visited in order and wrapped
    pub waypoints: Vec<Vec2>,
    pub arrival_epsilon: f32,
}

impl PatrolBehavior {
    fn update(&self, state: &mut MotionState, dt: f32) -> Vec2 {
        let count = self.waypoints.len();
        if count == 0 {
            return Vec2::ZERO;
        }

        let mut index = state.waypoint_index % count;
        let mut target = state.anchor + self.waypoints[index];
        if state.position.distance(target) < self.arrival_epsilon {
            index = (index + 1) % count;
            target = state.anchor + self.waypoints[index];
        }

        let next = step_toward(state.position, target, self.speed * dt);
        if next.distance(target) < self.arrival_epsilon {
            index = (index + 1) % count;
        }
        state.waypoint_index = index;

        let delta = next - state.position;
        if delta.x != 0.0 {
            state.facing_right = delta.x > 0.0;
        }
        delta
    }
}

/// Oscillation along one axis between two bounds around the anchor
#[derive(Debug, Clone, PartialEq)]
pub struct BackAndForthBehavior {
    pub speed: f32,
    pub axis: TravelAxis,
    pub min: f32,
    pub max: f32,
}

impl BackAndForthBehavior {
    fn update(&self, state: &mut MotionState, dt: f32) -> Vec2 {
        let axis = self.axis.unit();
        let along = (state.position - state.anchor).dot(axis);
        let next = (along + self.speed * dt * state.direction).clamp(self.min, self.max);

        // Reverse on reaching the bound we were heading for; facing stays put
        if state.direction > 0.0 && next >= self.max {
            state.direction = -1.0;
        } else if state.direction < 0.0 && next <= self.min {
            state.direction = 1.0;
        }

        axis * (next - along)
    }
}

/// The closed set of motion strategies
#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    Stationary,
    Patrol(PatrolBehavior),
    BackAndForth(BackAndForthBehavior),
}

impl Behavior {
    /// Build the strategy an archetype asks for, applying spawn overrides
    pub fn from_spec(
        spec: &EnemySpec,
        overrides: &BehaviorOverrides,
        settings: &SimSettings,
    ) -> Result<Self> {
        let kind = match &overrides.behavior {
            Some(tag) => tag.parse::<BehaviorKind>()?,
            None => spec.behavior,
        };

        let speed = overrides.speed.unwrap_or(spec.movement.speed);
        if kind != BehaviorKind::Stationary && !(speed.is_finite() && speed > 0.0) {
            return Err(SimError::InvalidArgument(format!(
                "{} behavior for '{}' needs a positive speed, got {speed}",
                kind.as_str(),
                spec.id
            )));
        }

        Ok(match kind {
            BehaviorKind::Stationary => Behavior::Stationary,
            BehaviorKind::Patrol => {
                let waypoints = overrides
                    .waypoints
                    .clone()
                    .unwrap_or_else(|| spec.movement.waypoints.clone());
                if waypoints.is_empty() {
                    log::warn!("Patrol enemy '{}' has no waypoints, it will stay put", spec.id);
                }
                Behavior::Patrol(PatrolBehavior {
                    speed,
                    waypoints,
                    arrival_epsilon: settings.arrival_epsilon,
                })
            }
            BehaviorKind::BackAndForth => {
                let (min, max) = overrides.range.or(spec.movement.range).ok_or_else(|| {
                    SimError::InvalidArgument(format!(
                        "BackAndForth behavior for '{}' needs a travel range",
                        spec.id
                    ))
                })?;
                if !(min.is_finite() && max.is_finite() && min < max) {
                    return Err(SimError::InvalidArgument(format!(
                        "travel range needs min < max, got [{min}, {max}]"
                    )));
                }
                // Bounds are offsets from the spawn point, which must lie inside them
                if min > 0.0 || max < 0.0 {
                    return Err(SimError::InvalidArgument(format!(
                        "travel range must contain the spawn offset 0, got [{min}, {max}]"
                    )));
                }
                Behavior::BackAndForth(BackAndForthBehavior {
                    speed,
                    axis: spec.movement.travel_axis,
                    min,
                    max,
                })
            }
        })
    }

    pub fn kind(&self) -> BehaviorKind {
        match self {
            Behavior::Stationary => BehaviorKind::Stationary,
            Behavior::Patrol(_) => BehaviorKind::Patrol,
            Behavior::BackAndForth(_) => BehaviorKind::BackAndForth,
        }
    }

    /// Starting motion state for an enemy spawned at `spawn`
    pub fn initial_state(&self, spec: &EnemySpec, spawn: Vec2) -> MotionState {
        let mut state = MotionState::new(spawn);
        state.facing_right = spec.movement.initial_facing_right;
        if let Some(v) = spec.movement.initial_velocity_x {
            if v < 0.0 {
                state.direction = -1.0;
            }
        }
        state
    }

    /// Compute this frame's movement delta
    ///
    /// Only `state`'s direction, waypoint index and facing may change.
    /// A zero `dt` is a no-op for every strategy.
    pub fn update(&self, state: &mut MotionState, dt: f32) -> Result<Vec2> {
        let dt = check_delta_time(dt)?;
        if dt == 0.0 {
            return Ok(Vec2::ZERO);
        }

        Ok(match self {
            Behavior::Stationary => Vec2::ZERO,
            Behavior::Patrol(patrol) => patrol.update(state, dt),
            Behavior::BackAndForth(oscillate) => oscillate.update(state, dt),
        })
    }
}
