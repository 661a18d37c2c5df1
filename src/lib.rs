//! Enemy Sim - enemy simulation and collision core for a 2D platformer
//!
//! Core modules:
//! - `sim`: Deterministic simulation (enemy specs, behaviors, collisions, frame tick)
//! - `settings`: Data-driven tuning for the collision broad phase and movement
//! - `error`: Error taxonomy shared by loading and per-frame operations

pub mod error;
pub mod settings;
pub mod sim;

pub use error::{Result, SimError};
pub use settings::{BroadPhase, SimSettings};

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Default edge length of a broad-phase grid cell, in world units
    pub const DEFAULT_GRID_CELL_SIZE: f32 = 64.0;
    /// Colliders spanning more cells than this skip the grid and are tested against everything
    pub const DEFAULT_MAX_CELLS_PER_COLLIDER: usize = 1024;

    /// Distance below which a patrolling enemy counts as having reached its waypoint
    pub const WAYPOINT_EPSILON: f32 = 0.01;

    /// Animation frame duration used when a clip omits one (seconds)
    pub const DEFAULT_FRAME_DURATION: f32 = 0.5;

    /// Default data file shipped with the crate
    pub const ENEMY_DATA_PATH: &str = "assets/enemy_data.json";
}

/// Move `from` toward `to` by at most `max_step`, never overshooting
#[inline]
pub fn step_toward(from: Vec2, to: Vec2, max_step: f32) -> Vec2 {
    let offset = to - from;
    let dist = offset.length();
    if dist <= max_step || dist == 0.0 {
        to
    } else {
        from + offset / dist * max_step
    }
}

/// Reject negative, NaN or infinite frame deltas before they reach any state
pub fn check_delta_time(dt: f32) -> Result<f32> {
    if dt.is_finite() && dt >= 0.0 {
        Ok(dt)
    } else {
        Err(SimError::InvalidArgument(format!(
            "delta_time must be finite and non-negative, got {dt}"
        )))
    }
}
