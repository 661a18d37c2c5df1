//! Simulation settings
//!
//! Loaded separately from enemy data. Everything has a sensible default so a
//! missing settings file never blocks startup.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::{Result, SimError};

/// Broad-phase strategy used by the collision system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BroadPhase {
    /// Test every eligible pair (fine for tens of colliders)
    Naive,
    /// Bucket colliders into a uniform grid before narrow-phase tests
    #[default]
    Grid,
}

impl BroadPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            BroadPhase::Naive => "Naive",
            BroadPhase::Grid => "Grid",
        }
    }
}

/// Simulation tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    // === Collision ===
    /// Broad-phase strategy
    pub broad_phase: BroadPhase,
    /// Grid cell edge length (world units)
    pub grid_cell_size: f32,
    /// Colliders covering more cells than this are tested against all others
    pub max_cells_per_collider: usize,

    // === Movement ===
    /// Waypoint arrival threshold for patrols
    pub arrival_epsilon: f32,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            broad_phase: BroadPhase::Grid,
            grid_cell_size: DEFAULT_GRID_CELL_SIZE,
            max_cells_per_collider: DEFAULT_MAX_CELLS_PER_COLLIDER,
            arrival_epsilon: WAYPOINT_EPSILON,
        }
    }
}

impl SimSettings {
    /// Settings with naive all-pairs collision testing
    pub fn naive() -> Self {
        Self {
            broad_phase: BroadPhase::Naive,
            ..Self::default()
        }
    }

    /// Check that every numeric field is usable
    pub fn validate(&self) -> Result<()> {
        if !(self.grid_cell_size.is_finite() && self.grid_cell_size > 0.0) {
            return Err(SimError::InvalidArgument(format!(
                "grid_cell_size must be positive, got {}",
                self.grid_cell_size
            )));
        }
        if self.max_cells_per_collider == 0 {
            return Err(SimError::InvalidArgument(
                "max_cells_per_collider must be at least 1".to_string(),
            ));
        }
        if !(self.arrival_epsilon.is_finite() && self.arrival_epsilon > 0.0) {
            return Err(SimError::InvalidArgument(format!(
                "arrival_epsilon must be positive, got {}",
                self.arrival_epsilon
            )));
        }
        Ok(())
    }

    /// Parse and validate settings from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)
            .map_err(|e| SimError::DataFormat(format!("settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| SimError::DataFormat(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Load settings, falling back to defaults on any failure
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.as_ref().display());
                settings
            }
            Err(e) => {
                log::info!("Using default settings ({e})");
                Self::default()
            }
        }
    }
}
