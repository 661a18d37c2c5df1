//! Collision layers and pair filtering
//!
//! Each collider belongs to one layer and carries membership/filter bitmasks.
//! A pair is tested only when each side's membership passes the other's filter.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SimError;

/// Bit index of a collider's category (0..32)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct CollisionLayer(pub u32);

impl CollisionLayer {
    pub const DEFAULT: Self = Self(0);
    pub const PLAYER: Self = Self(1);
    pub const ENEMY: Self = Self(2);
    /// Level geometry
    pub const WALL: Self = Self(3);
    /// Oxygen spots and other collectibles
    pub const PICKUP: Self = Self(4);

    pub const fn custom(id: u32) -> Self {
        Self(id)
    }

    /// Single-bit mask; zero for ids past 31
    pub fn as_mask(&self) -> u32 {
        1u32.checked_shl(self.0).unwrap_or(0)
    }

    /// Groups a collider on this layer gets unless told otherwise
    ///
    /// Walls skip walls, pickups only answer to the player, the rest test everything.
    pub fn default_groups(&self) -> CollisionGroups {
        let targets: &[CollisionLayer] = match *self {
            Self::ENEMY => &[Self::DEFAULT, Self::PLAYER, Self::ENEMY, Self::WALL],
            Self::WALL => &[Self::DEFAULT, Self::PLAYER, Self::ENEMY],
            Self::PICKUP => &[Self::DEFAULT, Self::PLAYER],
            _ => return CollisionGroups::new(self.as_mask(), u32::MAX),
        };
        CollisionGroups::on_layer(*self, targets)
    }
}

impl FromStr for CollisionLayer {
    type Err = SimError;

    /// Case-insensitive tag as written in enemy data
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(Self::DEFAULT),
            "player" => Ok(Self::PLAYER),
            "enemy" | "enemies" => Ok(Self::ENEMY),
            "wall" | "walls" => Ok(Self::WALL),
            "pickup" | "pickups" | "oxygen" => Ok(Self::PICKUP),
            _ => Err(SimError::DataFormat(format!("unknown collision layer '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionGroups {
    /// Layers this collider is on
    pub memberships: u32,
    /// Layers it accepts contact from
    pub filter: u32,
}

impl CollisionGroups {
    pub const ALL: Self = Self::new(u32::MAX, u32::MAX);
    pub const NONE: Self = Self::new(0, 0);

    pub const fn new(memberships: u32, filter: u32) -> Self {
        Self { memberships, filter }
    }

    /// Member of `layer` only, accepting `targets`
    pub fn on_layer(layer: CollisionLayer, targets: &[CollisionLayer]) -> Self {
        let filter = targets.iter().fold(0, |mask, l| mask | l.as_mask());
        Self::new(layer.as_mask(), filter)
    }

    /// Both sides must accept each other
    pub fn can_collide(&self, other: &CollisionGroups) -> bool {
        self.memberships & other.filter != 0 && other.memberships & self.filter != 0
    }

    pub fn add_filter(mut self, layer: CollisionLayer) -> Self {
        self.filter |= layer.as_mask();
        self
    }

    pub fn remove_filter(mut self, layer: CollisionLayer) -> Self {
        self.filter &= !layer.as_mask();
        self
    }
}

impl Default for CollisionGroups {
    fn default() -> Self {
        Self::ALL
    }
}
