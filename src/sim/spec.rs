//! Enemy archetype definitions and the store that validates and indexes them
//!
//! Raw records come from a JSON document shaped like
//! `{"enemies": {"<id>": {...}, ...}}`. Records are kept in document order
//! and duplicate identifiers are preserved long enough to be rejected.
//!
//! A load either replaces the whole table or leaves it untouched. Enemies
//! hold `Arc<EnemySpec>`, so a reload never changes a live enemy's spec.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use glam::Vec2;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

use super::layers::CollisionLayer;
use super::shape::{Circle, RectF, Shape};
use crate::consts::DEFAULT_FRAME_DURATION;
use crate::{Result, SimError};

/// Per-frame motion policy of an archetype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorKind {
    Stationary,
    Patrol,
    BackAndForth,
}

impl BehaviorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorKind::Stationary => "Stationary",
            BehaviorKind::Patrol => "Patrol",
            BehaviorKind::BackAndForth => "BackAndForth",
        }
    }
}

impl FromStr for BehaviorKind {
    type Err = SimError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Stationary" => Ok(BehaviorKind::Stationary),
            "Patrol" => Ok(BehaviorKind::Patrol),
            "BackAndForth" => Ok(BehaviorKind::BackAndForth),
            _ => Err(SimError::UnsupportedBehaviorKind(s.to_string())),
        }
    }
}

/// Collider shape family of an archetype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColliderKind {
    Rect,
    Circle,
}

impl FromStr for ColliderKind {
    type Err = SimError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "RectF" | "Rect" => Ok(ColliderKind::Rect),
            "Circle" => Ok(ColliderKind::Circle),
            _ => Err(SimError::UnsupportedColliderKind(s.to_string())),
        }
    }
}

/// Collider dimensions, centered on the enemy position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColliderSpec {
    Rect { width: f32, height: f32 },
    Circle { radius: f32 },
}

impl ColliderSpec {
    pub fn kind(&self) -> ColliderKind {
        match self {
            ColliderSpec::Rect { .. } => ColliderKind::Rect,
            ColliderSpec::Circle { .. } => ColliderKind::Circle,
        }
    }

    /// World-space shape for an enemy centered at `center`
    pub fn shape_at(&self, center: Vec2) -> Shape {
        match *self {
            ColliderSpec::Rect { width, height } => {
                Shape::Rect(RectF::centered(center, Vec2::new(width, height)))
            }
            ColliderSpec::Circle { radius } => Shape::Circle(Circle { center, radius }),
        }
    }
}

/// Axis a back-and-forth enemy travels along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TravelAxis {
    #[default]
    X,
    Y,
}

impl TravelAxis {
    pub fn unit(&self) -> Vec2 {
        match self {
            TravelAxis::X => Vec2::X,
            TravelAxis::Y => Vec2::Y,
        }
    }
}

/// Movement parameters consumed by the matching behavior
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MovementParams {
    /// Units per second; zero only for stationary archetypes without a speed
    pub speed: f32,
    /// Patrol route as offsets from the spawn position
    pub waypoints: Vec<Vec2>,
    pub travel_axis: TravelAxis,
    /// Back-and-forth bounds as offsets from the spawn position
    pub range: Option<(f32, f32)>,
    /// Sign picks the initial back-and-forth direction
    pub initial_velocity_x: Option<f32>,
    pub initial_facing_right: bool,
    /// Look-ahead added to terrain probes by whoever resolves tile contacts
    pub collision_offset: f32,
}

/// One animation clip (opaque to the simulation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationSpec {
    pub textures: Vec<String>,
    pub frame_duration_sec: f32,
    pub is_looping: bool,
}

/// Immutable archetype definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySpec {
    pub id: String,
    pub behavior: BehaviorKind,
    pub collider: ColliderSpec,
    pub movement: MovementParams,
    pub layer: CollisionLayer,
    pub physics_size: Option<Vec2>,
    pub animations: BTreeMap<String, AnimationSpec>,
}

// === Raw data source ===

/// `{width, height}` or `{radius}` as written in the data file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSize {
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub radius: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAnimation {
    pub textures: Vec<String>,
    pub frame_duration: Option<f32>,
    pub is_looping: Option<bool>,
}

/// An unvalidated archetype record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEnemyRecord {
    pub behavior: Option<String>,
    pub collider_shape: Option<String>,
    pub collider_size: Option<RawSize>,
    pub physics_size: Option<RawSize>,
    pub speed: Option<f32>,
    pub waypoints: Option<Vec<Vec2>>,
    pub travel_axis: Option<TravelAxis>,
    pub range: Option<(f32, f32)>,
    pub max_travel_distance: Option<f32>,
    pub initial_velocity_x: Option<f32>,
    pub initial_facing_right: Option<bool>,
    pub collision_offset: Option<f32>,
    pub layer: Option<String>,
    pub animations: BTreeMap<String, RawAnimation>,
}

/// A deserialized enemy data source, in document order
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawEnemyTable {
    #[serde(deserialize_with = "ordered_entries")]
    pub enemies: Vec<(String, RawEnemyRecord)>,
}

impl RawEnemyTable {
    pub fn from_entries(entries: impl IntoIterator<Item = (String, RawEnemyRecord)>) -> Self {
        Self {
            enemies: entries.into_iter().collect(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SimError::DataFormat(format!("enemy data: {e}")))
    }
}

/// Collect map entries without collapsing repeated keys
fn ordered_entries<'de, D>(deserializer: D) -> std::result::Result<Vec<(String, RawEnemyRecord)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
        type Value = Vec<(String, RawEnemyRecord)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of enemy identifiers to enemy records")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, RawEnemyRecord>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor)
}

// === Validation ===

fn data_error(id: &str, msg: impl fmt::Display) -> SimError {
    SimError::DataFormat(format!("enemy '{id}': {msg}"))
}

fn positive(id: &str, field: &str, value: Option<f32>) -> Result<f32> {
    match value {
        None => Err(data_error(id, format!("missing required field '{field}'"))),
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        Some(v) => Err(data_error(id, format!("'{field}' must be positive, got {v}"))),
    }
}

impl RawEnemyRecord {
    /// Turn a raw record into a spec, rejecting anything malformed
    pub fn validate(&self, id: &str) -> Result<EnemySpec> {
        let behavior_tag = self
            .behavior
            .as_deref()
            .ok_or_else(|| data_error(id, "missing required field 'behavior'"))?;
        let behavior = behavior_tag
            .parse::<BehaviorKind>()
            .map_err(|e| data_error(id, e))?;

        let collider = self.validate_collider(id)?;

        let speed = match (behavior, self.speed) {
            (BehaviorKind::Stationary, None) => 0.0,
            (_, speed) => positive(id, "speed", speed)?,
        };

        let range = match behavior {
            BehaviorKind::BackAndForth => Some(self.validate_range(id)?),
            _ => self.range,
        };

        let waypoints = self.waypoints.clone().unwrap_or_default();
        if waypoints.iter().any(|w| !w.is_finite()) {
            return Err(data_error(id, "waypoints must be finite"));
        }

        let collision_offset = self.collision_offset.unwrap_or(0.0);
        if !collision_offset.is_finite() {
            return Err(data_error(id, "'collision_offset' must be finite"));
        }

        let physics_size = match &self.physics_size {
            Some(size) => Some(Vec2::new(
                positive(id, "physics_size.width", size.width)?,
                positive(id, "physics_size.height", size.height)?,
            )),
            None => None,
        };

        let layer = match &self.layer {
            Some(tag) => tag.parse::<CollisionLayer>().map_err(|e| data_error(id, e))?,
            None => CollisionLayer::ENEMY,
        };

        let mut animations = BTreeMap::new();
        for (name, raw) in &self.animations {
            if raw.textures.is_empty() {
                log::warn!("Enemy '{id}': animation '{name}' has no textures, skipping");
                continue;
            }
            let frame_duration_sec = match raw.frame_duration {
                Some(_) => positive(id, &format!("animations.{name}.frame_duration"), raw.frame_duration)?,
                None => DEFAULT_FRAME_DURATION,
            };
            animations.insert(
                name.clone(),
                AnimationSpec {
                    textures: raw.textures.clone(),
                    frame_duration_sec,
                    is_looping: raw.is_looping.unwrap_or(true),
                },
            );
        }

        Ok(EnemySpec {
            id: id.to_string(),
            behavior,
            collider,
            movement: MovementParams {
                speed,
                waypoints,
                travel_axis: self.travel_axis.unwrap_or_default(),
                range,
                initial_velocity_x: self.initial_velocity_x,
                initial_facing_right: self.initial_facing_right.unwrap_or(false),
                collision_offset,
            },
            layer,
            physics_size,
            animations,
        })
    }

    fn validate_collider(&self, id: &str) -> Result<ColliderSpec> {
        let shape_tag = self
            .collider_shape
            .as_deref()
            .ok_or_else(|| data_error(id, "missing required field 'collider_shape'"))?;
        let kind = shape_tag
            .parse::<ColliderKind>()
            .map_err(|e| data_error(id, e))?;
        let size = self
            .collider_size
            .as_ref()
            .ok_or_else(|| data_error(id, "missing required field 'collider_size'"))?;

        Ok(match kind {
            ColliderKind::Rect => ColliderSpec::Rect {
                width: positive(id, "collider_size.width", size.width)?,
                height: positive(id, "collider_size.height", size.height)?,
            },
            ColliderKind::Circle => ColliderSpec::Circle {
                radius: positive(id, "collider_size.radius", size.radius)?,
            },
        })
    }

    fn validate_range(&self, id: &str) -> Result<(f32, f32)> {
        match (self.range, self.max_travel_distance) {
            (Some((min, max)), _) => {
                if !(min.is_finite() && max.is_finite() && min < max) {
                    Err(data_error(id, format!("'range' needs min < max, got [{min}, {max}]")))
                } else if min > 0.0 || max < 0.0 {
                    Err(data_error(id, format!("'range' must contain the spawn offset 0, got [{min}, {max}]")))
                } else {
                    Ok((min, max))
                }
            }
            (None, distance) => {
                let d = positive(id, "max_travel_distance", distance)
                    .map_err(|_| data_error(id, "BackAndForth needs 'range' or a positive 'max_travel_distance'"))?;
                Ok((-d, d))
            }
        }
    }
}

// === Store ===

/// Loaded archetypes keyed by identifier
pub type SpecTable = BTreeMap<String, Arc<EnemySpec>>;

/// Validated, immutable-after-load table of enemy archetypes
#[derive(Debug, Default)]
pub struct EnemySpecStore {
    table: Arc<SpecTable>,
    loaded: bool,
}

impl EnemySpecStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate every record and swap the table in; on error nothing changes
    pub fn load_enemy_data(&mut self, source: RawEnemyTable) -> Result<usize> {
        let mut table = SpecTable::new();
        for (id, record) in &source.enemies {
            let spec = record.validate(id)?;
            if table.insert(id.clone(), Arc::new(spec)).is_some() {
                return Err(SimError::DuplicateKey(id.clone()));
            }
        }

        let count = table.len();
        self.table = Arc::new(table);
        self.loaded = true;
        log::info!("Loaded {count} enemy archetypes");
        Ok(count)
    }

    /// Parse a JSON document and load it
    pub fn load_json_str(&mut self, json: &str) -> Result<usize> {
        self.load_enemy_data(RawEnemyTable::from_json_str(json)?)
    }

    /// Read a JSON file and load it
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| SimError::DataFormat(format!("{}: {e}", path.display())))?;
        self.load_json_str(&json)
    }

    /// Whether a load has succeeded
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Look up an archetype; a miss is an ordinary `None`
    pub fn try_get_spec(&self, id: &str) -> Option<Arc<EnemySpec>> {
        self.table.get(id).cloned()
    }

    /// Every loaded archetype, ordered by identifier
    pub fn data(&self) -> &SpecTable {
        &self.table
    }

    /// Shared handle to the current table; unaffected by later reloads
    pub fn snapshot(&self) -> Arc<SpecTable> {
        Arc::clone(&self.table)
    }
}
