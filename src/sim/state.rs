//! Simulation state: live enemies, static colliders and the collision system
//!
//! Stands in for the stage/scene that owns enemies. Enemies are kept sorted
//! by entity id so iteration order is deterministic.

use std::sync::Arc;

use super::collision::{Collider, ColliderHandle, CollisionSystem, EntityId};
use super::enemy::{Enemy, SpawnInfo};
use super::layers::CollisionLayer;
use super::shape::Shape;
use super::spec::{EnemySpecStore, SpecTable};
use crate::settings::SimSettings;
use crate::{Result, SimError};

/// Everything one frame loop updates
#[derive(Debug)]
pub struct SimState {
    pub settings: SimSettings,
    pub collisions: CollisionSystem,
    /// Archetypes spawns are resolved against
    specs: Arc<SpecTable>,
    /// Live enemies, sorted by id
    enemies: Vec<Enemy>,
    /// Simulation frame counter
    pub frame: u64,
    next_id: u32,
}

impl SimState {
    /// Create a state that spawns from the store's current table
    pub fn new(settings: SimSettings, store: &EnemySpecStore) -> Self {
        Self {
            collisions: CollisionSystem::new(&settings),
            settings,
            specs: store.snapshot(),
            enemies: Vec::new(),
            frame: 0,
            next_id: 1,
        }
    }

    /// Pick up a reloaded table; existing enemies keep their old specs
    pub fn refresh_specs(&mut self, store: &EnemySpecStore) {
        self.specs = store.snapshot();
    }

    /// Allocate a new entity ID; ids are never reused
    pub fn next_entity_id(&mut self) -> Result<EntityId> {
        let id = EntityId(self.next_id);
        self.next_id = self.next_id.checked_add(1).ok_or(SimError::EntityIdsExhausted)?;
        Ok(id)
    }

    /// Spawn an enemy from a spawn record
    pub fn spawn(&mut self, spawn: &SpawnInfo) -> Result<EntityId> {
        let spec = self
            .specs
            .get(&spawn.archetype)
            .cloned()
            .ok_or_else(|| SimError::UnknownArchetype(spawn.archetype.clone()))?;

        let id = self.next_entity_id()?;
        let enemy = Enemy::spawn(id, spec, spawn, &self.settings, &mut self.collisions)?;
        // Ids only grow, so pushing keeps the list sorted
        self.enemies.push(enemy);
        Ok(id)
    }

    /// Remove an enemy and release its collider; false if it was not alive
    pub fn despawn(&mut self, id: EntityId) -> bool {
        match self.enemies.binary_search_by_key(&id, |e| e.id()) {
            Ok(index) => {
                let enemy = self.enemies.remove(index);
                enemy.despawn(&mut self.collisions);
                true
            }
            Err(_) => false,
        }
    }

    /// Despawn every enemy that has been killed
    pub fn despawn_dead(&mut self) -> usize {
        let (dead, alive): (Vec<Enemy>, Vec<Enemy>) =
            std::mem::take(&mut self.enemies).into_iter().partition(|e| !e.is_alive());
        self.enemies = alive;
        let count = dead.len();
        for enemy in dead {
            enemy.despawn(&mut self.collisions);
        }
        count
    }

    /// Register non-enemy geometry (walls, the player, pickups)
    pub fn register_static(&mut self, shape: Shape, layer: CollisionLayer) -> Result<(EntityId, ColliderHandle)> {
        let id = self.next_entity_id()?;
        let handle = self.collisions.register(Collider::new(shape, id, layer))?;
        Ok((id, handle))
    }

    pub fn enemy(&self, id: EntityId) -> Option<&Enemy> {
        self.enemies
            .binary_search_by_key(&id, |e| e.id())
            .ok()
            .map(|index| &self.enemies[index])
    }

    pub fn enemy_mut(&mut self, id: EntityId) -> Option<&mut Enemy> {
        self.enemies
            .binary_search_by_key(&id, |e| e.id())
            .ok()
            .map(|index| &mut self.enemies[index])
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub(crate) fn enemies_and_collisions(&mut self) -> (&mut [Enemy], &mut CollisionSystem) {
        (&mut self.enemies, &mut self.collisions)
    }

    /// Enemy owning a collider, if any
    pub fn enemy_by_collider(&self, handle: ColliderHandle) -> Option<&Enemy> {
        self.collisions.owner(handle).and_then(|id| self.enemy(id))
    }
}

impl Drop for SimState {
    fn drop(&mut self) {
        for enemy in self.enemies.drain(..) {
            enemy.despawn(&mut self.collisions);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::shape::RectF;
    use glam::Vec2;

    const DATA: &str = r#"{ "enemies": {
        "rock": { "behavior": "Stationary", "collider_shape": "Circle", "collider_size": { "radius": 4 } }
    } }"#;

    fn state() -> SimState {
        let mut store = EnemySpecStore::new();
        store.load_json_str(DATA).unwrap();
        SimState::new(SimSettings::default(), &store)
    }

    #[test]
    fn test_spawn_and_despawn() {
        let mut state = state();
        let a = state.spawn(&SpawnInfo::new("rock", Vec2::ZERO)).unwrap();
        let b = state.spawn(&SpawnInfo::new("rock", Vec2::new(50.0, 0.0))).unwrap();
        assert!(a < b);
        assert_eq!(state.enemies().len(), 2);
        assert_eq!(state.collisions.len(), 2);

        assert!(state.despawn(a));
        assert!(!state.despawn(a));
        assert!(state.enemy(a).is_none());
        assert!(state.enemy(b).is_some());
        assert_eq!(state.collisions.len(), 1);
    }

    #[test]
    fn test_unknown_archetype() {
        let mut state = state();
        assert_eq!(
            state.spawn(&SpawnInfo::new("dragon", Vec2::ZERO)),
            Err(SimError::UnknownArchetype("dragon".to_string()))
        );
        assert!(state.enemies().is_empty());
    }

    #[test]
    fn test_despawn_dead() {
        let mut state = state();
        let a = state.spawn(&SpawnInfo::new("rock", Vec2::ZERO)).unwrap();
        let b = state.spawn(&SpawnInfo::new("rock", Vec2::new(10.0, 0.0))).unwrap();
        state.enemy_mut(a).unwrap().kill();

        assert_eq!(state.despawn_dead(), 1);
        assert!(state.enemy(a).is_none());
        assert!(state.enemy(b).is_some());
        assert_eq!(state.collisions.len(), 1);
    }

    #[test]
    fn test_entity_ids_run_out_cleanly() {
        let mut state = state();
        state.next_id = u32::MAX - 1;
        let last = state.spawn(&SpawnInfo::new("rock", Vec2::ZERO)).unwrap();
        assert_eq!(last, EntityId(u32::MAX - 1));

        assert_eq!(
            state.spawn(&SpawnInfo::new("rock", Vec2::ZERO)),
            Err(SimError::EntityIdsExhausted)
        );
        assert_eq!(
            state
                .register_static(Shape::Rect(RectF::new(0.0, 0.0, 1.0, 1.0)), CollisionLayer::WALL)
                .map(|(id, _)| id),
            Err(SimError::EntityIdsExhausted)
        );
        assert_eq!(state.enemies().len(), 1);
        assert_eq!(state.collisions.len(), 1);
    }

    #[test]
    fn test_static_colliders_and_owner_lookup() {
        let mut state = state();
        let (wall, wall_handle) = state
            .register_static(Shape::Rect(RectF::new(-10.0, 4.0, 20.0, 4.0)), CollisionLayer::WALL)
            .unwrap();
        let rock = state.spawn(&SpawnInfo::new("rock", Vec2::ZERO)).unwrap();

        assert_eq!(state.collisions.owner(wall_handle), Some(wall));
        assert!(state.enemy_by_collider(wall_handle).is_none());
        let rock_handle = state.enemy(rock).unwrap().collider();
        assert_eq!(state.enemy_by_collider(rock_handle).map(|e| e.id()), Some(rock));
    }
}
