//! Collider registry and per-frame overlap detection
//!
//! Colliders live in a generational arena. A handle stays valid until it is
//! unregistered; after that every lookup through it fails with
//! `InvalidHandle` instead of reaching whatever reuses the slot.
//!
//! Detection results are sorted by handle, so a fixed set of collider states
//! always yields the same sequence.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::grid::SpatialGrid;
use super::layers::{CollisionGroups, CollisionLayer};
use super::shape::Shape;
use crate::settings::{BroadPhase, SimSettings};
use crate::{Result, SimError};

/// Index into the owner's external entity table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Opaque, generation-checked reference to a registered collider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColliderHandle {
    index: u32,
    generation: u32,
}

impl ColliderHandle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// A registered collision shape tied to (but never owning) an entity
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    pub shape: Shape,
    pub owner: EntityId,
    pub layer: CollisionLayer,
    pub groups: CollisionGroups,
}

impl Collider {
    /// Collider using the layer's default groups
    pub fn new(shape: impl Into<Shape>, owner: EntityId, layer: CollisionLayer) -> Self {
        Self {
            shape: shape.into(),
            owner,
            layer,
            groups: layer.default_groups(),
        }
    }

    pub fn with_groups(mut self, groups: CollisionGroups) -> Self {
        self.groups = groups;
        self
    }
}

/// One overlapping pair, always with `a < b`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionPair {
    pub a: ColliderHandle,
    pub b: ColliderHandle,
}

impl CollisionPair {
    /// Whether `handle` is one side of this pair
    pub fn involves(&self, handle: ColliderHandle) -> bool {
        self.a == handle || self.b == handle
    }

    /// The side opposite `handle`, if `handle` is in the pair
    pub fn other(&self, handle: ColliderHandle) -> Option<ColliderHandle> {
        if self.a == handle {
            Some(self.b)
        } else if self.b == handle {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Extra predicate consulted after the group masks
pub type PairFilter = Box<dyn Fn(&Collider, &Collider) -> bool>;

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    collider: Option<Collider>,
}

/// Registry of active colliders
pub struct CollisionSystem {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    broad_phase: BroadPhase,
    grid: SpatialGrid,
    pair_filter: Option<PairFilter>,
    candidates: Vec<(usize, usize)>,
}

impl fmt::Debug for CollisionSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollisionSystem")
            .field("live", &self.live)
            .field("slots", &self.slots.len())
            .field("broad_phase", &self.broad_phase)
            .field("pair_filter", &self.pair_filter.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for CollisionSystem {
    fn default() -> Self {
        Self::new(&SimSettings::default())
    }
}

impl CollisionSystem {
    pub fn new(settings: &SimSettings) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            broad_phase: settings.broad_phase,
            grid: SpatialGrid::new(settings.grid_cell_size, settings.max_cells_per_collider),
            pair_filter: None,
            candidates: Vec::new(),
        }
    }

    pub fn broad_phase(&self) -> BroadPhase {
        self.broad_phase
    }

    /// Number of registered colliders
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Add a collider and return its handle
    pub fn register(&mut self, collider: Collider) -> Result<ColliderHandle> {
        collider.shape.validate()?;

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.collider = Some(collider);
        self.live += 1;

        Ok(ColliderHandle {
            index,
            generation: slot.generation,
        })
    }

    /// Remove a collider; returns false (and changes nothing) for stale handles
    pub fn unregister(&mut self, handle: ColliderHandle) -> bool {
        let Some(slot) = self.slot_mut(handle) else {
            log::debug!("Ignoring unregister of stale collider {handle:?}");
            return false;
        };
        slot.collider = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        true
    }

    /// Replace a collider's shape ahead of the next detection pass
    pub fn update_bounds(&mut self, handle: ColliderHandle, shape: Shape) -> Result<()> {
        if !self.contains(handle) {
            return Err(SimError::InvalidHandle(handle));
        }
        shape.validate()?;
        if let Some(collider) = self.slot_mut(handle).and_then(|s| s.collider.as_mut()) {
            collider.shape = shape;
        }
        Ok(())
    }

    /// Replace a collider's membership/filter masks
    pub fn set_groups(&mut self, handle: ColliderHandle, groups: CollisionGroups) -> Result<()> {
        let collider = self
            .slot_mut(handle)
            .and_then(|s| s.collider.as_mut())
            .ok_or(SimError::InvalidHandle(handle))?;
        collider.groups = groups;
        Ok(())
    }

    pub fn contains(&self, handle: ColliderHandle) -> bool {
        self.collider(handle).is_some()
    }

    pub fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.collider.as_ref())
    }

    /// Entity that registered this collider
    pub fn owner(&self, handle: ColliderHandle) -> Option<EntityId> {
        self.collider(handle).map(|c| c.owner)
    }

    /// Remove every collider; all outstanding handles become stale
    pub fn clear(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            if slot.collider.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.free.push(index as u32);
        }
        self.live = 0;
    }

    /// Install a predicate that must also accept a pair before it is tested
    pub fn set_pair_filter<F>(&mut self, filter: F)
    where
        F: Fn(&Collider, &Collider) -> bool + 'static,
    {
        self.pair_filter = Some(Box::new(filter));
    }

    pub fn clear_pair_filter(&mut self) {
        self.pair_filter = None;
    }

    /// Report every overlapping eligible pair exactly once, sorted by handle
    pub fn detect_collisions(&mut self) -> Vec<CollisionPair> {
        match self.broad_phase {
            BroadPhase::Naive => self.detect_all_pairs(),
            BroadPhase::Grid => self.detect_with_grid(),
        }
    }

    /// Reference all-pairs detection, independent of the configured broad phase
    pub fn detect_all_pairs(&self) -> Vec<CollisionPair> {
        let mut pairs = Vec::new();
        for i in 0..self.slots.len() {
            let Some(a) = self.slots[i].collider.as_ref() else {
                continue;
            };
            for j in (i + 1)..self.slots.len() {
                let Some(b) = self.slots[j].collider.as_ref() else {
                    continue;
                };
                if self.eligible(a, b) && a.shape.overlaps(&b.shape) {
                    pairs.push(self.pair(i, j));
                }
            }
        }
        pairs
    }

    fn detect_with_grid(&mut self) -> Vec<CollisionPair> {
        self.grid.clear();
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(collider) = &slot.collider {
                self.grid.insert(index, &collider.shape.aabb());
            }
        }

        let mut candidates = std::mem::take(&mut self.candidates);
        self.grid.candidate_pairs_into(&mut candidates);

        let mut pairs = Vec::new();
        for &(i, j) in &candidates {
            let (Some(a), Some(b)) = (&self.slots[i].collider, &self.slots[j].collider) else {
                continue;
            };
            if self.eligible(a, b) && a.shape.overlaps(&b.shape) {
                pairs.push(self.pair(i, j));
            }
        }

        self.candidates = candidates;
        // Candidates arrive sorted by slot index, which is handle order
        pairs
    }

    /// Colliders overlapping `shape` whose groups accept `groups`
    pub fn query(&self, shape: &Shape, groups: CollisionGroups) -> Vec<ColliderHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let collider = slot.collider.as_ref()?;
                (collider.groups.can_collide(&groups) && collider.shape.overlaps(shape)).then_some(
                    ColliderHandle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                )
            })
            .collect()
    }

    /// Iterate live colliders in handle order
    pub fn iter(&self) -> impl Iterator<Item = (ColliderHandle, &Collider)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.collider.as_ref().map(|c| {
                (
                    ColliderHandle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    c,
                )
            })
        })
    }

    fn eligible(&self, a: &Collider, b: &Collider) -> bool {
        a.groups.can_collide(&b.groups) && self.pair_filter.as_ref().is_none_or(|f| f(a, b))
    }

    fn pair(&self, i: usize, j: usize) -> CollisionPair {
        CollisionPair {
            a: ColliderHandle {
                index: i as u32,
                generation: self.slots[i].generation,
            },
            b: ColliderHandle {
                index: j as u32,
                generation: self.slots[j].generation,
            },
        }
    }

    fn slot_mut(&mut self, handle: ColliderHandle) -> Option<&mut Slot> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation && s.collider.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::shape::{Circle, RectF};
    use glam::Vec2;
    use proptest::prelude::*;

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Collider {
        Collider::new(RectF::new(x, y, w, h), EntityId(0), CollisionLayer::DEFAULT)
    }

    fn circle(x: f32, y: f32, r: f32) -> Collider {
        Collider::new(Circle::new(x, y, r), EntityId(0), CollisionLayer::DEFAULT)
    }

    fn both_phases() -> [CollisionSystem; 2] {
        [
            CollisionSystem::new(&SimSettings::naive()),
            CollisionSystem::new(&SimSettings::default()),
        ]
    }

    #[test]
    fn test_broad_phase_follows_settings() {
        let [naive, grid] = both_phases();
        assert_eq!(naive.broad_phase(), BroadPhase::Naive);
        assert_eq!(grid.broad_phase(), BroadPhase::Grid);
    }

    #[test]
    fn test_rect_pairs() {
        for mut system in both_phases() {
            let a = system.register(rect(0.0, 0.0, 10.0, 10.0)).unwrap();
            let b = system.register(rect(5.0, 5.0, 10.0, 10.0)).unwrap();
            let _c = system.register(rect(20.0, 20.0, 10.0, 10.0)).unwrap();

            assert_eq!(system.detect_collisions(), vec![CollisionPair { a, b }]);
        }
    }

    #[test]
    fn test_circle_pairs() {
        for mut system in both_phases() {
            let a = system.register(circle(0.0, 0.0, 5.0)).unwrap();
            let b = system.register(circle(9.0, 0.0, 5.0)).unwrap();
            assert_eq!(system.detect_collisions(), vec![CollisionPair { a, b }]);

            system.update_bounds(b, Circle::new(11.0, 0.0, 5.0).into()).unwrap();
            assert!(system.detect_collisions().is_empty());
        }
    }

    #[test]
    fn test_mixed_shapes() {
        for mut system in both_phases() {
            let r = system.register(rect(0.0, 0.0, 10.0, 10.0)).unwrap();
            let c = system.register(circle(13.0, 5.0, 4.0)).unwrap();
            let far = system.register(circle(13.0, 14.0, 4.0)).unwrap();

            let pairs = system.detect_collisions();
            assert_eq!(pairs, vec![CollisionPair { a: r, b: c }]);
            assert!(pairs.iter().all(|p| !p.involves(far)));
        }
    }

    #[test]
    fn test_double_unregister_is_noop() {
        for mut system in both_phases() {
            let a = system.register(rect(0.0, 0.0, 10.0, 10.0)).unwrap();
            let b = system.register(rect(5.0, 5.0, 10.0, 10.0)).unwrap();
            let c = system.register(rect(8.0, 8.0, 10.0, 10.0)).unwrap();

            assert!(system.unregister(a));
            let before = system.detect_collisions();
            assert!(!system.unregister(a));
            assert_eq!(system.detect_collisions(), before);
            assert_eq!(before, vec![CollisionPair { a: b, b: c }]);
            assert_eq!(system.len(), 2);
        }
    }

    #[test]
    fn test_stale_handle_after_slot_reuse() {
        let mut system = CollisionSystem::default();
        let old = system.register(rect(0.0, 0.0, 1.0, 1.0)).unwrap();
        system.unregister(old);
        let new = system.register(rect(0.0, 0.0, 1.0, 1.0)).unwrap();

        assert_eq!(old.index(), new.index());
        assert_ne!(old, new);
        assert!(system.collider(old).is_none());
        assert_eq!(
            system.update_bounds(old, RectF::new(1.0, 1.0, 1.0, 1.0).into()),
            Err(SimError::InvalidHandle(old))
        );
        assert!(!system.unregister(old));
        assert!(system.contains(new));
    }

    #[test]
    fn test_update_bounds_rejects_bad_shape_without_mutation() {
        let mut system = CollisionSystem::default();
        let h = system.register(rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        let err = system.update_bounds(h, RectF::new(0.0, 0.0, -1.0, 10.0).into());
        assert!(matches!(err, Err(SimError::InvalidArgument(_))));
        assert_eq!(
            system.collider(h).unwrap().shape,
            Shape::Rect(RectF::new(0.0, 0.0, 10.0, 10.0))
        );
    }

    #[test]
    fn test_register_rejects_bad_shape() {
        let mut system = CollisionSystem::default();
        assert!(matches!(
            system.register(circle(0.0, 0.0, 0.0)),
            Err(SimError::InvalidArgument(_))
        ));
        assert!(system.is_empty());
    }

    #[test]
    fn test_group_masks_filter_pairs() {
        let mut system = CollisionSystem::default();
        let w1 = system
            .register(Collider::new(RectF::new(0.0, 0.0, 10.0, 10.0), EntityId(1), CollisionLayer::WALL))
            .unwrap();
        let _w2 = system
            .register(Collider::new(RectF::new(5.0, 0.0, 10.0, 10.0), EntityId(2), CollisionLayer::WALL))
            .unwrap();
        let e = system
            .register(Collider::new(Circle::new(1.0, 1.0, 2.0), EntityId(3), CollisionLayer::ENEMY))
            .unwrap();

        // Wall-wall is filtered, enemy-wall is not
        assert_eq!(system.detect_collisions(), vec![CollisionPair { a: w1, b: e }]);
    }

    #[test]
    fn test_pair_filter_predicate() {
        let mut system = CollisionSystem::default();
        let a = system.register(Collider::new(Circle::new(0.0, 0.0, 5.0), EntityId(7), CollisionLayer::DEFAULT)).unwrap();
        let b = system.register(Collider::new(Circle::new(1.0, 0.0, 5.0), EntityId(7), CollisionLayer::DEFAULT)).unwrap();
        let c = system.register(Collider::new(Circle::new(2.0, 0.0, 5.0), EntityId(8), CollisionLayer::DEFAULT)).unwrap();

        // Parts of the same entity never collide with each other
        system.set_pair_filter(|x, y| x.owner != y.owner);
        assert_eq!(
            system.detect_collisions(),
            vec![CollisionPair { a, b: c }, CollisionPair { a: b, b: c }]
        );

        system.clear_pair_filter();
        assert_eq!(system.detect_collisions().len(), 3);
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut system = CollisionSystem::default();
        let a = system.register(circle(0.0, 0.0, 1.0)).unwrap();
        system.clear();
        assert!(system.is_empty());
        assert!(!system.contains(a));
        let b = system.register(circle(0.0, 0.0, 1.0)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_query_and_owner() {
        let mut system = CollisionSystem::default();
        let a = system
            .register(Collider::new(RectF::new(0.0, 0.0, 10.0, 10.0), EntityId(42), CollisionLayer::ENEMY))
            .unwrap();
        let _b = system
            .register(Collider::new(RectF::new(50.0, 0.0, 10.0, 10.0), EntityId(43), CollisionLayer::ENEMY))
            .unwrap();

        let probe = Shape::Circle(Circle::new(12.0, 5.0, 3.0));
        assert_eq!(system.query(&probe, CollisionGroups::ALL), vec![a]);
        assert_eq!(system.owner(a), Some(EntityId(42)));
        assert!(system.query(&probe, CollisionGroups::NONE).is_empty());
    }

    #[test]
    fn test_pair_other_side() {
        let mut system = CollisionSystem::default();
        let a = system.register(circle(0.0, 0.0, 1.0)).unwrap();
        let b = system.register(circle(1.0, 0.0, 1.0)).unwrap();
        let pair = system.detect_collisions()[0];
        assert_eq!(pair.other(a), Some(b));
        assert_eq!(pair.other(b), Some(a));
    }

    fn arb_shape() -> impl Strategy<Value = Shape> {
        prop_oneof![
            (-200.0f32..200.0, -200.0f32..200.0, 0.5f32..80.0, 0.5f32..80.0)
                .prop_map(|(x, y, w, h)| Shape::Rect(RectF::new(x, y, w, h))),
            (-200.0f32..200.0, -200.0f32..200.0, 0.5f32..60.0)
                .prop_map(|(x, y, r)| Shape::Circle(Circle { center: Vec2::new(x, y), radius: r })),
        ]
    }

    proptest! {
        #[test]
        fn prop_grid_matches_all_pairs(
            shapes in prop::collection::vec((arb_shape(), 0u32..5), 0..60),
            removals in prop::collection::vec(any::<prop::sample::Index>(), 0..10),
            cell in 4.0f32..100.0,
        ) {
            let settings = SimSettings { grid_cell_size: cell, max_cells_per_collider: 16, ..SimSettings::default() };
            let mut system = CollisionSystem::new(&settings);
            let mut handles = Vec::new();
            for (i, (shape, layer)) in shapes.iter().enumerate() {
                let collider = Collider::new(*shape, EntityId(i as u32), CollisionLayer::custom(*layer));
                handles.push(system.register(collider).unwrap());
            }
            for idx in &removals {
                if !handles.is_empty() {
                    system.unregister(handles[idx.index(handles.len())]);
                }
            }

            let grid = system.detect_collisions();
            let naive = system.detect_all_pairs();
            prop_assert_eq!(&grid, &naive);

            for pair in &grid {
                prop_assert!(pair.a < pair.b);
            }
            for w in grid.windows(2) {
                prop_assert!(w[0] < w[1]);
            }
            // Repeated calls are stable
            prop_assert_eq!(system.detect_collisions(), grid);
        }
    }
}
