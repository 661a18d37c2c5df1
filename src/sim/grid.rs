//! Uniform spatial grid for the collision broad phase
//!
//! Colliders are bucketed by every cell their bounding box touches. Two
//! colliders that share any point share at least one cell, so the candidate
//! set always contains every overlapping pair.

use std::collections::HashMap;

use super::shape::Aabb;

type CellKey = (i32, i32);

/// Grid rebuilt from scratch each detection pass
#[derive(Debug, Default)]
pub struct SpatialGrid {
    cell_size: f32,
    max_cells_per_entry: usize,
    cells: HashMap<CellKey, Vec<usize>>,
    /// Entries too large to bucket; paired against every other entry
    oversized: Vec<usize>,
    /// Every inserted entry, in insertion order
    entries: Vec<usize>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32, max_cells_per_entry: usize) -> Self {
        Self {
            cell_size,
            max_cells_per_entry: max_cells_per_entry.max(1),
            cells: HashMap::new(),
            oversized: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Drop all entries
    ///
    /// Cells left empty by the previous pass are removed; cells that were
    /// occupied keep their allocation, so the map tracks where colliders
    /// currently are instead of everywhere they have been.
    pub fn clear(&mut self) {
        self.cells.retain(|_, bucket| !bucket.is_empty());
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
        self.oversized.clear();
        self.entries.clear();
    }

    #[inline]
    fn cell_coord(&self, v: f32) -> i32 {
        // `as` saturates for out-of-range floats
        (v / self.cell_size).floor() as i32
    }

    /// Insert an entry covering `aabb`
    pub fn insert(&mut self, id: usize, aabb: &Aabb) {
        self.entries.push(id);

        let (x0, y0) = (self.cell_coord(aabb.min.x), self.cell_coord(aabb.min.y));
        let (x1, y1) = (self.cell_coord(aabb.max.x), self.cell_coord(aabb.max.y));
        let span = (x1 as i64 - x0 as i64 + 1) * (y1 as i64 - y0 as i64 + 1);
        if span > self.max_cells_per_entry as i64 {
            self.oversized.push(id);
            return;
        }

        for cx in x0..=x1 {
            for cy in y0..=y1 {
                self.cells.entry((cx, cy)).or_default().push(id);
            }
        }
    }

    /// Collect every candidate pair `(a, b)` with `a < b`, sorted and deduplicated
    pub fn candidate_pairs_into(&self, out: &mut Vec<(usize, usize)>) {
        out.clear();

        for bucket in self.cells.values().filter(|b| b.len() > 1) {
            for (i, &a) in bucket.iter().enumerate() {
                for &b in &bucket[i + 1..] {
                    out.push(ordered(a, b));
                }
            }
        }

        for &big in &self.oversized {
            for &other in &self.entries {
                if other != big {
                    out.push(ordered(big, other));
                }
            }
        }

        out.sort_unstable();
        out.dedup();
    }
}

#[inline]
fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn aabb(x0: f32, y0: f32, x1: f32, y1: f32) -> Aabb {
        Aabb {
            min: Vec2::new(x0, y0),
            max: Vec2::new(x1, y1),
        }
    }

    #[test]
    fn test_neighbors_share_a_cell() {
        let mut grid = SpatialGrid::new(10.0, 64);
        grid.insert(0, &aabb(0.0, 0.0, 5.0, 5.0));
        grid.insert(1, &aabb(4.0, 4.0, 8.0, 8.0));
        grid.insert(2, &aabb(50.0, 50.0, 55.0, 55.0));

        let mut pairs = Vec::new();
        grid.candidate_pairs_into(&mut pairs);
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn test_boundary_touch_is_candidate() {
        let mut grid = SpatialGrid::new(10.0, 64);
        grid.insert(0, &aabb(0.0, 0.0, 10.0, 10.0));
        grid.insert(1, &aabb(10.0, 0.0, 20.0, 10.0));

        let mut pairs = Vec::new();
        grid.candidate_pairs_into(&mut pairs);
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn test_multi_cell_pairs_are_deduplicated() {
        let mut grid = SpatialGrid::new(10.0, 64);
        // Both span the same four cells
        grid.insert(3, &aabb(5.0, 5.0, 15.0, 15.0));
        grid.insert(1, &aabb(6.0, 6.0, 14.0, 14.0));

        let mut pairs = Vec::new();
        grid.candidate_pairs_into(&mut pairs);
        assert_eq!(pairs, vec![(1, 3)]);
    }

    #[test]
    fn test_oversized_entries_pair_with_everything() {
        let mut grid = SpatialGrid::new(1.0, 4);
        grid.insert(0, &aabb(-100.0, -100.0, 100.0, 100.0));
        grid.insert(1, &aabb(500.0, 500.0, 500.5, 500.5));
        grid.insert(2, &aabb(-500.0, 0.0, -499.5, 0.5));

        let mut pairs = Vec::new();
        grid.candidate_pairs_into(&mut pairs);
        assert_eq!(pairs, vec![(0, 1), (0, 2)]);
    }

    #[test]
    fn test_moving_entries_do_not_grow_cells() {
        let mut grid = SpatialGrid::new(10.0, 64);
        for step in 0..1000 {
            let x = step as f32 * 10.0 + 1.0;
            grid.clear();
            grid.insert(0, &aabb(x, 1.0, x + 2.0, 3.0));
            grid.insert(1, &aabb(x, 21.0, x + 2.0, 23.0));
        }
        // Current cells plus the ones vacated by the last pass
        assert!(grid.cells.len() <= 4, "{} cells retained", grid.cells.len());

        grid.clear();
        grid.clear();
        assert!(grid.cells.is_empty());
    }

    #[test]
    fn test_clear_empties_grid() {
        let mut grid = SpatialGrid::new(10.0, 64);
        grid.insert(0, &aabb(0.0, 0.0, 5.0, 5.0));
        grid.insert(1, &aabb(0.0, 0.0, 5.0, 5.0));
        grid.clear();

        let mut pairs = vec![(9, 9)];
        grid.candidate_pairs_into(&mut pairs);
        assert!(pairs.is_empty());
    }
}
