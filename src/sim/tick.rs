//! Fixed timestep simulation tick
//!
//! One frame: update every live enemy in id order, then run a single
//! collision pass. Per-enemy contract violations are collected instead of
//! aborting the frame; consumers decide what a collision means.

use super::collision::{CollisionPair, EntityId};
use super::state::SimState;
use crate::{Result, SimError, check_delta_time};

/// An enemy whose update failed this frame
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyFault {
    pub enemy: EntityId,
    pub error: SimError,
}

/// Outcome of one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Frame number after this tick
    pub frame: u64,
    /// Overlapping pairs, sorted by handle
    pub collisions: Vec<CollisionPair>,
    /// Enemies that could not be updated
    pub faults: Vec<EnemyFault>,
}

/// Advance the simulation by one frame
///
/// An invalid `dt` is rejected before any enemy moves.
pub fn tick(state: &mut SimState, dt: f32) -> Result<FrameReport> {
    let dt = check_delta_time(dt)?;

    let mut faults = Vec::new();
    let (enemies, collisions) = state.enemies_and_collisions();
    for enemy in enemies.iter_mut() {
        if let Err(error) = enemy.update(dt, collisions) {
            log::warn!("Enemy {:?} ('{}') update failed: {error}", enemy.id(), enemy.spec().id);
            faults.push(EnemyFault {
                enemy: enemy.id(),
                error,
            });
        }
    }

    let pairs = state.collisions.detect_collisions();
    state.frame += 1;

    Ok(FrameReport {
        frame: state.frame,
        collisions: pairs,
        faults,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::settings::SimSettings;
    use crate::sim::enemy::SpawnInfo;
    use crate::sim::layers::CollisionLayer;
    use crate::sim::shape::{RectF, Shape};
    use crate::sim::spec::EnemySpecStore;
    use glam::Vec2;

    const DATA: &str = r#"{ "enemies": {
        "pacer": {
            "behavior": "BackAndForth",
            "collider_shape": "RectF",
            "collider_size": { "width": 2, "height": 2 },
            "speed": 60,
            "range": [-20, 20]
        },
        "post": { "behavior": "Stationary", "collider_shape": "Circle", "collider_size": { "radius": 1 } }
    } }"#;

    fn state() -> SimState {
        let mut store = EnemySpecStore::new();
        store.load_json_str(DATA).unwrap();
        SimState::new(SimSettings::default(), &store)
    }

    #[test]
    fn test_tick_reports_contact() {
        let mut state = state();
        let pacer = state.spawn(&SpawnInfo::new("pacer", Vec2::ZERO)).unwrap();
        let (_, wall) = state
            .register_static(Shape::Rect(RectF::new(10.0, -5.0, 2.0, 10.0)), CollisionLayer::WALL)
            .unwrap();

        let report = tick(&mut state, SIM_DT).unwrap();
        assert_eq!(report.frame, 1);
        assert!(report.collisions.is_empty());

        // Pacer moves one unit per frame; its right edge reaches x = 10 after 9 frames
        let mut hit_frame = None;
        for _ in 0..20 {
            let report = tick(&mut state, SIM_DT).unwrap();
            if report.collisions.iter().any(|p| p.involves(wall)) {
                hit_frame = Some(report.frame);
                break;
            }
        }
        assert!(hit_frame.is_some());
        let pacer_handle = state.enemy(pacer).unwrap().collider();
        assert!(state.collisions.detect_collisions().iter().any(|p| p.involves(pacer_handle)));
    }

    #[test]
    fn test_tick_rejects_bad_dt_without_moving() {
        let mut state = state();
        let pacer = state.spawn(&SpawnInfo::new("pacer", Vec2::ZERO)).unwrap();
        assert!(matches!(tick(&mut state, -SIM_DT), Err(SimError::InvalidArgument(_))));
        assert!(matches!(tick(&mut state, f32::NAN), Err(SimError::InvalidArgument(_))));
        assert_eq!(state.enemy(pacer).unwrap().position(), Vec2::ZERO);
        assert_eq!(state.frame, 0);
    }

    #[test]
    fn test_fault_does_not_stop_frame() {
        let mut state = state();
        let broken = state.spawn(&SpawnInfo::new("pacer", Vec2::ZERO)).unwrap();
        let healthy = state.spawn(&SpawnInfo::new("pacer", Vec2::new(100.0, 0.0))).unwrap();

        // Yank the first enemy's collider out from under it
        let handle = state.enemy(broken).unwrap().collider();
        state.collisions.unregister(handle);

        let report = tick(&mut state, SIM_DT).unwrap();
        assert_eq!(
            report.faults,
            vec![EnemyFault {
                enemy: broken,
                error: SimError::InvalidHandle(handle),
            }]
        );
        assert!((state.enemy(healthy).unwrap().position().x - 101.0).abs() < 1e-3);
    }

    #[test]
    fn test_determinism() {
        let run = || {
            let mut state = state();
            for i in 0..8 {
                let archetype = if i % 2 == 0 { "pacer" } else { "post" };
                state
                    .spawn(&SpawnInfo::new(archetype, Vec2::new(i as f32 * 3.0, 0.0)))
                    .unwrap();
            }
            (0..120)
                .map(|_| tick(&mut state, SIM_DT).unwrap().collisions)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
