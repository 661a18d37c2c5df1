//! Headless enemy simulation runner
//!
//! Usage: `enemy-sim [enemy_data.json] [settings.json] [frames] [seed]`
//!
//! Loads archetypes, scatters a seeded crowd of enemies inside a walled
//! arena and steps the fixed-timestep loop, logging what collides.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Enemy sim (native) starting...");

    if let Err(e) = headless::run(std::env::args().skip(1).collect()) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is driven by the host page; nothing to run here
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use enemy_sim::consts::{ENEMY_DATA_PATH, SIM_DT};
    use enemy_sim::sim::{Circle, CollisionLayer, EnemySpecStore, RectF, Shape, SimState, SpawnInfo, tick};
    use enemy_sim::{Result, SimError, SimSettings};
    use glam::Vec2;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    const DEFAULT_SETTINGS_PATH: &str = "assets/sim_settings.json";
    const DEFAULT_FRAMES: u64 = 600;
    const DEFAULT_SEED: u64 = 42;
    const SCATTER_COUNT: usize = 24;
    /// Arena half extent; walls sit just outside it
    const ARENA_HALF: f32 = 400.0;
    const WALL_THICKNESS: f32 = 20.0;

    fn parse_arg<T: std::str::FromStr>(args: &[String], index: usize, default: T) -> Result<T> {
        match args.get(index) {
            Some(raw) => raw
                .parse()
                .map_err(|_| SimError::InvalidArgument(format!("could not parse argument '{raw}'"))),
            None => Ok(default),
        }
    }

    pub fn run(args: Vec<String>) -> Result<()> {
        let data_path = args.first().map(String::as_str).unwrap_or(ENEMY_DATA_PATH);
        let settings_path = args.get(1).map(String::as_str).unwrap_or(DEFAULT_SETTINGS_PATH);
        let frames: u64 = parse_arg(&args, 2, DEFAULT_FRAMES)?;
        let seed: u64 = parse_arg(&args, 3, DEFAULT_SEED)?;

        let mut store = EnemySpecStore::new();
        let count = store.load_path(data_path)?;
        log::info!("Loaded {count} enemy archetypes from {data_path}");

        let settings = SimSettings::load_or_default(settings_path);
        let cell_size = settings.grid_cell_size;
        let mut state = SimState::new(settings, &store);
        log::info!(
            "Broad phase: {} (cell size {cell_size})",
            state.collisions.broad_phase().as_str()
        );

        build_arena(&mut state)?;
        let player = state.register_static(
            Shape::Circle(Circle::new(0.0, 0.0, 10.0)),
            CollisionLayer::PLAYER,
        )?;
        log::info!("Player is {:?}", player.0);

        scatter(&mut state, &store, seed)?;
        log::info!("Spawned {} enemies with seed {seed}", state.enemies().len());

        let mut total_contacts = 0usize;
        let mut total_faults = 0usize;
        for _ in 0..frames {
            let report = tick(&mut state, SIM_DT)?;
            total_contacts += report.collisions.len();
            total_faults += report.faults.len();

            let player_hits = report.collisions.iter().filter(|p| p.involves(player.1)).count();
            if player_hits > 0 {
                log::debug!("Frame {}: player touched by {player_hits} collider(s)", report.frame);
            }
            if report.frame % 60 == 0 {
                log::info!(
                    "Frame {}: {} contacts, {} faults",
                    report.frame,
                    report.collisions.len(),
                    report.faults.len()
                );
            }
        }

        log::info!(
            "Ran {frames} frames: {total_contacts} contacts, {total_faults} faults, {} colliders live",
            state.collisions.len()
        );
        Ok(())
    }

    fn build_arena(state: &mut SimState) -> Result<()> {
        let outer = ARENA_HALF + WALL_THICKNESS;
        let span = outer * 2.0;
        let walls = [
            RectF::new(-outer, -outer, span, WALL_THICKNESS),
            RectF::new(-outer, ARENA_HALF, span, WALL_THICKNESS),
            RectF::new(-outer, -outer, WALL_THICKNESS, span),
            RectF::new(ARENA_HALF, -outer, WALL_THICKNESS, span),
        ];
        for wall in walls {
            state.register_static(Shape::Rect(wall), CollisionLayer::WALL)?;
        }
        Ok(())
    }

    /// Spawn a seeded crowd, cycling through every loaded archetype
    fn scatter(state: &mut SimState, store: &EnemySpecStore, seed: u64) -> Result<()> {
        let archetypes: Vec<&String> = store.data().keys().collect();
        if archetypes.is_empty() {
            return Err(SimError::DataFormat("enemy data has no archetypes".to_string()));
        }

        let mut rng = Pcg32::seed_from_u64(seed);
        let margin = ARENA_HALF * 0.75;
        for i in 0..SCATTER_COUNT {
            let archetype = archetypes[i % archetypes.len()];
            let position = Vec2::new(
                rng.random_range(-margin..margin),
                rng.random_range(-margin..margin),
            );
            if let Err(e) = state.spawn(&SpawnInfo::new(archetype.as_str(), position)) {
                log::warn!("Could not spawn '{archetype}': {e}");
            }
        }
        Ok(())
    }
}
