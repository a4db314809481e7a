mod config;
mod scene;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{info, warn};

use pf_core::{FluidModel, Solver, SphModel, TimeManager};

use config::SimConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            info!("loading scenario {}", path.display());
            SimConfig::load(&path)?
        }
        None => {
            info!("no scenario given, running the default dam break");
            let config = SimConfig::default();
            config.validate()?;
            config
        }
    };

    let r = config.fluid.particle_radius;
    let fluid = scene::fluid_block(&config.scene, r);
    let walls = scene::container_walls(&config.scene, r);
    info!("{} fluid particles, {} boundary particles", fluid.len(), walls.len());

    let model = SphModel::new(config.fluid.clone(), fluid, vec![walls]).context("building the fluid model")?;
    let mut time = TimeManager::new(config.time.step_size)?;
    if let Some(cfl) = config.time.cfl {
        time = time.with_cfl(cfl);
    }
    let mut solver = Solver::new(model, time, config.solver.clone())?;

    let start = Instant::now();
    let mut cg_total = 0usize;
    for tick in 1..=config.time.steps {
        solver.step();
        let stats = solver.last_stats();
        cg_total += stats.cg_iterations;

        let max_speed = solver.model.max_speed();
        if !max_speed.is_finite() {
            warn!("tick {tick}: non-finite velocity, stopping");
            break;
        }
        if config.log_every > 0 && tick % config.log_every == 0 {
            info!(
                "tick {tick}: t = {:.4} s, h = {:.2e}, outer {}, cg {}, max speed {:.3} m/s",
                solver.time.time(),
                solver.time.step_size(),
                stats.outer_iterations,
                stats.cg_iterations,
                max_speed
            );
        }
    }

    let n = solver.model.num_particles().max(1);
    let mean_height = (0..solver.model.num_particles())
        .map(|i| solver.model.position(i).y)
        .sum::<f64>()
        / n as f64;
    info!(
        "simulated {:.3} s in {:.2?} ({} cg iterations), mean fluid height {:.4} m",
        solver.time.time(),
        start.elapsed(),
        cg_total,
        mean_height
    );
    Ok(())
}
