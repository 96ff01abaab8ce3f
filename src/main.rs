//! 2D Lennard-Jones Particle Sandbox
//!
//! Builds a scene of a hanging chain and a loose particle cloud, then runs the
//! simulation headless and logs what happened.

use particle_physics::{ParticleKind, Vector2};
use particle_sandbox::{Command, Driver};
use particle_simulation::{Simulation, SimulationError, SimulationParams};
use rand::Rng;
use std::time::Instant;

const WIDTH: f64 = 1920.0;
const HEIGHT: f64 = 1080.0;
const TICKS_PER_SECOND: f64 = 10_000.0;
const TICKS: usize = 20_000;
const REPORT_EVERY: usize = 2_000;

const CLOUD_PARTICLE_COUNT: usize = 400;
const CHAIN_LINKS: usize = 12;

/// Chain of connected particles hanging between two fixed anchors
fn build_chain(driver: &mut Driver) -> Result<(), SimulationError> {
    let spacing = driver.simulation().params().lattice_spacing();
    let start = Vector2::new(WIDTH * 0.25, HEIGHT * 0.2);
    let end = start + Vector2::new(2.0 * spacing * (CHAIN_LINKS + 1) as f64, 0.0);

    let sim = driver.simulation_mut();
    let mut ids = Vec::with_capacity(CHAIN_LINKS + 2);
    for i in 0..=CHAIN_LINKS + 1 {
        let pos = sim.snap(start.lerp(end, i as f64 / (CHAIN_LINKS + 1) as f64));
        let id = if i == 0 || i == CHAIN_LINKS + 1 {
            sim.add_fixed_particle_at(pos)?
        } else {
            sim.add_particle_at(pos)?
        };
        ids.extend(id);
    }

    for pair in ids.windows(2) {
        sim.connect(pair[0], pair[1]);
    }

    log::info!("✓ Chain with {} links", ids.len());
    Ok(())
}

/// Random particles dropped on the lower half of the domain
fn build_cloud(driver: &mut Driver) -> Result<(), SimulationError> {
    let mut rng = rand::rng();

    for _ in 0..CLOUD_PARTICLE_COUNT {
        let pos = Vector2::new(
            rng.random_range(0.0..WIDTH),
            rng.random_range(HEIGHT * 0.5..HEIGHT),
        );
        let fixed = rng.random::<f64>() < 0.05;
        driver.apply(Command::Place { pos, fixed })?;
    }

    log::info!(
        "✓ Cloud placed, {} particles in total",
        driver.simulation().particle_count()
    );
    Ok(())
}

fn log_stats(sim: &Simulation, elapsed_ms: f64) {
    let (count, kinetic, fixed) = sim.particles().fold(
        (0usize, 0.0, 0usize),
        |(count, kinetic, fixed), (_, p)| {
            (
                count + 1,
                kinetic + 0.5 * p.mass() * p.velocity().length_squared(),
                fixed + usize::from(p.kind() == ParticleKind::Fixed),
            )
        },
    );

    log::info!(
        "tick {:>6}: {} particles ({} fixed), {} connections, kinetic energy {:.3e}, {:.1} ms",
        sim.tick_count(),
        count,
        fixed,
        sim.grid().connections().len(),
        kinetic,
        elapsed_ms
    );
}

fn main() -> Result<(), SimulationError> {
    // Initialize logger (RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting 2D particle sandbox...");

    let params = SimulationParams::default().with_domain(WIDTH, HEIGHT);
    let mut driver = Driver::new(Simulation::new(params)?, TICKS_PER_SECOND);

    build_chain(&mut driver)?;
    build_cloud(&mut driver)?;

    let mut last_report = Instant::now();
    for chunk in 0..TICKS / REPORT_EVERY {
        driver.run(REPORT_EVERY);
        log_stats(driver.simulation(), last_report.elapsed().as_secs_f64() * 1000.0);
        last_report = Instant::now();

        // Halfway through, switch gravity off and let the scene relax
        if chunk + 1 == TICKS / REPORT_EVERY / 2 {
            driver.apply(Command::ToggleGravity)?;
        }
    }

    log::info!(
        "Done: {} ticks at dt = {:e}",
        driver.simulation().tick_count(),
        driver.dt()
    );
    Ok(())
}
