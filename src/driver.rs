//! Headless driver: applies user commands to a simulation and steps it at a
//! fixed timestep unless paused.

use particle_physics::{ParticleId, Vector2};
use particle_simulation::{Result, Simulation};

/// User interactions a front end can forward to the driver
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    TogglePause,
    ToggleGravity,
    /// Advance exactly one tick, even while paused
    Step,
    /// Place a particle at the lattice point nearest to the position
    Place { pos: Vector2, fixed: bool },
    RemoveAt(Vector2),
    /// Pick the particle a new connection starts from
    BeginConnect(Vector2),
    /// Connect the picked particle to the one at this position
    EndConnect(Vector2),
}

pub struct Driver {
    simulation: Simulation,
    dt: f64,
    is_paused: bool,
    step_one_tick: bool,
    connect_start: Option<ParticleId>,
}

impl Driver {
    /// `ticks_per_second` fixes the timestep to its inverse
    pub fn new(simulation: Simulation, ticks_per_second: f64) -> Self {
        Self {
            simulation,
            dt: 1.0 / ticks_per_second,
            is_paused: false,
            step_one_tick: false,
            connect_start: None,
        }
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.simulation
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn toggle_pause(&mut self) {
        self.is_paused = !self.is_paused;
        log::info!(
            "Simulation {}",
            if self.is_paused { "paused" } else { "resumed" }
        );
    }

    pub fn apply(&mut self, command: Command) -> Result<()> {
        match command {
            Command::TogglePause => self.toggle_pause(),
            Command::ToggleGravity => self.simulation.toggle_gravity(),
            Command::Step => self.step_one_tick = true,
            Command::Place { pos, fixed } => {
                let pos = self.simulation.snap(pos);
                let added = if fixed {
                    self.simulation.add_fixed_particle_at(pos)?
                } else {
                    self.simulation.add_particle_at(pos)?
                };
                if added.is_none() {
                    log::debug!("Nothing placed at {pos}");
                }
            }
            Command::RemoveAt(pos) => {
                let removed = self.simulation.remove_all_at(pos);
                log::debug!("Removed {removed} particles at {pos}");
            }
            Command::BeginConnect(pos) => {
                self.connect_start = self.simulation.find_particle(pos);
            }
            Command::EndConnect(pos) => {
                if let (Some(start), Some(end)) =
                    (self.connect_start.take(), self.simulation.find_particle(pos))
                {
                    if self.simulation.connect(start, end) {
                        log::debug!("Connected {start} to {end}");
                    }
                }
            }
        }
        Ok(())
    }

    /// Tick once unless paused. Returns whether a tick happened.
    pub fn update(&mut self) -> bool {
        if self.is_paused() && !self.step_one_tick {
            return false;
        }
        self.simulation.tick(self.dt);
        self.step_one_tick = false;
        true
    }

    /// Call [`Driver::update`] `ticks` times, returning how many ticks ran
    pub fn run(&mut self, ticks: usize) -> usize {
        (0..ticks).filter(|_| self.update()).count()
    }
}
