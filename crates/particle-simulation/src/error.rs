//! Error types for particle-simulation.

use particle_physics::ParticleError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SimulationError {
    #[error("domain size must be positive and finite, got {width} x {height}")]
    InvalidDomain { width: f64, height: f64 },

    #[error("cutoff distance must be positive and finite, got {0}")]
    InvalidCutoff(f64),

    #[error("friction factor must lie in [0, 1], got {0}")]
    InvalidFriction(f64),

    #[error("grid of {width} x {height} blocks exceeds the supported size")]
    GridTooLarge { width: f64, height: f64 },

    #[error("invalid particle: {0}")]
    Particle(#[from] ParticleError),
}

pub type Result<T> = std::result::Result<T, SimulationError>;
