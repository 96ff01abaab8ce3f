//! # Particle Physics
//!
//! Physics core for a 2D Lennard-Jones particle sandbox: vector types, the
//! pair potential, spring and boundary forces, parameter memoization and
//! per-particle velocity Verlet integration.

pub mod cache;
pub mod constants;
pub mod error;
pub mod forces;
pub mod math;
pub mod particle;

pub use cache::*;
pub use constants::*;
pub use error::{ParticleError, Result};
pub use forces::*;
pub use math::*;
pub use particle::*;
