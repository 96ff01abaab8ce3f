//! # Particle Simulation Engine
//!
//! CPU simulation of 2D Lennard-Jones particles on a bucketed spatial grid,
//! with the tick phases spread over a rayon worker pool.

pub mod error;
pub mod grid;
pub mod params;
pub mod simulation;

pub use error::{Result, SimulationError};
pub use grid::*;
pub use params::*;
pub use simulation::*;
