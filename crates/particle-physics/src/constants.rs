//! Default constants for the particle sandbox
//!
//! Lengths are in pixels, time in seconds, mass in arbitrary units. The
//! values are tuned so that a screen full of particles forms visible
//! lattices at 10 000 ticks per second.

use crate::math::Vector2;

/// Spring factor k that scales the spring force between connected particles
pub const CONNECTION_STIFFNESS: f64 = 1.0e-4;

/// Friction: every tick `velocity * (1 - FRICTION_FACTOR)` is subtracted from the force
pub const FRICTION_FACTOR: f64 = 0.5;

/// Visual radius of a particle.
/// Dot particles have no size, but the presentation layer needs one to draw and pick them.
pub const RENDER_RADIUS: f64 = 10.0;

/// Default particle mass
pub const DEFAULT_MASS: f64 = 1.0;

/// Default depth of the Lennard-Jones potential well
pub const DEFAULT_EPSILON: f64 = 1.0e-7;

/// Default distance at which the Lennard-Jones potential crosses zero
pub const DEFAULT_SIGMA: f64 = 200.0;

/// Maximum distance at which pairwise forces are computed (also the grid block size)
pub const DEFAULT_CUTOFF_DISTANCE: f64 = 200.0;

/// Constant external field applied to every particle while gravity is enabled
pub const DEFAULT_GRAVITY: Vector2 = Vector2::new(0.0, 0.1);

/// Spacing of the placement lattice, as a fraction of the cutoff distance
pub const PLACEMENT_LATTICE_DIVISOR: f64 = 5.0;
