//! Force laws: Lennard-Jones interaction, springs and boundary ghosts
//!
//! The functions here are pure. Applying the results to particle
//! accumulators is done by [`Particle`](crate::particle::Particle).

use crate::cache::PairParamCache;
use crate::constants::{CONNECTION_STIFFNESS, DEFAULT_CUTOFF_DISTANCE};
use crate::math::{fast_pow6, Vector2};

/// Outcome of evaluating the pair potential for one separation vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interaction {
    /// Both positions coincide; the force direction is undefined.
    Degenerate,
    /// Separation exceeds the cutoff; the force is treated as exactly zero.
    OutOfRange,
    /// Force difference `df`, subtracted from the first particle and added to the second.
    Force(Vector2),
}

/// Lennard-Jones force difference for the separation `dx = p1 - p2`.
///
/// With `s6 = (sigma / d)^6` the result is `dx * 24 epsilon / d² * (s6 - 2 s6²)`,
/// repulsive at short range and attractive beyond the potential minimum.
pub fn lennard_jones(dx: Vector2, epsilon: f64, sigma: f64, sq_cutoff: f64) -> Interaction {
    let sq_dis = dx.length_squared();

    if sq_dis == 0.0 {
        return Interaction::Degenerate;
    }
    if sq_dis > sq_cutoff {
        return Interaction::OutOfRange;
    }

    let d = sq_dis.sqrt();
    let sigma_per_dis_pow6 = fast_pow6(sigma / d);
    let sigma_per_dis_pow12 = sigma_per_dis_pow6 * sigma_per_dis_pow6;

    Interaction::Force(dx * (24.0 * epsilon / sq_dis * (sigma_per_dis_pow6 - 2.0 * sigma_per_dis_pow12)))
}

/// Linear spring force difference `k * dx` for the separation `dx = p1 - p2`
#[inline]
pub fn spring_force(dx: Vector2, stiffness: f64) -> Vector2 {
    dx * stiffness
}

/// Shared, read-only context for force evaluation during a tick.
///
/// Holds the domain extent used for boundary reflection, the interaction
/// cutoff and the epsilon combination cache.
#[derive(Debug)]
pub struct ForceField {
    width: f64,
    height: f64,
    cutoff_distance: f64,
    sq_cutoff: f64,
    stiffness: f64,
    epsilon_cache: PairParamCache,
}

impl ForceField {
    pub fn new(width: f64, height: f64, cutoff_distance: f64, stiffness: f64) -> Self {
        Self {
            width,
            height,
            cutoff_distance,
            sq_cutoff: cutoff_distance * cutoff_distance,
            stiffness,
            epsilon_cache: PairParamCache::new(),
        }
    }

    pub fn sq_cutoff(&self) -> f64 {
        self.sq_cutoff
    }

    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }

    pub fn epsilon_cache(&self) -> &PairParamCache {
        &self.epsilon_cache
    }

    /// Combined interaction strength of two particles (geometric mean, memoized)
    pub fn combined_epsilon(&self, e1: f64, e2: f64) -> f64 {
        self.epsilon_cache.combine(e1, e2)
    }

    /// Combined interaction range of two particles (arithmetic mean)
    #[inline]
    pub fn combined_sigma(s1: f64, s2: f64) -> f64 {
        0.5 * (s1 + s2)
    }

    /// Mirror images of `pos` across the domain edges it is close to.
    ///
    /// A point within half the cutoff of an edge gets a ghost reflected across
    /// that edge. Each axis contributes at most one ghost, so a corner yields two
    /// single-axis ghosts and never a diagonal one.
    pub fn boundary_ghosts(&self, pos: Vector2) -> [Option<Vector2>; 2] {
        let r = 0.5 * self.cutoff_distance;

        let horizontal = if pos.x < r {
            Some(Vector2::new(-pos.x, pos.y))
        } else if pos.x > self.width - r {
            Some(Vector2::new(2.0 * self.width - pos.x, pos.y))
        } else {
            None
        };

        let vertical = if pos.y < r {
            Some(Vector2::new(pos.x, -pos.y))
        } else if pos.y > self.height - r {
            Some(Vector2::new(pos.x, 2.0 * self.height - pos.y))
        } else {
            None
        };

        [horizontal, vertical]
    }
}

impl Default for ForceField {
    fn default() -> Self {
        Self::new(1920.0, 1080.0, DEFAULT_CUTOFF_DISTANCE, CONNECTION_STIFFNESS)
    }
}
