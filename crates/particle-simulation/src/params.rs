//! Simulation parameters

use crate::error::{Result, SimulationError};
use particle_physics::{
    GridCoord, Vector2, CONNECTION_STIFFNESS, DEFAULT_CUTOFF_DISTANCE, DEFAULT_EPSILON,
    DEFAULT_GRAVITY, DEFAULT_MASS, DEFAULT_SIGMA, FRICTION_FACTOR, PLACEMENT_LATTICE_DIVISOR,
};

/// Largest supported number of blocks along one axis
const MAX_BLOCKS_PER_AXIS: f64 = 32_768.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationParams {
    // Domain extent in px. Particles are simulated in [0, width) x [0, height).
    pub width: f64,
    pub height: f64,

    // Interaction cutoff, also the grid block size
    pub cutoff_distance: f64,

    // Constant external field the accumulator is reset to every tick
    pub gravity: Vector2,

    // Integration
    pub friction_factor: f64,
    pub connection_stiffness: f64,

    // Parameters for particles added through the convenience constructors
    pub particle_mass: f64,
    pub particle_epsilon: f64,
    pub particle_sigma: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
            cutoff_distance: DEFAULT_CUTOFF_DISTANCE,
            gravity: DEFAULT_GRAVITY,
            friction_factor: FRICTION_FACTOR,
            connection_stiffness: CONNECTION_STIFFNESS,
            particle_mass: DEFAULT_MASS,
            particle_epsilon: DEFAULT_EPSILON,
            particle_sigma: DEFAULT_SIGMA,
        }
    }
}

impl SimulationParams {
    pub fn with_domain(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_cutoff_distance(mut self, cutoff_distance: f64) -> Self {
        self.cutoff_distance = cutoff_distance;
        self
    }

    pub fn with_gravity(mut self, gravity: Vector2) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_friction_factor(mut self, friction_factor: f64) -> Self {
        self.friction_factor = friction_factor;
        self
    }

    pub fn with_particle_defaults(mut self, mass: f64, epsilon: f64, sigma: f64) -> Self {
        self.particle_mass = mass;
        self.particle_epsilon = epsilon;
        self.particle_sigma = sigma;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let domain_ok = |v: f64| v > 0.0 && v.is_finite();
        if !domain_ok(self.width) || !domain_ok(self.height) {
            return Err(SimulationError::InvalidDomain {
                width: self.width,
                height: self.height,
            });
        }
        if !(self.cutoff_distance > 0.0 && self.cutoff_distance.is_finite()) {
            return Err(SimulationError::InvalidCutoff(self.cutoff_distance));
        }
        if !(0.0..=1.0).contains(&self.friction_factor) {
            return Err(SimulationError::InvalidFriction(self.friction_factor));
        }

        let blocks_x = (self.width / self.cutoff_distance).ceil();
        let blocks_y = (self.height / self.cutoff_distance).ceil();
        if blocks_x > MAX_BLOCKS_PER_AXIS || blocks_y > MAX_BLOCKS_PER_AXIS {
            return Err(SimulationError::GridTooLarge {
                width: blocks_x,
                height: blocks_y,
            });
        }
        Ok(())
    }

    /// Number of grid blocks needed to cover the domain
    pub fn grid_dimensions(&self) -> GridCoord {
        GridCoord::new(
            (self.width / self.cutoff_distance).ceil() as i32,
            (self.height / self.cutoff_distance).ceil() as i32,
        )
    }

    /// Spacing of the lattice new particles are snapped to
    pub fn lattice_spacing(&self) -> f64 {
        self.cutoff_distance / PLACEMENT_LATTICE_DIVISOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let params = SimulationParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.grid_dimensions(), GridCoord::new(10, 6));
        assert_eq!(params.lattice_spacing(), 40.0);
        assert_eq!(params.gravity, Vector2::new(0.0, 0.1));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let params = SimulationParams::default();
        assert!(matches!(
            params.with_domain(0.0, 100.0).validate(),
            Err(SimulationError::InvalidDomain { .. })
        ));
        assert_eq!(
            params.with_cutoff_distance(-1.0).validate(),
            Err(SimulationError::InvalidCutoff(-1.0))
        );
        assert!(matches!(
            params.with_cutoff_distance(f64::NAN).validate(),
            Err(SimulationError::InvalidCutoff(_))
        ));
        assert_eq!(
            params.with_friction_factor(1.5).validate(),
            Err(SimulationError::InvalidFriction(1.5))
        );
        assert!(matches!(
            params.with_cutoff_distance(1.0e-6).validate(),
            Err(SimulationError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn test_grid_dimensions_round_up() {
        let params = SimulationParams::default()
            .with_domain(1000.0, 801.0)
            .with_cutoff_distance(200.0);
        assert_eq!(params.grid_dimensions(), GridCoord::new(5, 5));
    }
}
