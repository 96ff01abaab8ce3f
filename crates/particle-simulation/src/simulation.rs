//! CPU particle simulation manager
//!
//! Owns the spatial grid, the force field and the parameters, and advances
//! everything by one fixed timestep per [`Simulation::tick`]. Each phase of a
//! tick runs on the rayon pool and finishes completely before the next one
//! starts.

use crate::error::Result;
use crate::grid::SpatialGrid;
use crate::params::SimulationParams;
use particle_physics::{
    snap_to_lattice, ForceField, Particle, ParticleId, ParticleKind, Vector2, DEFAULT_GRAVITY,
};

pub struct Simulation {
    params: SimulationParams,
    grid: SpatialGrid,
    field: ForceField,
    tick_count: u64,
}

impl Simulation {
    pub fn new(params: SimulationParams) -> Result<Self> {
        params.validate()?;

        let dimensions = params.grid_dimensions();
        log::info!(
            "Initializing Simulation: domain {}x{} px, cutoff {} px, {}x{} blocks",
            params.width,
            params.height,
            params.cutoff_distance,
            dimensions.x,
            dimensions.y
        );

        Ok(Self {
            grid: SpatialGrid::new(dimensions, params.cutoff_distance),
            field: ForceField::new(
                params.width,
                params.height,
                params.cutoff_distance,
                params.connection_stiffness,
            ),
            params,
            tick_count: 0,
        })
    }

    /// Step the simulation forward by one timestep
    pub fn tick(&mut self, dt: f64) {
        let field = &self.field;
        let grid = &self.grid;

        // Step 1: Lennard-Jones forces, each neighboring pair once
        grid.for_each_unique_pair(|p1, p2| p1.tick_force_to(p2, field));

        // Step 2: Boundary ghosts and springs
        grid.par_for_each(|_, p| p.tick_special_forces(field, |id| grid.get(id)));

        let friction_factor = self.params.friction_factor;
        let gravity = self.params.gravity;

        // Step 3: Velocity
        self.grid.par_for_each_mut(|p| p.tick_velocity(dt, friction_factor));

        // Step 4: Position
        self.grid.par_for_each_mut(|p| p.tick_position(dt));

        // Step 5: Roll accumulators over to the external field
        self.grid.par_for_each_mut(|p| p.tick_reset(gravity));

        // Step 6: Re-bucket particles that changed block
        let moved = self.grid.rebalance();
        self.tick_count += 1;

        log::trace!(
            "tick {}: {} particles, {} re-bucketed",
            self.tick_count,
            self.grid.len(),
            moved
        );
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Read-only access to the grid and the particles in it
    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn particle_count(&self) -> usize {
        self.grid.len()
    }

    /// Number of ticks performed so far
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn get(&self, id: ParticleId) -> Option<&Particle> {
        self.grid.get(id)
    }

    pub fn particles(&self) -> impl Iterator<Item = (ParticleId, &Particle)> + '_ {
        self.grid.iter()
    }

    pub fn gravity(&self) -> Vector2 {
        self.params.gravity
    }

    /// Set the external field. Takes effect from the next accumulator reset.
    pub fn set_gravity(&mut self, gravity: Vector2) {
        self.params.gravity = gravity;
    }

    /// Switch between no gravity and the default downward field
    pub fn toggle_gravity(&mut self) {
        self.params.gravity = if self.params.gravity == Vector2::ZERO {
            DEFAULT_GRAVITY
        } else {
            Vector2::ZERO
        };
        log::info!("Gravity set to {}", self.params.gravity);
    }

    /// Insert a particle. Returns `None` if it lies outside the domain.
    pub fn add(&mut self, particle: Particle) -> Option<ParticleId> {
        self.grid.add(particle)
    }

    /// Add a free particle with the default parameters
    pub fn add_particle_at(&mut self, pos: Vector2) -> Result<Option<ParticleId>> {
        self.add_with_defaults(ParticleKind::Free, pos)
    }

    /// Add a fixed particle with the default parameters
    pub fn add_fixed_particle_at(&mut self, pos: Vector2) -> Result<Option<ParticleId>> {
        self.add_with_defaults(ParticleKind::Fixed, pos)
    }

    /// Add a fixed particle with explicit parameters
    pub fn add_fixed(
        &mut self,
        pos: Vector2,
        mass: f64,
        epsilon: f64,
        sigma: f64,
    ) -> Result<Option<ParticleId>> {
        let particle = Particle::fixed(pos, mass, epsilon, sigma)?;
        Ok(self.add(particle))
    }

    fn add_with_defaults(&mut self, kind: ParticleKind, pos: Vector2) -> Result<Option<ParticleId>> {
        let particle = Particle::with_kind(
            kind,
            pos,
            self.params.particle_mass,
            self.params.particle_epsilon,
            self.params.particle_sigma,
        )?;
        log::debug!("Creating {particle}");
        Ok(self.add(particle))
    }

    /// Round a position to the placement lattice (a fifth of the cutoff)
    pub fn snap(&self, pos: Vector2) -> Vector2 {
        snap_to_lattice(pos, self.params.lattice_spacing())
    }

    /// Remove a particle and all connections from and to it
    pub fn remove(&mut self, id: ParticleId) -> Option<Particle> {
        self.grid.remove(id)
    }

    pub fn connect(&self, a: ParticleId, b: ParticleId) -> bool {
        self.grid.connect(a, b)
    }

    pub fn disconnect(&self, a: ParticleId, b: ParticleId) -> bool {
        self.grid.disconnect(a, b)
    }

    pub fn find_first_matching<P>(&self, pos: Vector2, predicate: P) -> Option<ParticleId>
    where
        P: Fn(&Particle) -> bool,
    {
        self.grid.find_first_matching(pos, predicate)
    }

    pub fn remove_all_matching<P>(&mut self, pos: Vector2, predicate: P) -> Vec<Particle>
    where
        P: Fn(&Particle) -> bool,
    {
        self.grid.remove_all_matching(pos, predicate)
    }

    /// Particle whose render bounds contain `pos`
    pub fn find_particle(&self, pos: Vector2) -> Option<ParticleId> {
        self.find_first_matching(pos, |p| p.render_bounds().contains(pos))
    }

    /// Remove every particle whose render bounds contain `pos`, returning how many went
    pub fn remove_all_at(&mut self, pos: Vector2) -> usize {
        let removed = self.remove_all_matching(pos, |p| p.render_bounds().contains(pos));
        removed.len()
    }
}
