//! Particle state, force accumulation and velocity Verlet integration

use crate::constants::RENDER_RADIUS;
use crate::error::{ParticleError, Result};
use crate::forces::{lennard_jones, spring_force, ForceField, Interaction};
use crate::math::Vector2;
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::OnceLock;

/// Stable handle to a particle in the simulation store.
///
/// The generation distinguishes a recycled slot from the particle that
/// previously lived there, so stale handles resolve to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId {
    index: u32,
    generation: u32,
}

impl ParticleId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Particle variant, fixed for the particle's whole lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    /// Moves under the forces acting on it.
    Free,
    /// Never moves and ignores forces, but still exerts force on others.
    Fixed,
}

/// Circle used by the presentation layer to draw and pick a particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderBounds {
    pub center: Vector2,
    pub radius: f64,
}

impl RenderBounds {
    pub fn contains(&self, point: Vector2) -> bool {
        (point - self.center).length_squared() <= self.radius * self.radius
    }
}

/// A dot particle that attracts and repels other particles.
///
/// The force accumulator and the connection list sit behind locks so that
/// pair and spring forces can be applied through shared references from
/// several worker threads at once. Everything else is only mutated through
/// `&mut self` during the integration phases.
#[derive(Debug)]
pub struct Particle {
    kind: ParticleKind,
    position: Vector2,
    velocity: Vector2,
    force: Mutex<Vector2>,
    previous_force: Vector2,
    mass: f64,
    epsilon: f64,
    sigma: f64,
    /// Unidirectional: a particle listed here never lists this one back.
    connections: Mutex<Vec<ParticleId>>,
    render_bounds: OnceLock<RenderBounds>,
}

impl Particle {
    /// Create a new free particle at rest
    pub fn new(position: Vector2, mass: f64, epsilon: f64, sigma: f64) -> Result<Self> {
        Self::with_kind(ParticleKind::Free, position, mass, epsilon, sigma)
    }

    /// Create a new particle that never moves
    pub fn fixed(position: Vector2, mass: f64, epsilon: f64, sigma: f64) -> Result<Self> {
        Self::with_kind(ParticleKind::Fixed, position, mass, epsilon, sigma)
    }

    pub fn with_kind(
        kind: ParticleKind,
        position: Vector2,
        mass: f64,
        epsilon: f64,
        sigma: f64,
    ) -> Result<Self> {
        if !(mass > 0.0 && mass.is_finite()) {
            return Err(ParticleError::NonPositiveMass(mass));
        }
        if !(epsilon >= 0.0 && epsilon.is_finite()) {
            return Err(ParticleError::NegativeEpsilon(epsilon));
        }
        if !(sigma > 0.0 && sigma.is_finite()) {
            return Err(ParticleError::NonPositiveSigma(sigma));
        }
        if !position.is_finite() {
            return Err(ParticleError::NonFinitePosition(position.x, position.y));
        }

        Ok(Self {
            kind,
            position,
            velocity: Vector2::ZERO,
            force: Mutex::new(Vector2::ZERO),
            previous_force: Vector2::ZERO,
            mass,
            epsilon,
            sigma,
            connections: Mutex::new(Vec::new()),
            render_bounds: OnceLock::new(),
        })
    }

    /// Start with an initial velocity. Ignored for fixed particles.
    pub fn with_velocity(mut self, velocity: Vector2) -> Self {
        if self.kind == ParticleKind::Free {
            self.velocity = velocity;
        }
        self
    }

    pub fn kind(&self) -> ParticleKind {
        self.kind
    }

    pub fn is_fixed(&self) -> bool {
        self.kind == ParticleKind::Fixed
    }

    pub fn position(&self) -> Vector2 {
        self.position
    }

    pub fn velocity(&self) -> Vector2 {
        self.velocity
    }

    /// Current value of the force accumulator
    pub fn force(&self) -> Vector2 {
        *self.force.lock()
    }

    pub fn previous_force(&self) -> Vector2 {
        self.previous_force
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Lock the outgoing connection list.
    ///
    /// Readers and writers of the list go through this lock, so interactive
    /// edits and the spring phase never observe a half-updated list.
    pub fn connections(&self) -> MutexGuard<'_, Vec<ParticleId>> {
        self.connections.lock()
    }

    /// Snapshot of the outgoing connections
    pub fn connection_ids(&self) -> Vec<ParticleId> {
        self.connections.lock().clone()
    }

    /// Cached circle used for drawing and picking, rebuilt after every move
    pub fn render_bounds(&self) -> RenderBounds {
        *self.render_bounds.get_or_init(|| RenderBounds {
            center: self.position,
            radius: RENDER_RADIUS,
        })
    }

    /// Safely add a force to the accumulator. No-op for fixed particles.
    pub fn add_force(&self, df: Vector2) {
        if self.kind == ParticleKind::Free {
            *self.force.lock() += df;
        }
    }

    /// Safely subtract a force from the accumulator. No-op for fixed particles.
    pub fn subtract_force(&self, df: Vector2) {
        if self.kind == ParticleKind::Free {
            *self.force.lock() -= df;
        }
    }

    /// Lennard-Jones force difference between this particle and a partner
    /// described by its position and potential parameters.
    ///
    /// Returns `None` when the pair is degenerate or out of range.
    pub fn interaction_with(
        &self,
        position: Vector2,
        epsilon: f64,
        sigma: f64,
        field: &ForceField,
    ) -> Option<Vector2> {
        let dx = self.position - position;
        let epsilon = field.combined_epsilon(self.epsilon, epsilon);
        let sigma = ForceField::combined_sigma(self.sigma, sigma);

        match lennard_jones(dx, epsilon, sigma, field.sq_cutoff()) {
            Interaction::Force(df) => Some(df),
            Interaction::OutOfRange => None,
            Interaction::Degenerate => {
                log::warn!(
                    "Particles at same exact position {:?}; skipping force calculation",
                    self.position
                );
                None
            }
        }
    }

    /// Apply the pair potential between this particle and `other` to both accumulators
    pub fn tick_force_to(&self, other: &Particle, field: &ForceField) {
        if let Some(df) = self.interaction_with(other.position, other.epsilon, other.sigma, field) {
            self.subtract_force(df);
            other.add_force(df);
        }
    }

    /// Push the particle away from the domain edges using mirror-image ghosts.
    ///
    /// Ghosts share this particle's parameters. Only this particle's
    /// accumulator changes; the ghost's reaction is discarded.
    pub fn tick_boundary_force(&self, field: &ForceField) {
        if self.kind == ParticleKind::Fixed {
            return;
        }

        for ghost in field.boundary_ghosts(self.position).into_iter().flatten() {
            if let Some(df) = self.interaction_with(ghost, self.epsilon, self.sigma, field) {
                self.subtract_force(df);
            }
        }
    }

    /// Spring attraction towards a connected particle, applied to both sides
    pub fn tick_attraction_to(&self, other: &Particle, field: &ForceField) {
        let df = spring_force(self.position - other.position, field.stiffness());
        self.subtract_force(df);
        other.add_force(df);
    }

    /// Boundary and spring forces.
    ///
    /// `resolve` maps a connection id to the live particle; ids that no longer
    /// resolve are skipped.
    pub fn tick_special_forces<'a, F>(&self, field: &ForceField, resolve: F)
    where
        F: Fn(ParticleId) -> Option<&'a Particle>,
    {
        self.tick_boundary_force(field);

        let connections = self.connections.lock();
        for &id in connections.iter() {
            if let Some(other) = resolve(id) {
                self.tick_attraction_to(other, field);
            }
        }
    }

    /// Velocity Verlet velocity update with friction.
    ///
    /// The friction term is folded into the accumulator first, so it also
    /// becomes part of next tick's previous force.
    pub fn tick_velocity(&mut self, dt: f64, friction_factor: f64) {
        match self.kind {
            ParticleKind::Fixed => {}
            ParticleKind::Free => {
                let force = self.force.get_mut();
                *force -= self.velocity * (1.0 - friction_factor);

                let dv = (self.previous_force + *force) * (dt / (2.0 * self.mass));
                self.velocity += dv;
            }
        }
    }

    /// Velocity Verlet position update.
    ///
    /// Velocity is applied as a per-tick displacement; the previous force adds
    /// the `dt² / 2m` term.
    pub fn tick_position(&mut self, dt: f64) {
        match self.kind {
            ParticleKind::Fixed => {}
            ParticleKind::Free => {
                let dx = self.velocity + self.previous_force * (dt / (2.0 * self.mass)) * dt;
                self.position += dx;
                self.render_bounds.take();
            }
        }
    }

    /// Roll the accumulator over: the current force becomes the previous one and
    /// the accumulator restarts from the external field.
    pub fn tick_reset(&mut self, gravity: Vector2) {
        match self.kind {
            ParticleKind::Fixed => {}
            ParticleKind::Free => {
                let force = self.force.get_mut();
                self.previous_force = *force;
                *force = gravity;
            }
        }
    }

    /// Add `id` to the outgoing connections if it is absent from both lists.
    ///
    /// `other` is the particle behind `id`; `self_id` is this particle's own id.
    /// Both connection locks are taken in id order so that concurrent calls on
    /// the same pair cannot deadlock.
    pub fn connect_with(&self, self_id: ParticleId, other: &Particle, id: ParticleId) -> bool {
        if self_id == id || std::ptr::eq(self, other) {
            return false;
        }

        let (mut own, theirs) = if self_id < id {
            let own = self.connections.lock();
            let theirs = other.connections.lock();
            (own, theirs)
        } else {
            let theirs = other.connections.lock();
            let own = self.connections.lock();
            (own, theirs)
        };

        if own.contains(&id) || theirs.contains(&self_id) {
            return false;
        }
        own.push(id);
        true
    }

    /// Remove `id` from the outgoing connections, returning whether it was present
    pub fn remove_connection_to(&self, id: ParticleId) -> bool {
        let mut connections = self.connections.lock();
        let before = connections.len();
        connections.retain(|&c| c != id);
        connections.len() != before
    }

    pub fn is_connected_to(&self, id: ParticleId) -> bool {
        self.connections.lock().contains(&id)
    }
}

impl fmt::Display for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ParticleKind::Free => "particle",
            ParticleKind::Fixed => "fixed particle",
        };
        write!(f, "{} at pos ({:.1}|{:.1})", kind, self.position.x, self.position.y)
    }
}
