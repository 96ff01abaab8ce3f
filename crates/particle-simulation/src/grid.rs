//! Spatial grid and particle store
//!
//! Particles live in a slot store addressed by [`ParticleId`]. The domain is
//! split into square blocks whose side equals the interaction cutoff, and each
//! block lists the ids of the particles currently inside it. A particle can
//! only interact with particles in its own block or the eight blocks around
//! it, which keeps pair enumeration linear in the number of particles.
//!
//! Block membership is only changed through `&mut self` (add, remove,
//! rebalance). Everything that runs during the force phases takes `&self`.

use particle_physics::{is_in_range, to_grid_coord, GridCoord, Particle, ParticleId, Vector2};
use rayon::prelude::*;

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    particle: Option<Particle>,
}

#[derive(Debug, Default)]
struct Block {
    members: Vec<ParticleId>,
}

impl Block {
    fn remove(&mut self, id: ParticleId) -> bool {
        match self.members.iter().position(|&m| m == id) {
            Some(i) => {
                self.members.swap_remove(i);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug)]
pub struct SpatialGrid {
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    /// Row-major, `dimensions.x * dimensions.y` entries
    blocks: Vec<Block>,
    dimensions: GridCoord,
    block_size: f64,
    scale_factor: f64,
    len: usize,
}

impl SpatialGrid {
    /// Create an empty grid of `dimensions.x × dimensions.y` blocks with side `block_size`.
    ///
    /// Negative dimensions are treated as zero.
    pub fn new(dimensions: GridCoord, block_size: f64) -> Self {
        let dimensions = dimensions.max(GridCoord::ZERO);
        let block_count = dimensions.x as usize * dimensions.y as usize;

        Self {
            slots: Vec::new(),
            free_slots: Vec::new(),
            blocks: (0..block_count).map(|_| Block::default()).collect(),
            dimensions,
            block_size,
            scale_factor: 1.0 / block_size,
            len: 0,
        }
    }

    /// Number of blocks along each axis
    pub fn dimensions(&self) -> GridCoord {
        self.dimensions
    }

    pub fn block_size(&self) -> f64 {
        self.block_size
    }

    /// Number of particles currently stored
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Block coordinate a position maps to (may lie outside the grid)
    #[inline]
    pub fn block_of(&self, pos: Vector2) -> GridCoord {
        to_grid_coord(pos * self.scale_factor)
    }

    pub fn contains_block(&self, coord: GridCoord) -> bool {
        is_in_range(coord, GridCoord::ZERO, self.dimensions)
    }

    fn block_index(&self, coord: GridCoord) -> Option<usize> {
        self.contains_block(coord)
            .then(|| coord.y as usize * self.dimensions.x as usize + coord.x as usize)
    }

    fn block_coord(&self, index: usize) -> GridCoord {
        let width = self.dimensions.x as usize;
        GridCoord::new((index % width) as i32, (index / width) as i32)
    }

    pub fn get(&self, id: ParticleId) -> Option<&Particle> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.particle.as_ref())
    }

    pub fn contains(&self, id: ParticleId) -> bool {
        self.get(id).is_some()
    }

    /// All live particles with their ids, in store order
    pub fn iter(&self) -> impl Iterator<Item = (ParticleId, &Particle)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.particle
                .as_ref()
                .map(|p| (ParticleId::new(index as u32, slot.generation), p))
        })
    }

    /// Ids of the particles listed in the block at `coord` (empty outside the grid)
    pub fn block_members(&self, coord: GridCoord) -> &[ParticleId] {
        match self.block_index(coord) {
            Some(index) => &self.blocks[index].members,
            None => &[],
        }
    }

    fn insert_slot(&mut self, particle: Particle) -> ParticleId {
        if let Some(index) = self.free_slots.pop() {
            let slot = &mut self.slots[index as usize];
            slot.particle = Some(particle);
            ParticleId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                particle: Some(particle),
            });
            ParticleId::new(index, 0)
        }
    }

    fn take_slot(&mut self, id: ParticleId) -> Option<Particle> {
        let slot = self
            .slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())?;
        let particle = slot.particle.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(id.index() as u32);
        // A taken particle leaves without springs, so re-adding it starts unconnected
        particle.connections().clear();
        Some(particle)
    }

    /// Add a particle to the block containing its position.
    ///
    /// A particle outside the grid is dropped and `None` is returned. Nothing can
    /// reference it yet, so no connections need severing.
    pub fn add(&mut self, particle: Particle) -> Option<ParticleId> {
        let Some(block) = self.block_index(self.block_of(particle.position())) else {
            log::warn!("Removed {particle}: outside of the simulated domain");
            return None;
        };

        let id = self.insert_slot(particle);
        self.blocks[block].members.push(id);
        self.len += 1;
        log::debug!("Added particle {id}");
        Some(id)
    }

    /// Remove a particle and every connection referencing it.
    ///
    /// The particle is looked up in the block matching its current position,
    /// which holds between ticks. Returns `None` for unknown ids.
    pub fn remove(&mut self, id: ParticleId) -> Option<Particle> {
        let block = self.block_of(self.get(id)?.position());

        let found = self
            .block_index(block)
            .is_some_and(|index| self.blocks[index].remove(id));
        if !found {
            log::debug!("Particle {id} not in expected block {block}; scanning all blocks");
            for b in &mut self.blocks {
                if b.remove(id) {
                    break;
                }
            }
        }

        let particle = self.take_slot(id)?;
        self.len -= 1;
        self.sever_connections_to(id);
        log::debug!("Removed particle {id}");
        Some(particle)
    }

    /// Drop every connection pointing at `id`, in parallel over all particles
    fn sever_connections_to(&self, id: ParticleId) {
        self.slots
            .par_iter()
            .filter_map(|slot| slot.particle.as_ref())
            .for_each(|p| {
                p.remove_connection_to(id);
            });
    }

    /// Connect `a` to `b` unless either already lists the other.
    ///
    /// Returns whether a connection was added. Self-connections and unknown
    /// ids are rejected.
    pub fn connect(&self, a: ParticleId, b: ParticleId) -> bool {
        if a == b {
            return false;
        }
        match (self.get(a), self.get(b)) {
            (Some(pa), Some(pb)) => pa.connect_with(a, pb, b),
            _ => false,
        }
    }

    /// Remove the connection between `a` and `b`, whichever side stores it
    pub fn disconnect(&self, a: ParticleId, b: ParticleId) -> bool {
        let forward = self.get(a).is_some_and(|p| p.remove_connection_to(b));
        let backward = self.get(b).is_some_and(|p| p.remove_connection_to(a));
        forward || backward
    }

    /// Whether `a` and `b` are connected in either direction
    pub fn are_connected(&self, a: ParticleId, b: ParticleId) -> bool {
        self.get(a).is_some_and(|p| p.is_connected_to(b))
            || self.get(b).is_some_and(|p| p.is_connected_to(a))
    }

    /// All stored connections as `(from, to)` pairs
    pub fn connections(&self) -> Vec<(ParticleId, ParticleId)> {
        self.iter()
            .flat_map(|(id, p)| p.connection_ids().into_iter().map(move |to| (id, to)))
            .collect()
    }

    /// Ids in all blocks within `radius` blocks of `center`, clipped to the grid.
    ///
    /// The iterator is lazy and can be cloned to restart the scan.
    pub fn neighborhood(
        &self,
        center: GridCoord,
        radius: i32,
    ) -> impl Iterator<Item = ParticleId> + Clone + '_ {
        let radius = radius.max(0);
        let min = center
            .saturating_sub(GridCoord::splat(radius))
            .clamp(GridCoord::ZERO, self.dimensions);
        let max = center
            .saturating_add(GridCoord::splat(radius.saturating_add(1)))
            .clamp(GridCoord::ZERO, self.dimensions);
        let width = self.dimensions.x as usize;

        (min.y..max.y)
            .flat_map(move |y| (min.x..max.x).map(move |x| y as usize * width + x as usize))
            .flat_map(move |index| self.blocks[index].members.iter().copied())
    }

    /// Call `action(p1, p2)` exactly once for every unordered pair of particles
    /// in neighboring blocks.
    ///
    /// The pair is visited from the particle for which `dx = p2 - p1` satisfies
    /// `dx.x + dx.y > 0`, or `dx.x + dx.y == 0 && dx.x > 0`. Particles sharing an
    /// exact position are never paired. Runs on the rayon pool.
    pub fn for_each_unique_pair<F>(&self, action: F)
    where
        F: Fn(&Particle, &Particle) + Sync + Send,
    {
        self.slots
            .par_iter()
            .filter_map(|slot| slot.particle.as_ref())
            .for_each(|p1| {
                let center = self.block_of(p1.position());
                for p2 in self.neighborhood(center, 1).filter_map(|id| self.get(id)) {
                    let dx = p2.position() - p1.position();
                    let sum = dx.x + dx.y;
                    if sum > 0.0 || (sum == 0.0 && dx.x > 0.0) {
                        action(p1, p2);
                    }
                }
            });
    }

    /// Run `action` for every particle in parallel with shared access
    pub fn par_for_each<F>(&self, action: F)
    where
        F: Fn(ParticleId, &Particle) + Sync + Send,
    {
        self.slots
            .par_iter()
            .enumerate()
            .for_each(|(index, slot)| {
                if let Some(p) = &slot.particle {
                    action(ParticleId::new(index as u32, slot.generation), p);
                }
            });
    }

    /// Run `action` for every particle in parallel with exclusive access
    pub fn par_for_each_mut<F>(&mut self, action: F)
    where
        F: Fn(&mut Particle) + Sync + Send,
    {
        self.slots
            .par_iter_mut()
            .filter_map(|slot| slot.particle.as_mut())
            .for_each(action);
    }

    /// Move every particle whose position left its block into the right one.
    ///
    /// The full scan finishes before any membership changes. Particles that
    /// left the grid are removed and their connections severed. Returns the
    /// number of particles that changed block or were dropped.
    pub fn rebalance(&mut self) -> usize {
        let grid = &*self;
        let misplaced: Vec<(usize, ParticleId, GridCoord)> = grid
            .blocks
            .par_iter()
            .enumerate()
            .flat_map_iter(|(index, block)| {
                let coord = grid.block_coord(index);
                block.members.iter().filter_map(move |&id| {
                    let target = grid.block_of(grid.get(id)?.position());
                    (target != coord).then_some((index, id, target))
                })
            })
            .collect();

        for &(from, id, target) in &misplaced {
            self.blocks[from].remove(id);

            match self.block_index(target) {
                Some(to) => self.blocks[to].members.push(id),
                None => {
                    if let Some(particle) = self.take_slot(id) {
                        log::warn!("Removed {particle}: left the simulated domain");
                        self.len -= 1;
                        self.sever_connections_to(id);
                    }
                }
            }
        }

        misplaced.len()
    }

    /// First particle in the 3×3 block neighborhood of `pos` matching `predicate`
    pub fn find_first_matching<P>(&self, pos: Vector2, predicate: P) -> Option<ParticleId>
    where
        P: Fn(&Particle) -> bool,
    {
        self.neighborhood(self.block_of(pos), 1)
            .find(|&id| self.get(id).is_some_and(&predicate))
    }

    /// Remove every particle in the 3×3 block neighborhood of `pos` matching `predicate`
    pub fn remove_all_matching<P>(&mut self, pos: Vector2, predicate: P) -> Vec<Particle>
    where
        P: Fn(&Particle) -> bool,
    {
        let matching: Vec<ParticleId> = self
            .neighborhood(self.block_of(pos), 1)
            .filter(|&id| self.get(id).is_some_and(&predicate))
            .collect();

        matching.into_iter().filter_map(|id| self.remove(id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use particle_physics::{DEFAULT_EPSILON, DEFAULT_SIGMA};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn grid() -> SpatialGrid {
        SpatialGrid::new(GridCoord::new(5, 4), 200.0)
    }

    fn particle(x: f64, y: f64) -> Particle {
        Particle::new(Vector2::new(x, y), 1.0, DEFAULT_EPSILON, DEFAULT_SIGMA).unwrap()
    }

    #[test]
    fn test_add_places_particle_in_block() {
        let mut grid = grid();
        let id = grid.add(particle(450.0, 210.0)).unwrap();

        assert_eq!(grid.len(), 1);
        assert_eq!(grid.block_members(GridCoord::new(2, 1)), &[id]);
        assert_eq!(grid.get(id).unwrap().position(), Vector2::new(450.0, 210.0));
    }

    #[test]
    fn test_add_outside_is_dropped() {
        let mut grid = grid();
        assert!(grid.add(particle(1000.0, 10.0)).is_none());
        assert!(grid.add(particle(10.0, -250.0)).is_none());
        assert!(grid.is_empty());
    }

    #[test]
    fn test_removed_particle_comes_back_unconnected() {
        let mut grid = grid();
        let a = grid.add(particle(10.0, 10.0)).unwrap();
        let b = grid.add(particle(50.0, 10.0)).unwrap();
        let c = grid.add(particle(90.0, 10.0)).unwrap();
        assert!(grid.connect(a, b));
        assert!(grid.connect(c, a));

        let removed = grid.remove(a).unwrap();
        assert!(removed.connection_ids().is_empty());
        assert!(grid.connections().is_empty());

        let readded = grid.add(removed).unwrap();
        assert_ne!(readded, a);
        assert!(grid.connections().is_empty());
        assert!(!grid.are_connected(readded, b));
    }

    #[test]
    fn test_add_outside_leaves_connections_alone() {
        let mut grid = grid();
        let a = grid.add(particle(10.0, 10.0)).unwrap();
        let b = grid.add(particle(50.0, 10.0)).unwrap();
        assert!(grid.connect(a, b));

        assert!(grid.add(particle(-250.0, 10.0)).is_none());
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.connections(), vec![(a, b)]);
    }

    #[test]
    fn test_remove_and_stale_ids() {
        let mut grid = grid();
        let a = grid.add(particle(10.0, 10.0)).unwrap();
        let removed = grid.remove(a).unwrap();
        assert_eq!(removed.position(), Vector2::new(10.0, 10.0));
        assert!(grid.is_empty());
        assert!(grid.block_members(GridCoord::ZERO).is_empty());
        assert!(grid.remove(a).is_none());

        // The slot is recycled with a new generation
        let b = grid.add(particle(20.0, 20.0)).unwrap();
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert!(grid.get(a).is_none());
        assert!(grid.get(b).is_some());
    }

    #[test]
    fn test_neighborhood_clips_to_grid() {
        let mut grid = grid();
        let corner = grid.add(particle(10.0, 10.0)).unwrap();
        let near = grid.add(particle(210.0, 210.0)).unwrap();
        let far = grid.add(particle(610.0, 610.0)).unwrap();

        let ids: HashSet<_> = grid.neighborhood(GridCoord::ZERO, 1).collect();
        assert_eq!(ids, HashSet::from([corner, near]));

        let all: HashSet<_> = grid.neighborhood(GridCoord::new(2, 2), 5).collect();
        assert_eq!(all, HashSet::from([corner, near, far]));

        assert_eq!(grid.neighborhood(GridCoord::new(-10, -10), 1).count(), 0);
        assert_eq!(grid.neighborhood(GridCoord::new(i32::MAX, i32::MIN), 1).count(), 0);
    }

    #[test]
    fn test_neighborhood_is_restartable() {
        let mut grid = grid();
        grid.add(particle(10.0, 10.0));
        grid.add(particle(50.0, 10.0));

        let scan = grid.neighborhood(GridCoord::ZERO, 1);
        let first: Vec<_> = scan.clone().collect();
        let second: Vec<_> = scan.collect();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unique_pairs_visited_once() {
        let mut grid = grid();
        let positions = [
            (10.0, 10.0),
            (60.0, 10.0),
            (10.0, 60.0),
            (250.0, 250.0),
            (150.0, 150.0),
            (900.0, 700.0),
        ];
        for &(x, y) in &positions {
            grid.add(particle(x, y));
        }

        let visits = parking_lot::Mutex::new(Vec::new());
        grid.for_each_unique_pair(|p1, p2| {
            visits.lock().push((p1.position(), p2.position()));
        });
        let visits = visits.into_inner();

        for (a, b) in &visits {
            assert_ne!(a, b);
        }
        let unordered: HashSet<_> = visits
            .iter()
            .map(|(a, b)| {
                let (a, b) = ((a.x.to_bits(), a.y.to_bits()), (b.x.to_bits(), b.y.to_bits()));
                if a < b {
                    (a, b)
                } else {
                    (b, a)
                }
            })
            .collect();
        assert_eq!(unordered.len(), visits.len());
        // Block (0,0) holds four particles and the adjacent block (1,1) one, so all
        // five form C(5,2) pairs; the particle in block (4,3) has no neighbor.
        assert_eq!(visits.len(), 10);
    }

    #[test]
    fn test_rebalance_moves_and_drops() {
        let mut grid = grid();
        let a = grid
            .add(particle(190.0, 10.0).with_velocity(Vector2::new(20.0, 0.0)))
            .unwrap();
        let b = grid.add(particle(10.0, 10.0)).unwrap();
        let c = grid
            .add(particle(100.0, 100.0).with_velocity(Vector2::new(0.0, -400.0)))
            .unwrap();
        assert!(grid.connect(b, c));
        assert!(grid.connect(c, a));

        // With no previous force a zero-length step moves each particle by its velocity
        grid.par_for_each_mut(|p| p.tick_position(0.0));
        assert_eq!(grid.get(a).unwrap().position(), Vector2::new(210.0, 10.0));

        assert_eq!(grid.rebalance(), 2);
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.block_members(GridCoord::new(1, 0)), &[a]);
        assert_eq!(grid.block_members(GridCoord::ZERO), &[b]);
        assert!(grid.get(c).is_none());
        assert!(grid.get(b).unwrap().connection_ids().is_empty());
        assert_eq!(grid.rebalance(), 0);
    }

    #[test]
    fn test_connect_and_disconnect() {
        let mut grid = grid();
        let a = grid.add(particle(10.0, 10.0)).unwrap();
        let b = grid.add(particle(50.0, 10.0)).unwrap();

        assert!(!grid.connect(a, a));
        assert!(grid.connect(a, b));
        assert!(!grid.connect(a, b));
        assert!(!grid.connect(b, a));
        assert!(grid.are_connected(b, a));
        assert_eq!(grid.connections(), vec![(a, b)]);

        assert!(grid.disconnect(b, a));
        assert!(!grid.are_connected(a, b));
        assert!(!grid.disconnect(a, b));
    }

    #[test]
    fn test_find_and_remove_matching() {
        let mut grid = grid();
        let a = grid.add(particle(100.0, 100.0)).unwrap();
        grid.add(particle(105.0, 100.0));
        grid.add(particle(700.0, 700.0));

        let hit = |p: &Particle| p.render_bounds().contains(Vector2::new(98.0, 100.0));
        assert_eq!(grid.find_first_matching(Vector2::new(98.0, 100.0), hit), Some(a));
        assert_eq!(grid.find_first_matching(Vector2::new(400.0, 400.0), |_| false), None);

        let removed = grid.remove_all_matching(Vector2::new(103.0, 100.0), |p| {
            p.render_bounds().contains(Vector2::new(103.0, 100.0))
        });
        assert_eq!(removed.len(), 2);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_parallel_visitors() {
        let mut grid = grid();
        for i in 0..20 {
            grid.add(particle(10.0 + 40.0 * i as f64, 30.0).with_velocity(Vector2::new(0.0, 1.0)));
        }
        let count = AtomicUsize::new(0);
        grid.par_for_each(|id, p| {
            assert!(std::ptr::eq(grid.get(id).unwrap(), p));
            count.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(count.load(Ordering::Relaxed), 20);

        grid.par_for_each_mut(|p| p.tick_position(0.0));
        assert!(grid.iter().all(|(_, p)| p.position().y == 31.0));
    }
}
