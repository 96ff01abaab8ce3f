//! 2D value types used by the engine
//!
//! Positions, velocities and forces are [`Vector2`] (`glam::DVec2`), block
//! addresses are [`GridCoord`] (`glam::IVec2`). Both are `Copy` values with the
//! usual operator overloads, so `a + b`, `a - b`, `a * s` and
//! `v.length_squared()` cover add/subtract/scale/squared length.

use glam::{DVec2, IVec2};

/// Floating-point position, velocity or force
pub type Vector2 = DVec2;

/// Integer block address in the spatial grid
pub type GridCoord = IVec2;

/// Convert a vector to grid coordinates by truncating each axis toward zero.
#[inline]
pub fn to_grid_coord(v: Vector2) -> GridCoord {
    GridCoord::new(v.x as i32, v.y as i32)
}

/// Check whether a coordinate lies in the half-open rectangle `[min_incl, max_excl)`.
#[inline]
pub fn is_in_range(coord: GridCoord, min_incl: GridCoord, max_excl: GridCoord) -> bool {
    coord.x >= min_incl.x && coord.y >= min_incl.y && coord.x < max_excl.x && coord.y < max_excl.y
}

/// x⁶ with three multiplications
#[inline]
pub fn fast_pow6(x: f64) -> f64 {
    let x2 = x * x;
    x2 * x2 * x2
}

/// Round each axis to the nearest multiple of `spacing`.
///
/// Used to place new particles on a regular lattice so that hand-built
/// structures start out evenly spaced. A non-positive spacing disables snapping.
pub fn snap_to_lattice(pos: Vector2, spacing: f64) -> Vector2 {
    if spacing <= 0.0 {
        return pos;
    }
    (pos / spacing).round() * spacing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_coord_truncates_toward_zero() {
        assert_eq!(to_grid_coord(Vector2::new(1.9, 2.1)), GridCoord::new(1, 2));
        assert_eq!(to_grid_coord(Vector2::new(-0.5, -1.5)), GridCoord::new(0, -1));
    }

    #[test]
    fn test_is_in_range() {
        let min = GridCoord::ZERO;
        let max = GridCoord::new(3, 2);
        assert!(is_in_range(GridCoord::new(0, 0), min, max));
        assert!(is_in_range(GridCoord::new(2, 1), min, max));
        assert!(!is_in_range(GridCoord::new(3, 1), min, max));
        assert!(!is_in_range(GridCoord::new(0, -1), min, max));
    }

    #[test]
    fn test_fast_pow6() {
        assert_eq!(fast_pow6(2.0), 64.0);
        assert_eq!(fast_pow6(-1.0), 1.0);
        assert!((fast_pow6(1.5) - 1.5f64.powi(6)).abs() < 1e-12);
    }

    #[test]
    fn test_snap_to_lattice() {
        let snapped = snap_to_lattice(Vector2::new(57.0, 21.0), 40.0);
        assert_eq!(snapped, Vector2::new(40.0, 40.0));
        assert_eq!(snap_to_lattice(Vector2::new(3.3, 4.4), 0.0), Vector2::new(3.3, 4.4));
    }

    #[test]
    fn test_vector_ops() {
        let a = Vector2::new(1.0, 2.0);
        let b = Vector2::new(3.0, -1.0);
        assert_eq!(a + b, Vector2::new(4.0, 1.0));
        assert_eq!(a - b, Vector2::new(-2.0, 3.0));
        assert_eq!(a * 2.0, Vector2::new(2.0, 4.0));
        assert_eq!(b.length_squared(), 10.0);
    }
}
