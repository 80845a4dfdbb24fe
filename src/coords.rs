//! Coordinate mapping between raw world-space and the map's display space.
//!
//! The live player feed arrives in the same convention the map tiles use, so
//! its positions are only sign-flipped for display. NPC and garage data come
//! from a different export and are first normalised into the 256-unit tile
//! square.

use crate::types::{MapPoint, WorldBounds, WorldPoint};
use serde::{Deserialize, Serialize};

/// Side length of the planar unit square used by the tile layer.
pub const MAP_UNITS: f64 = 256.0;

/// How a category's source coordinates relate to the display layer.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateConvention {
    /// Already in display units; only the y-axis flip applies.
    Raw,
    /// Normalised through [`CoordinateMapper::to_map_units`] before the flip.
    Normalized,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    bounds: WorldBounds,
}

impl CoordinateMapper {
    pub fn new(bounds: WorldBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> &WorldBounds {
        &self.bounds
    }

    /// Affine normalisation of `(x, y)` into `[0, 256]` on both axes.
    pub fn to_map_units(&self, x: f64, y: f64) -> (f64, f64) {
        let b = &self.bounds;
        let u = (x - b.min_x) / b.width() * MAP_UNITS;
        let v = (y - b.min_y) / b.height() * MAP_UNITS;
        (u, v)
    }

    /// False if either axis falls outside the world bounds (edges are inside).
    pub fn in_bounds(&self, x: f64, y: f64) -> bool {
        let b = &self.bounds;
        x >= b.min_x && x <= b.max_x && y >= b.min_y && y <= b.max_y
    }

    pub fn contains(&self, p: WorldPoint) -> bool {
        self.in_bounds(p.x, p.y)
    }

    /// Flip into the display layer's `(lat, lng)` ordering.
    pub fn project_for_display(x: f64, y: f64) -> MapPoint {
        MapPoint::new(-y, x)
    }

    /// Full raw → display mapping for a given convention.
    pub fn place(&self, convention: CoordinateConvention, p: WorldPoint) -> MapPoint {
        match convention {
            CoordinateConvention::Raw => Self::project_for_display(p.x, p.y),
            CoordinateConvention::Normalized => {
                let (u, v) = self.to_map_units(p.x, p.y);
                Self::project_for_display(u, v)
            }
        }
    }
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self::new(WorldBounds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> CoordinateMapper {
        CoordinateMapper::default()
    }

    #[test]
    fn corners_map_to_unit_square() {
        let m = mapper();
        let b = WorldBounds::default();
        assert_eq!(m.to_map_units(b.min_x, b.min_y), (0.0, 0.0));
        assert_eq!(m.to_map_units(b.max_x, b.max_y), (MAP_UNITS, MAP_UNITS));
    }

    #[test]
    fn midpoint_maps_to_centre() {
        let m = mapper();
        let (u, v) = m.to_map_units(-180_000.0, 780_000.0);
        assert!((u - 128.0).abs() < 1e-9);
        assert!((v - 128.0).abs() < 1e-9);
    }

    #[test]
    fn bounds_are_inclusive() {
        let m = mapper();
        assert!(m.in_bounds(-1_280_000.0, -320_000.0));
        assert!(m.in_bounds(920_000.0, 1_880_000.0));
        assert!(!m.in_bounds(920_000.1, 0.0));
        assert!(!m.in_bounds(0.0, -320_000.5));
    }

    #[test]
    fn display_projection_flips_y() {
        let p = CoordinateMapper::project_for_display(10.0, 150_000.0);
        assert_eq!(p, MapPoint::new(-150_000.0, 10.0));
    }

    #[test]
    fn place_respects_convention() {
        let m = mapper();
        let p = WorldPoint::new(920_000.0, 1_880_000.0);
        assert_eq!(
            m.place(CoordinateConvention::Raw, p),
            MapPoint::new(-1_880_000.0, 920_000.0)
        );
        assert_eq!(
            m.place(CoordinateConvention::Normalized, p),
            MapPoint::new(-MAP_UNITS, MAP_UNITS)
        );
    }
}
