#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

use crate::geom::{Bounds, Point};

/// The visible part of the map: its pixel size and the world rectangle it shows.
///
/// Screen Y grows downward; world Y grows upward (north). The host keeps this
/// in sync with the map after every pan/zoom so pointer positions can be
/// unprojected without a round trip to the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width_px: f64,
    pub height_px: f64,
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Default for Viewport {
    /// A 1×1 pixel viewport over the unit square below the origin.
    fn default() -> Self {
        Self { width_px: 1.0, height_px: 1.0, west: 0.0, south: -1.0, east: 1.0, north: 0.0 }
    }
}

impl Viewport {
    /// World units per screen pixel along X.
    #[must_use]
    pub fn units_per_px_x(&self) -> f64 {
        (self.east - self.west) / self.width_px
    }

    /// World units per screen pixel along Y.
    #[must_use]
    pub fn units_per_px_y(&self) -> f64 {
        (self.north - self.south) / self.height_px
    }

    /// Convert a screen-space point (CSS pixels) to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: self.west + screen.x * self.units_per_px_x(),
            y: self.north - screen.y * self.units_per_px_y(),
        }
    }

    /// Convert a world-space point to screen coordinates (CSS pixels).
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: (world.x - self.west) / self.units_per_px_x(),
            y: (self.north - world.y) / self.units_per_px_y(),
        }
    }

    /// Convert a screen-space distance (pixels) to world-space distance along X.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist * self.units_per_px_x()
    }

    /// The world rectangle covered by the viewport.
    #[must_use]
    pub fn world_bounds(&self) -> Bounds {
        Bounds { min_x: self.west, min_y: self.south, max_x: self.east, max_y: self.north }
    }
}
