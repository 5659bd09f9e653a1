//! Map viewport: pixel size plus the geographic bounds currently shown.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;

/// Web Mercator sphere radius in meters.
const MERCATOR_RADIUS_M: f64 = 6378137.0;

/// Latitude limit of the Web Mercator projection.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Convert latitude to Web Mercator Y coordinate
pub fn lat_to_mercator_y(lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let lat_rad = lat.to_radians();
    let y = ((std::f64::consts::PI / 4.0) + (lat_rad / 2.0)).tan().ln();
    y * MERCATOR_RADIUS_M
}

/// The visible map area in pixels and degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub bounds: BoundingBox,
}

impl Viewport {
    pub fn new(width: u32, height: u32, bounds: BoundingBox) -> Self {
        Self {
            width,
            height,
            bounds,
        }
    }

    /// Project lon/lat to screen pixels. Longitude is linear across the
    /// bounds, latitude follows Web Mercator. The origin is the top-left corner.
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let x = (lon - self.bounds.min_x) / self.bounds.width() * self.width as f64;

        let top = lat_to_mercator_y(self.bounds.max_y);
        let bottom = lat_to_mercator_y(self.bounds.min_y);
        let y = (top - lat_to_mercator_y(lat)) / (top - bottom) * self.height as f64;

        (x, y)
    }

    /// Whether a pixel position falls inside the raster.
    pub fn contains_pixel(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width as f64 && y < self.height as f64
    }

    /// Same size, shifted bounds.
    pub fn panned(&self, dx_deg: f64, dy_deg: f64) -> Self {
        Self::new(self.width, self.height, self.bounds.translate(dx_deg, dy_deg))
    }

    /// Same size, bounds scaled about the center. `factor < 1` zooms in.
    pub fn zoomed(&self, factor: f64) -> Self {
        Self::new(self.width, self.height, self.bounds.scale_about_center(factor))
    }

    /// Same bounds, new pixel size.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        Self::new(width, height, self.bounds)
    }
}
