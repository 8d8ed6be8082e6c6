// THEORY:
// The `TileSampler` is the bridge between rendered map imagery and the engine.
// A tile server paints each layer into 256x256 Web-Mercator tiles; the engine
// wants geolocated colour samples. This module owns that conversion and
// nothing else: it does not decode colours into physical values.
//
// Key architectural principles:
// 1.  **Projection In One Place**: All Web-Mercator math (lat/lng to fractional
//     tile coordinates, tile bounds) lives here, so the rest of the crate only
//     ever sees plain lat/lng.
// 2.  **Transparent Means Absent**: Tile servers leave land and missing data
//     transparent. Pixels with alpha below half are not samples at all, which is
//     different from a grayscale "no data" colour that the decoder still sees.
// 3.  **Polygon Driven**: Sampling follows the polygon's grid points, so sample
//     density is a property of the request, not of the tile resolution.

use crate::core_modules::pixel::pixel::{Layer, PixelSample, Rgb};
use crate::core_modules::utils::geo::geo::{BoundingBox, LatLng, Polygon};
use crate::core_modules::utils::image_helper::image_helper::decode_rgba;
use crate::error::{AnalysisError, Result};
use image::RgbaImage;
use std::f64::consts::PI;

const MAX_ZOOM: u8 = 24;
const MIN_OPAQUE_ALPHA: u8 = 128;
/// Latitude limit of the square Web-Mercator world.
pub const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// A slippy-map tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Result<Self> {
        if z > MAX_ZOOM {
            return Err(AnalysisError::InvalidTile { z, x, y });
        }
        let n = 1u64 << z;
        if x as u64 >= n || y as u64 >= n {
            return Err(AnalysisError::InvalidTile { z, x, y });
        }
        Ok(Self { z, x, y })
    }

    /// The tile at zoom `z` containing `point`, if the point is inside the
    /// Mercator world.
    pub fn containing(point: &LatLng, z: u8) -> Option<Self> {
        let (fx, fy) = fractional_tile(point, z)?;
        Self::new(z, fx.floor() as u32, fy.floor() as u32).ok()
    }

    fn tiles_per_side(&self) -> f64 {
        (1u64 << self.z) as f64
    }

    pub fn west(&self) -> f64 {
        self.x as f64 / self.tiles_per_side() * 360.0 - 180.0
    }

    pub fn east(&self) -> f64 {
        (self.x + 1) as f64 / self.tiles_per_side() * 360.0 - 180.0
    }

    pub fn north(&self) -> f64 {
        tile_row_to_lat(self.y as f64, self.tiles_per_side())
    }

    pub fn south(&self) -> f64 {
        tile_row_to_lat((self.y + 1) as f64, self.tiles_per_side())
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox {
            west: self.west(),
            south: self.south(),
            east: self.east(),
            north: self.north(),
        }
    }
}

fn tile_row_to_lat(row: f64, n: f64) -> f64 {
    (PI * (1.0 - 2.0 * row / n)).sinh().atan().to_degrees()
}

/// Fractional tile coordinates of a point at zoom `z`.
fn fractional_tile(point: &LatLng, z: u8) -> Option<(f64, f64)> {
    if !point.is_valid() || point.lat.abs() >= MERCATOR_MAX_LAT || z > MAX_ZOOM {
        return None;
    }
    let n = (1u64 << z) as f64;
    let lat_rad = point.lat.to_radians();
    let fx = (point.lng + 180.0) / 360.0 * n;
    let fy = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n;
    // lng = 180 lands exactly on the far edge.
    Some((fx.min(n - f64::EPSILON * n), fy))
}

/// One decoded raster tile of a single layer.
pub struct TileSampler {
    tile: RgbaImage,
    coord: TileCoord,
    layer: Layer,
}

impl TileSampler {
    pub fn new(tile: RgbaImage, coord: TileCoord, layer: Layer) -> Self {
        Self { tile, coord, layer }
    }

    /// Decodes an encoded tile (PNG, JPEG, WebP...).
    pub fn from_bytes(bytes: &[u8], coord: TileCoord, layer: Layer) -> Result<Self> {
        Ok(Self::new(decode_rgba(bytes)?, coord, layer))
    }

    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    /// Pixel under `point`, or `None` outside this tile or on a transparent pixel.
    pub fn sample_at(&self, point: &LatLng) -> Option<PixelSample> {
        let (fx, fy) = fractional_tile(point, self.coord.z)?;
        let local_x = fx - self.coord.x as f64;
        let local_y = fy - self.coord.y as f64;
        if !(0.0..1.0).contains(&local_x) || !(0.0..1.0).contains(&local_y) {
            return None;
        }

        let (width, height) = self.tile.dimensions();
        let px = ((local_x * width as f64) as u32).min(width.saturating_sub(1));
        let py = ((local_y * height as f64) as u32).min(height.saturating_sub(1));
        let pixel = self.tile.get_pixel_checked(px, py)?;
        let [r, g, b, a] = pixel.0;
        if a < MIN_OPAQUE_ALPHA {
            return None;
        }
        PixelSample::new(point.lat, point.lng, Rgb::new(r, g, b), self.layer).ok()
    }

    /// Samples up to `count` grid points of `polygon` that fall on this tile.
    pub fn sample_polygon(&self, polygon: &Polygon, count: usize) -> Vec<PixelSample> {
        polygon
            .grid_points(count)
            .iter()
            .filter_map(|point| self.sample_at(point))
            .collect()
    }
}
