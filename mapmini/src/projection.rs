//! Conversions between geographic coordinates, slippy map tiles and display
//! pixels.

use std::f64::consts::PI;

/// Coordinates in the map file are stored in micro-degrees.
pub const MICRO_DEGREES: f64 = 1_000_000.0;

#[inline]
fn tiles_at(zoom: u8) -> f64 {
    2.0_f64.powi(i32::from(zoom))
}

/// Column of the tile containing longitude `lon` at `zoom`.
#[inline]
pub fn lon_to_tile_x(lon: f64, zoom: u8) -> i64 {
    ((lon + 180.0) / 360.0 * tiles_at(zoom)).floor() as i64
}

/// Row of the tile containing latitude `lat` at `zoom` (Web Mercator).
#[inline]
pub fn lat_to_tile_y(lat: f64, zoom: u8) -> i64 {
    let lat_rad = lat * PI / 180.0;
    ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * tiles_at(zoom)).floor() as i64
}

/// Longitude of the western edge of tile column `x`.
#[inline]
pub fn tile_x_to_lon(x: i64, zoom: u8) -> f64 {
    x as f64 / tiles_at(zoom) * 360.0 - 180.0
}

/// Latitude of the northern edge of tile row `y`.
#[inline]
pub fn tile_y_to_lat(y: i64, zoom: u8) -> f64 {
    let n = PI - 2.0 * PI * y as f64 / tiles_at(zoom);
    n.sinh().atan() * 180.0 / PI
}

/// Scale factors mapping micro-degree offsets inside a tile to pixels of a
/// square output of a given size.
///
/// Computed once per tile load and shared by all ways of the tile, so the
/// geometry of neighbouring ways stays consistent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileProjection {
    /// Micro-degrees of latitude per output pixel.
    pub fit_scale: f64,
    /// Ratio of the tile's longitude span to its latitude span; corrects the
    /// non-square footprint of Mercator tiles away from the equator.
    pub x_mercator_scale: f64,
}

impl TileProjection {
    pub fn for_tile(x: u32, y: u32, zoom: u8, output_size: f64) -> Self {
        let (x, y) = (i64::from(x), i64::from(y));
        let lon_span = (tile_x_to_lon(x + 1, zoom) - tile_x_to_lon(x, zoom)).abs();
        let lat_span = (tile_y_to_lat(y + 1, zoom) - tile_y_to_lat(y, zoom)).abs();
        Self::from_spans(lon_span, lat_span, output_size)
    }

    /// Builds the projection from the tile extent in degrees.
    pub fn from_spans(lon_span: f64, lat_span: f64, output_size: f64) -> Self {
        let pixel_width = lon_span * MICRO_DEGREES;
        let pixel_height = lat_span * MICRO_DEGREES;
        Self {
            fit_scale: pixel_height / output_size,
            x_mercator_scale: pixel_width / pixel_height,
        }
    }

    /// Converts an offset from the tile's north-west corner into pixels.
    ///
    /// Latitude offsets grow northwards, pixel rows grow southwards.
    #[inline]
    pub fn to_pixel(&self, lat_offset: i32, lon_offset: i32) -> (i16, i16) {
        let x = f64::from(lon_offset) / (self.fit_scale * self.x_mercator_scale);
        let y = -f64::from(lat_offset) / self.fit_scale;
        // float to int casts saturate at the i16 bounds
        (x.round() as i16, y.round() as i16)
    }
}
