//! Coordinate value types shared by the projection, distance and localization
//! layers.
//!
//! Pixel space has its origin at the top-left of the image with `y` growing
//! downward. Geographic space is WGS84 degrees.

pub mod projection;

use serde::{Deserialize, Serialize};

use crate::error::{LocateError, LocateResult};

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[inline]
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether the point is finite and inside lat [-90, 90], lon [-180, 180].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(p: GeoPoint) -> Self {
        // geo uses (x = lon, y = lat)
        geo::Point::new(p.lon, p.lat)
    }
}

/// An integer pixel location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: i64,
    pub y: i64,
}

impl PixelPoint {
    #[inline]
    #[must_use]
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    #[inline]
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Continuous center of the image, `(width / 2, height / 2)` in floating point.
    #[inline]
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }

    pub(crate) fn ensure_non_empty(&self) -> LocateResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(LocateError::degenerate(format!(
                "image size {}x{} has a zero dimension",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Axis-aligned detection box in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    /// Create a pixel box, rejecting boxes without positive width and height.
    ///
    /// # Errors
    /// Returns [`LocateError::DegenerateBoundingBox`] if `xmin >= xmax`,
    /// `ymin >= ymax` or any coordinate is not finite.
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> LocateResult<Self> {
        let bbox = Self { xmin, ymin, xmax, ymax };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Check that the box has positive, finite extent.
    ///
    /// # Errors
    /// Returns [`LocateError::DegenerateBoundingBox`] for empty, inverted or
    /// non-finite boxes.
    pub fn validate(&self) -> LocateResult<()> {
        let finite = [self.xmin, self.ymin, self.xmax, self.ymax]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.xmin >= self.xmax || self.ymin >= self.ymax {
            return Err(LocateError::degenerate(format!(
                "pixel box ({}, {}, {}, {}) has no positive extent",
                self.xmin, self.ymin, self.xmax, self.ymax
            )));
        }
        Ok(())
    }

    /// Pixel centroid `((xmin + xmax) / 2, (ymin + ymax) / 2)`.
    #[inline]
    #[must_use]
    pub fn centroid(&self) -> (f64, f64) {
        ((self.xmin + self.xmax) / 2.0, (self.ymin + self.ymax) / 2.0)
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }
}

/// Geographic footprint of an image: `xmin`/`xmax` are longitudes and
/// `ymin`/`ymax` latitudes, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl GeoBox {
    #[must_use]
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self { xmin, ymin, xmax, ymax }
    }

    /// Square box of half-side `offset` degrees centred on `center`, the
    /// footprint requested from WMS servers.
    #[must_use]
    pub fn around(center: GeoPoint, offset: f64) -> Self {
        Self {
            xmin: center.lon - offset,
            ymin: center.lat - offset,
            xmax: center.lon + offset,
            ymax: center.lat + offset,
        }
    }

    /// Lon/lat footprint of XYZ tile `(z, x, y)` at standard pixel density.
    #[must_use]
    pub fn from_tile(z: u32, x: u32, y: u32) -> Self {
        let size = projection::TILE_SIZE;
        let left = f64::from(x) * size;
        let top = f64::from(y) * size;

        let nw = projection::tile_pixel_to_geo(left, top, z, 1.0);
        let se = projection::tile_pixel_to_geo(left + size, top + size, z, 1.0);

        Self {
            xmin: nw.lon,
            ymin: se.lat,
            xmax: se.lon,
            ymax: nw.lat,
        }
    }

    /// Whether `point` lies inside the box (edges included).
    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lon >= self.xmin.min(self.xmax)
            && point.lon <= self.xmin.max(self.xmax)
            && point.lat >= self.ymin.min(self.ymax)
            && point.lat <= self.ymin.max(self.ymax)
    }

    /// Reject boxes that would divide by zero during interpolation.
    pub(crate) fn ensure_non_degenerate(&self) -> LocateResult<()> {
        let finite = [self.xmin, self.ymin, self.xmax, self.ymax]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(LocateError::degenerate(format!(
                "geo box ({}, {}, {}, {}) has non-finite bounds",
                self.xmin, self.ymin, self.xmax, self.ymax
            )));
        }
        if self.xmax == self.xmin {
            return Err(LocateError::degenerate(format!(
                "geo box has zero longitude span at {}",
                self.xmin
            )));
        }
        if self.ymax == self.ymin {
            return Err(LocateError::degenerate(format!(
                "geo box has zero latitude span at {}",
                self.ymin
            )));
        }
        Ok(())
    }
}
