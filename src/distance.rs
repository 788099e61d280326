//! Geodesic distances from detected boxes to the reference point.
//!
//! Each box centroid is placed on the ground using the transform path its
//! metadata variant dictates:
//!
//! - **Tile**: the reference point is projected onto the Mercator pixel grid
//!   and treated as the image centre; the centroid's offset from the image
//!   centre is added there and projected back.
//! - **Geo box**: the centroid is interpolated inside the image footprint.
//!
//! The two paths are not interchangeable. Mercator pixels are not linear in
//! latitude, and geo box footprints carry no zoom.
//!
//! # Example
//!
//! ```rust
//! use geoverify::{compute_distances, BoundingBox, GeoPoint, ImageMetadata, ImageSize};
//!
//! # fn main() -> geoverify::LocateResult<()> {
//! let metadata = ImageMetadata::tile(GeoPoint::new(51.607777, -0.570024), 18, 2.0)?;
//! let boxes = [BoundingBox::new(490.0, 490.0, 510.0, 510.0)?];
//!
//! let records = compute_distances(&metadata, &boxes, ImageSize::new(1000, 1000))?;
//! assert_eq!(records.len(), 1);
//! assert!(records[0].distance_m < 0.01);
//! # Ok(())
//! # }
//! ```

use geo::{Distance, Geodesic};
use serde::{Deserialize, Serialize};

use crate::error::{LocateError, LocateResult};
use crate::geometry::projection::{geo_to_tile_pixel, pixel_to_geo_box, tile_pixel_to_geo};
use crate::geometry::{BoundingBox, GeoPoint, ImageSize};
use crate::metadata::ImageMetadata;

/// Ellipsoidal surface distance between two points, in metres.
///
/// Implementations must be deterministic and accurate to well under a metre
/// over a few hundred metres.
pub trait GeodesicDistance: Send + Sync {
    fn distance(&self, a: GeoPoint, b: GeoPoint) -> f64;
}

/// Karney's geodesic on the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Wgs84Geodesic;

impl GeodesicDistance for Wgs84Geodesic {
    #[inline]
    fn distance(&self, a: GeoPoint, b: GeoPoint) -> f64 {
        Geodesic::distance(geo::Point::from(a), geo::Point::from(b))
    }
}

/// Where one detection lands on the ground and how far it is from the reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceRecord {
    /// Ground position of the box centroid.
    pub predicted: GeoPoint,
    /// Geodesic distance to the reference point, metres.
    pub distance_m: f64,
    /// The detection this record was computed from.
    pub bbox: BoundingBox,
}

/// Ground position of a pixel in an image described by `metadata`.
///
/// # Errors
/// - [`LocateError::InvalidMetadata`] if `metadata` fails [`ImageMetadata::validate`].
/// - [`LocateError::DegenerateBoundingBox`] for an empty image or a zero-span geo box.
pub fn pixel_to_ground(metadata: &ImageMetadata, x: f64, y: f64, size: ImageSize) -> LocateResult<GeoPoint> {
    metadata.validate()?;
    place_pixel(metadata, x, y, size)
}

fn place_pixel(metadata: &ImageMetadata, x: f64, y: f64, size: ImageSize) -> LocateResult<GeoPoint> {
    size.ensure_non_empty()?;
    match metadata {
        ImageMetadata::Tile { reference, zoom, scale } => {
            let (center_px, center_py) = geo_to_tile_pixel(*reference, *zoom, *scale);
            let (image_cx, image_cy) = size.center();
            let abs_px = center_px - image_cx + x;
            let abs_py = center_py - image_cy + y;
            Ok(tile_pixel_to_geo(abs_px, abs_py, *zoom, *scale))
        }
        ImageMetadata::GeoBox { bbox, .. } => pixel_to_geo_box(x, y, size, bbox),
    }
}

/// One [`DistanceRecord`] per box, in input order, using [`Wgs84Geodesic`].
///
/// # Errors
/// - [`LocateError::InvalidMetadata`] if `metadata` fails [`ImageMetadata::validate`]
///   or a box lands somewhere no finite distance can be measured.
/// - [`LocateError::DegenerateBoundingBox`] if any box, the image size or the
///   geo box footprint is degenerate.
pub fn compute_distances(
    metadata: &ImageMetadata,
    boxes: &[BoundingBox],
    size: ImageSize,
) -> LocateResult<Vec<DistanceRecord>> {
    compute_distances_with(metadata, boxes, size, &Wgs84Geodesic)
}

/// [`compute_distances`] with a caller-supplied geodesic.
///
/// # Errors
/// Same as [`compute_distances`].
pub fn compute_distances_with<G: GeodesicDistance + ?Sized>(
    metadata: &ImageMetadata,
    boxes: &[BoundingBox],
    size: ImageSize,
    geodesic: &G,
) -> LocateResult<Vec<DistanceRecord>> {
    metadata.validate()?;
    let reference = metadata.reference();

    boxes
        .iter()
        .map(|bbox| {
            bbox.validate()?;
            let (x, y) = bbox.centroid();
            let predicted = place_pixel(metadata, x, y, size)?;

            let distance_m = geodesic.distance(predicted, reference);
            if !distance_m.is_finite() || distance_m < 0.0 {
                return Err(LocateError::invalid_metadata(format!(
                    "{} metadata places box centroid ({x}, {y}) at ({}, {}), distance {distance_m}",
                    metadata.mode_name(),
                    predicted.lat,
                    predicted.lon
                )));
            }

            Ok(DistanceRecord {
                predicted,
                distance_m,
                bbox: *bbox,
            })
        })
        .collect()
}
