//! Pixel ↔ geographic conversions for the two acquisition conventions.
//!
//! * **Geo box**: the image footprint is an explicit lon/lat rectangle and
//!   positions are interpolated linearly inside it.
//! * **Tile**: the image lives on the Web Mercator (EPSG:3857) pixel grid of a
//!   given zoom and scale, with the reference point at the image centre.
//!
//! Every function here is pure. Longitude is never clamped; only the sine of
//! latitude is clamped, and only inside the tile projection.

use std::f64::consts::PI;

use crate::casting::{center_index, f64_to_pixel_coord};
use crate::error::{LocateError, LocateResult};
use crate::geometry::{GeoBox, GeoPoint, ImageSize, PixelPoint};
use crate::metadata::ImageMetadata;

/// Edge length of one Web Mercator tile at scale 1.
pub const TILE_SIZE: f64 = 256.0;

/// Bound on `sin(lat)` that keeps the Mercator logarithm finite at the poles.
pub const MAX_SIN_LAT: f64 = 0.9999;

/// Width (and height) in pixels of the whole world at `zoom` and `scale`.
#[inline]
#[must_use]
pub fn map_size(zoom: u32, scale: f64) -> f64 {
    TILE_SIZE * f64::from(zoom).exp2() * scale
}

/// Convert an image pixel position to lon/lat inside a geographic box.
///
/// Longitude grows with `x` from `bbox.xmin` to `bbox.xmax`; latitude falls
/// with `y`, row 0 being `bbox.ymax`.
///
/// # Errors
/// Returns [`LocateError::DegenerateBoundingBox`] if the image has a zero
/// dimension or the box has zero span on either axis.
pub fn pixel_to_geo_box(x: f64, y: f64, size: ImageSize, bbox: &GeoBox) -> LocateResult<GeoPoint> {
    size.ensure_non_empty()?;
    bbox.ensure_non_degenerate()?;

    let lon = bbox.xmin + (x / f64::from(size.width)) * (bbox.xmax - bbox.xmin);
    let lat = bbox.ymax - (y / f64::from(size.height)) * (bbox.ymax - bbox.ymin);
    Ok(GeoPoint::new(lat, lon))
}

/// Inverse of [`pixel_to_geo_box`], truncating the fractional position to a
/// pixel index.
///
/// Points outside the box map to pixel indices outside the image.
///
/// # Errors
/// Returns [`LocateError::DegenerateBoundingBox`] for a zero-span box or empty
/// image, and [`LocateError::InvalidMetadata`] if the point has no finite
/// pixel position.
pub fn geo_to_pixel_box(point: GeoPoint, bbox: &GeoBox, size: ImageSize) -> LocateResult<PixelPoint> {
    size.ensure_non_empty()?;
    bbox.ensure_non_degenerate()?;

    let x_frac = (point.lon - bbox.xmin) / (bbox.xmax - bbox.xmin);
    let y_frac = 1.0 - (point.lat - bbox.ymin) / (bbox.ymax - bbox.ymin);

    let x = f64_to_pixel_coord(x_frac * f64::from(size.width));
    let y = f64_to_pixel_coord(y_frac * f64::from(size.height));

    match (x, y) {
        (Some(x), Some(y)) => Ok(PixelPoint::new(x, y)),
        _ => Err(LocateError::invalid_metadata(format!(
            "point ({}, {}) has no finite pixel position",
            point.lat, point.lon
        ))),
    }
}

/// Project lon/lat onto the Web Mercator pixel grid.
///
/// `sin(lat)` is clamped to ±[`MAX_SIN_LAT`] so the poles produce finite
/// values. `scale` must be positive.
#[must_use]
pub fn geo_to_tile_pixel(point: GeoPoint, zoom: u32, scale: f64) -> (f64, f64) {
    let siny = point.lat.to_radians().sin().clamp(-MAX_SIN_LAT, MAX_SIN_LAT);
    let size = map_size(zoom, scale);

    let x = (point.lon + 180.0) / 360.0 * size;
    let y = (0.5 - ((1.0 + siny) / (1.0 - siny)).ln() / (4.0 * PI)) * size;
    (x, y)
}

/// Inverse of [`geo_to_tile_pixel`].
#[must_use]
pub fn tile_pixel_to_geo(x: f64, y: f64, zoom: u32, scale: f64) -> GeoPoint {
    let size = map_size(zoom, scale);

    let lon = x / size * 360.0 - 180.0;
    let n = PI - 2.0 * PI * y / size;
    let lat = n.sinh().atan().to_degrees();
    GeoPoint::new(lat, lon)
}

/// XYZ tile `(column, row)` containing `point` at `zoom`.
#[must_use]
pub fn geo_to_tile_index(point: GeoPoint, zoom: u32) -> (u32, u32) {
    let (x, y) = geo_to_tile_pixel(point, zoom, 1.0);
    let max_index = f64::from(zoom).exp2() - 1.0;

    let col = (x / TILE_SIZE).floor().clamp(0.0, max_index);
    let row = (y / TILE_SIZE).floor().clamp(0.0, max_index);
    // Clamped to [0, 2^zoom - 1] above
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    (col as u32, row as u32)
}

/// Pixel location of the metadata's own reference point within the image.
///
/// Tile imagery is centred on its reference point, so the answer is always the
/// integer image centre. Geo box imagery places the point with
/// [`geo_to_pixel_box`].
///
/// # Errors
/// Propagates [`geo_to_pixel_box`] failures for geo box metadata.
pub fn resolve_reference_pixel(metadata: &ImageMetadata, size: ImageSize) -> LocateResult<PixelPoint> {
    match metadata {
        ImageMetadata::Tile { .. } => Ok(PixelPoint::new(
            center_index(size.width),
            center_index(size.height),
        )),
        ImageMetadata::GeoBox { reference, bbox } => geo_to_pixel_box(*reference, bbox, size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAT: f64 = 51.607_777;
    const LON: f64 = -0.570_024;
    const ZOOM: u32 = 18;
    const SCALE: f64 = 2.0;

    fn bbox() -> GeoBox {
        GeoBox::new(-0.570_523_999_999_999_9, 51.607_276_999_999_996, -0.569_524, 51.608_277)
    }

    fn size() -> ImageSize {
        ImageSize::new(500, 500)
    }

    #[test]
    fn test_pixel_to_geo_box_center() {
        let p = pixel_to_geo_box(250.0, 250.0, size(), &bbox()).unwrap();
        assert!((p.lon - -0.57).abs() < 0.1, "lon: {}", p.lon);
        assert!((p.lat - 51.60).abs() < 0.1, "lat: {}", p.lat);
        // Much tighter than the above: centre of the box is the reference point
        assert!((p.lon - LON).abs() < 1e-9);
        assert!((p.lat - LAT).abs() < 1e-9);
    }

    #[test]
    fn test_pixel_to_geo_box_corners() {
        let b = bbox();
        let nw = pixel_to_geo_box(0.0, 0.0, size(), &b).unwrap();
        assert_eq!(nw.lon, b.xmin);
        assert_eq!(nw.lat, b.ymax);

        let se = pixel_to_geo_box(500.0, 500.0, size(), &b).unwrap();
        assert!((se.lon - b.xmax).abs() < 1e-12);
        assert!((se.lat - b.ymin).abs() < 1e-12);
    }

    #[test]
    fn test_geo_to_pixel_box_reference() {
        let p = geo_to_pixel_box(GeoPoint::new(LAT, LON), &bbox(), size()).unwrap();
        assert_eq!(p, PixelPoint::new(250, 250));
    }

    #[test]
    fn test_geo_to_pixel_box_truncates() {
        let b = GeoBox::new(0.0, 0.0, 1.0, 1.0);
        let s = ImageSize::new(10, 10);
        // x = 3.99 px, y = (1 - 0.71) * 10 = 2.9 px
        let p = geo_to_pixel_box(GeoPoint::new(0.71, 0.399), &b, s).unwrap();
        assert_eq!(p, PixelPoint::new(3, 2));
    }

    #[test]
    fn test_geo_to_pixel_box_outside_is_not_clamped() {
        let b = GeoBox::new(0.0, 0.0, 1.0, 1.0);
        let s = ImageSize::new(10, 10);
        let p = geo_to_pixel_box(GeoPoint::new(0.5, 2.0), &b, s).unwrap();
        assert_eq!(p, PixelPoint::new(20, 5));
    }

    #[test]
    fn test_geo_box_roundtrip_within_one_pixel() {
        let b = bbox();
        let s = size();
        let px_lon = (b.xmax - b.xmin) / f64::from(s.width);
        let px_lat = (b.ymax - b.ymin) / f64::from(s.height);

        let points = [
            (51.6073, -0.5705),
            (51.6080, -0.5699),
            (51.60777, -0.57002),
            (51.6082, -0.56955),
        ];

        for (lat, lon) in points {
            let original = GeoPoint::new(lat, lon);
            assert!(b.contains(original));
            let px = geo_to_pixel_box(original, &b, s).unwrap();
            #[allow(clippy::cast_precision_loss)]
            let back = pixel_to_geo_box(px.x as f64, px.y as f64, s, &b).unwrap();
            assert!((back.lon - lon).abs() <= px_lon, "lon: {} -> {}", lon, back.lon);
            assert!((back.lat - lat).abs() <= px_lat, "lat: {} -> {}", lat, back.lat);
        }
    }

    #[test]
    fn test_geo_box_degenerate_inputs() {
        let flat_lon = GeoBox::new(1.0, 0.0, 1.0, 1.0);
        let flat_lat = GeoBox::new(0.0, 1.0, 1.0, 1.0);
        let p = GeoPoint::new(0.5, 0.5);

        assert!(matches!(
            pixel_to_geo_box(1.0, 1.0, size(), &flat_lon),
            Err(LocateError::DegenerateBoundingBox(_))
        ));
        assert!(matches!(
            pixel_to_geo_box(1.0, 1.0, size(), &flat_lat),
            Err(LocateError::DegenerateBoundingBox(_))
        ));
        assert!(matches!(
            pixel_to_geo_box(1.0, 1.0, ImageSize::new(0, 500), &bbox()),
            Err(LocateError::DegenerateBoundingBox(_))
        ));
        assert!(matches!(
            pixel_to_geo_box(1.0, 1.0, ImageSize::new(500, 0), &bbox()),
            Err(LocateError::DegenerateBoundingBox(_))
        ));
        assert!(matches!(
            geo_to_pixel_box(p, &flat_lon, size()),
            Err(LocateError::DegenerateBoundingBox(_))
        ));
    }

    #[test]
    fn test_geo_to_tile_pixel_reference() {
        let (x, y) = geo_to_tile_pixel(GeoPoint::new(LAT, LON), ZOOM, SCALE);
        assert!((x - 66_896_343.64).abs() <= 0.01, "x: {}", x);
        assert!((y - 44_570_627.75).abs() <= 0.01, "y: {}", y);
    }

    #[test]
    fn test_tile_pixel_to_geo_reference() {
        let p = tile_pixel_to_geo(66_896_343.64, 44_570_627.75, ZOOM, SCALE);
        assert!((p.lat - 51.60).abs() <= 0.01, "lat: {}", p.lat);
        assert!((p.lon - -0.57).abs() <= 0.01, "lon: {}", p.lon);
    }

    #[test]
    fn test_tile_origin() {
        let (x, y) = geo_to_tile_pixel(GeoPoint::new(0.0, 0.0), 3, 1.0);
        assert!((x - 1024.0).abs() < 1e-9);
        assert!((y - 1024.0).abs() < 1e-9);
    }

    #[test]
    fn test_tile_roundtrip() {
        let points = [
            (0.0, 0.0),
            (LAT, LON),
            (37.8, -122.4),
            (-33.86, 151.21),
            (84.9, 179.9),
            (-84.9, -179.9),
        ];

        for (lat, lon) in points {
            for (zoom, scale) in [(0, 1.0), (10, 1.0), (18, 2.0), (21, 1.5)] {
                let (x, y) = geo_to_tile_pixel(GeoPoint::new(lat, lon), zoom, scale);
                let back = tile_pixel_to_geo(x, y, zoom, scale);
                assert!((back.lat - lat).abs() < 1e-6, "lat {} z{}: {}", lat, zoom, back.lat);
                assert!((back.lon - lon).abs() < 1e-6, "lon {} z{}: {}", lon, zoom, back.lon);
            }
        }
    }

    #[test]
    fn test_tile_projection_poles_are_finite() {
        for lat in [90.0, -90.0] {
            let (x, y) = geo_to_tile_pixel(GeoPoint::new(lat, 0.0), 0, 1.0);
            assert!(x.is_finite() && y.is_finite(), "lat {}: ({}, {})", lat, x, y);
        }
        let (_, north) = geo_to_tile_pixel(GeoPoint::new(90.0, 0.0), 0, 1.0);
        let (_, south) = geo_to_tile_pixel(GeoPoint::new(-90.0, 0.0), 0, 1.0);
        assert!(north < 0.0, "clamped north pole sits above the map: {}", north);
        assert!(south > TILE_SIZE, "clamped south pole sits below the map: {}", south);
    }

    #[test]
    fn test_longitude_is_not_clamped() {
        let (x, _) = geo_to_tile_pixel(GeoPoint::new(0.0, 270.0), 0, 1.0);
        assert!((x - 320.0).abs() < 1e-9);
    }

    #[test]
    fn test_geo_to_tile_index() {
        assert_eq!(geo_to_tile_index(GeoPoint::new(LAT, LON), 18), (130_656, 87_052));
        assert_eq!(geo_to_tile_index(GeoPoint::new(0.0, 0.0), 0), (0, 0));
        assert_eq!(geo_to_tile_index(GeoPoint::new(89.9, 180.0), 2), (3, 0));
        assert_eq!(geo_to_tile_index(GeoPoint::new(-89.9, -180.0), 2), (0, 3));
    }

    #[test]
    fn test_tile_index_consistent_with_from_tile() {
        let p = GeoPoint::new(LAT, LON);
        let (x, y) = geo_to_tile_index(p, 15);
        assert!(GeoBox::from_tile(15, x, y).contains(p));
    }

    #[test]
    fn test_resolve_reference_pixel_tile_is_center() {
        let metadata = ImageMetadata::Tile {
            reference: GeoPoint::new(LAT, LON),
            zoom: ZOOM,
            scale: SCALE,
        };
        for (w, h) in [(500, 500), (1000, 640), (7, 3)] {
            let p = resolve_reference_pixel(&metadata, ImageSize::new(w, h)).unwrap();
            assert_eq!(p, PixelPoint::new(i64::from(w / 2), i64::from(h / 2)));
        }

        // Stored fields do not matter for tile imagery
        let far_away = ImageMetadata::Tile {
            reference: GeoPoint::new(-10.0, 120.0),
            zoom: 3,
            scale: 1.0,
        };
        let p = resolve_reference_pixel(&far_away, size()).unwrap();
        assert_eq!(p, PixelPoint::new(250, 250));
    }

    #[test]
    fn test_resolve_reference_pixel_geo_box() {
        let metadata = ImageMetadata::GeoBox {
            reference: GeoPoint::new(LAT, LON),
            bbox: bbox(),
        };
        let p = resolve_reference_pixel(&metadata, size()).unwrap();
        assert_eq!(p, PixelPoint::new(250, 250));
    }
}
