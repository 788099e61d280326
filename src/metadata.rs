//! Image acquisition metadata.
//!
//! [`ImageMetadata`] is the validated, mode-tagged form the rest of the crate
//! works with. [`MetadataRecord`] mirrors the JSON sidecars written next to
//! downloaded imagery:
//!
//! ```json
//! {"lat": 51.607777, "lon": -0.570024, "zoom": 18, "scale": 2, "img_size": [500, 500], "type": "static"}
//! {"lat": 51.607777, "lon": -0.570024, "bbox": [-0.570524, 51.607277, -0.569524, 51.608277], "type": "wms"}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{LocateError, LocateResult};
use crate::geometry::projection::map_size;
use crate::geometry::{GeoBox, GeoPoint};

/// Highest zoom level accepted for tile imagery.
pub const MAX_ZOOM: u32 = 30;

/// Scale used when a tile record does not carry one.
pub const DEFAULT_SCALE: f64 = 1.0;

/// Reference point plus whichever footprint description the imagery carries.
///
/// The variant decides the transform path; there is no separate mode flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ImageMetadata {
    /// Imagery with an explicit lon/lat footprint (WMS).
    GeoBox { reference: GeoPoint, bbox: GeoBox },
    /// Imagery cut from the Web Mercator grid, centred on `reference`
    /// (static maps and XYZ tiles).
    Tile {
        reference: GeoPoint,
        zoom: u32,
        scale: f64,
    },
}

impl ImageMetadata {
    /// Geo box metadata, validated.
    ///
    /// # Errors
    /// Returns [`LocateError::InvalidMetadata`] for an out-of-range reference
    /// point or non-finite box bounds.
    pub fn geo_box(reference: GeoPoint, bbox: GeoBox) -> LocateResult<Self> {
        let metadata = Self::GeoBox { reference, bbox };
        metadata.validate()?;
        Ok(metadata)
    }

    /// Tile metadata, validated.
    ///
    /// # Errors
    /// Returns [`LocateError::InvalidMetadata`] for an out-of-range reference
    /// point, a zoom above [`MAX_ZOOM`] or a non-positive scale.
    pub fn tile(reference: GeoPoint, zoom: u32, scale: f64) -> LocateResult<Self> {
        let metadata = Self::Tile { reference, zoom, scale };
        metadata.validate()?;
        Ok(metadata)
    }

    /// The ground-truth point the imagery was requested around.
    #[must_use]
    pub fn reference(&self) -> GeoPoint {
        match self {
            Self::GeoBox { reference, .. } | Self::Tile { reference, .. } => *reference,
        }
    }

    /// Short name of the acquisition mode, used in log fields.
    #[must_use]
    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::GeoBox { .. } => "geo_box",
            Self::Tile { .. } => "tile",
        }
    }

    /// Check every field against the ranges the transforms rely on.
    ///
    /// # Errors
    /// Returns [`LocateError::InvalidMetadata`] describing the first bad field.
    pub fn validate(&self) -> LocateResult<()> {
        let reference = self.reference();
        if !reference.is_valid() {
            return Err(LocateError::invalid_metadata(format!(
                "reference point ({}, {}) is outside WGS84 bounds",
                reference.lat, reference.lon
            )));
        }

        match self {
            Self::GeoBox { bbox, .. } => {
                let finite = [bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax]
                    .iter()
                    .all(|v| v.is_finite());
                if !finite {
                    return Err(LocateError::invalid_metadata("bbox has non-finite bounds"));
                }
            }
            Self::Tile { zoom, scale, .. } => {
                if *zoom > MAX_ZOOM {
                    return Err(LocateError::invalid_metadata(format!(
                        "zoom {zoom} exceeds maximum {MAX_ZOOM}"
                    )));
                }
                if !scale.is_finite() || *scale <= 0.0 {
                    return Err(LocateError::invalid_metadata(format!(
                        "scale {scale} must be a positive number"
                    )));
                }
                if !map_size(*zoom, *scale).is_finite() {
                    return Err(LocateError::invalid_metadata(format!(
                        "scale {scale} at zoom {zoom} overflows the pixel grid"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Acquisition type label as written by the downloaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionType {
    /// Static map centred on the reference point.
    Static,
    /// Single XYZ tile.
    Tiles,
    /// Web Map Service request over a lon/lat box.
    Wms,
}

impl AcquisitionType {
    /// Parse a sidecar `type` label.
    ///
    /// # Errors
    /// Returns [`LocateError::InvalidMetadata`] for unknown labels.
    pub fn from_label(label: &str) -> LocateResult<Self> {
        match label {
            "static" => Ok(Self::Static),
            "tiles" => Ok(Self::Tiles),
            "wms" => Ok(Self::Wms),
            other => Err(LocateError::invalid_metadata(format!(
                "unknown acquisition type {other:?}"
            ))),
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Tiles => "tiles",
            Self::Wms => "wms",
        }
    }
}

/// Raw metadata sidecar as stored on disk.
///
/// All mode-specific fields are optional here; [`ImageMetadata::try_from`]
/// decides which mode applies and rejects records missing what it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_size: Option<[u32; 2]>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
}

impl MetadataRecord {
    fn tile_metadata(&self, reference: GeoPoint) -> LocateResult<ImageMetadata> {
        let zoom = self
            .zoom
            .ok_or_else(|| LocateError::invalid_metadata("tile imagery requires a zoom level"))?;
        ImageMetadata::tile(reference, zoom, self.scale.unwrap_or(DEFAULT_SCALE))
    }

    fn geo_box_metadata(&self, reference: GeoPoint) -> LocateResult<ImageMetadata> {
        let [xmin, ymin, xmax, ymax] = self
            .bbox
            .ok_or_else(|| LocateError::invalid_metadata("geo box imagery requires a bbox"))?;
        ImageMetadata::geo_box(reference, GeoBox::new(xmin, ymin, xmax, ymax))
    }
}

impl TryFrom<MetadataRecord> for ImageMetadata {
    type Error = LocateError;

    fn try_from(record: MetadataRecord) -> LocateResult<Self> {
        Self::try_from(&record)
    }
}

impl TryFrom<&MetadataRecord> for ImageMetadata {
    type Error = LocateError;

    fn try_from(record: &MetadataRecord) -> LocateResult<Self> {
        let reference = GeoPoint::new(record.lat, record.lon);
        let kind = record.kind.as_deref().map(AcquisitionType::from_label).transpose()?;
        match kind {
            Some(AcquisitionType::Static | AcquisitionType::Tiles) => record.tile_metadata(reference),
            Some(AcquisitionType::Wms) => record.geo_box_metadata(reference),
            // Untyped records: infer from which footprint fields are present
            None if record.bbox.is_some() => record.geo_box_metadata(reference),
            None if record.zoom.is_some() => record.tile_metadata(reference),
            None => Err(LocateError::invalid_metadata(
                "record has neither a type, a bbox nor a zoom level",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> LocateResult<ImageMetadata> {
        let record: MetadataRecord = serde_json::from_str(json).unwrap();
        ImageMetadata::try_from(record)
    }

    #[test]
    fn test_static_record() {
        let m = parse(r#"{"lat": 51.607777, "lon": -0.570024, "zoom": 18, "scale": 2, "img_size": [500, 500], "type": "static"}"#).unwrap();
        assert_eq!(
            m,
            ImageMetadata::Tile {
                reference: GeoPoint::new(51.607_777, -0.570_024),
                zoom: 18,
                scale: 2.0,
            }
        );
    }

    #[test]
    fn test_tiles_record_defaults_scale() {
        let m = parse(r#"{"lat": 1.0, "lon": 2.0, "zoom": 19, "img_size": [256, 256], "type": "tiles"}"#).unwrap();
        match m {
            ImageMetadata::Tile { zoom, scale, .. } => {
                assert_eq!(zoom, 19);
                assert_eq!(scale, DEFAULT_SCALE);
            }
            other => panic!("expected tile metadata, got {other:?}"),
        }
    }

    #[test]
    fn test_wms_record() {
        let m = parse(r#"{"lat": 51.6, "lon": -0.57, "bbox": [-0.58, 51.59, -0.56, 51.61], "type": "wms"}"#).unwrap();
        assert_eq!(m.mode_name(), "geo_box");
        assert_eq!(m.reference(), GeoPoint::new(51.6, -0.57));
    }

    #[test]
    fn test_untyped_records_infer_mode() {
        let m = parse(r#"{"lat": 0.0, "lon": 0.0, "bbox": [-1, -1, 1, 1]}"#).unwrap();
        assert_eq!(m.mode_name(), "geo_box");

        let m = parse(r#"{"lat": 0.0, "lon": 0.0, "zoom": 5}"#).unwrap();
        assert_eq!(m.mode_name(), "tile");
    }

    #[test]
    fn test_missing_mode_fields() {
        assert!(matches!(
            parse(r#"{"lat": 0.0, "lon": 0.0, "type": "static", "scale": 2}"#),
            Err(LocateError::InvalidMetadata(_))
        ));
        assert!(matches!(
            parse(r#"{"lat": 0.0, "lon": 0.0, "type": "wms", "zoom": 18}"#),
            Err(LocateError::InvalidMetadata(_))
        ));
        assert!(matches!(
            parse(r#"{"lat": 0.0, "lon": 0.0}"#),
            Err(LocateError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(matches!(
            parse(r#"{"lat": 0.0, "lon": 0.0, "zoom": 3, "type": "lidar"}"#),
            Err(LocateError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_acquisition_labels() {
        for kind in [AcquisitionType::Static, AcquisitionType::Tiles, AcquisitionType::Wms] {
            assert_eq!(AcquisitionType::from_label(kind.label()).unwrap(), kind);
        }
    }

    #[test]
    fn test_validation_ranges() {
        let origin = GeoPoint::new(0.0, 0.0);
        assert!(ImageMetadata::tile(origin, MAX_ZOOM, 1.0).is_ok());
        assert!(ImageMetadata::tile(origin, MAX_ZOOM + 1, 1.0).is_err());
        assert!(ImageMetadata::tile(origin, 10, 0.0).is_err());
        assert!(ImageMetadata::tile(origin, 10, f64::NAN).is_err());
        assert!(ImageMetadata::tile(GeoPoint::new(91.0, 0.0), 10, 1.0).is_err());
        assert!(ImageMetadata::geo_box(origin, GeoBox::new(0.0, 0.0, f64::INFINITY, 1.0)).is_err());
        // Finite scale whose map size overflows f64
        assert!(ImageMetadata::tile(origin, MAX_ZOOM, 1e300).is_err());
        assert!(ImageMetadata::tile(origin, MAX_ZOOM, 4.0).is_ok());
    }

    #[test]
    fn test_metadata_serde_tagging() {
        let m = ImageMetadata::Tile {
            reference: GeoPoint::new(1.0, 2.0),
            zoom: 3,
            scale: 1.0,
        };
        let json = serde_json::to_value(m).unwrap();
        assert_eq!(json["mode"], "tile");
        let back: ImageMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);
    }
}
