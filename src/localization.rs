//! Single-image localization: pick the detection closest to the reference
//! point and flag it when it is too far away.
//!
//! # Example
//!
//! ```rust
//! use geoverify::{BoundingBox, GeoPoint, ImageMetadata, ImageSize, LocalizationEngine};
//!
//! # fn main() -> geoverify::LocateResult<()> {
//! let metadata = ImageMetadata::tile(GeoPoint::new(51.607777, -0.570024), 18, 2.0)?;
//! let boxes = vec![
//!     BoundingBox::new(63.0, 800.0, 102.0, 840.0)?,
//!     BoundingBox::new(589.0, 624.0, 628.0, 664.0)?,
//! ];
//!
//! let result = LocalizationEngine::new().localize(&boxes, &metadata, ImageSize::new(1000, 1000))?;
//! assert_eq!(result.best_index, 1);
//! assert!(result.flagged); // ~33 m is beyond the default 10 m threshold
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::distance::{compute_distances_with, GeodesicDistance, Wgs84Geodesic};
use crate::error::{LocateError, LocateResult};
use crate::geometry::projection::resolve_reference_pixel;
use crate::geometry::{BoundingBox, GeoPoint, ImageSize, PixelPoint};
use crate::metadata::ImageMetadata;

/// Distance in metres at or above which the closest detection is flagged.
pub const DEFAULT_FLAG_THRESHOLD: f64 = 10.0;

/// Options for [`LocalizationEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalizationOptions {
    /// Flag threshold in metres (inclusive).
    pub flag_threshold: f64,
}

impl Default for LocalizationOptions {
    fn default() -> Self {
        Self {
            flag_threshold: DEFAULT_FLAG_THRESHOLD,
        }
    }
}

impl LocalizationOptions {
    /// Set the flag threshold in metres
    #[must_use]
    pub fn with_flag_threshold(mut self, meters: f64) -> Self {
        self.flag_threshold = meters;
        self
    }
}

/// Outcome of localizing one image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalizationResult {
    /// Distance from the closest detection to the reference point, metres.
    pub best_distance_m: f64,
    /// `best_distance_m >= flag_threshold`.
    pub flagged: bool,
    /// The closest detection.
    pub best_bbox: BoundingBox,
    /// Position of the closest detection in the input slice.
    pub best_index: usize,
    /// Ground position of the closest detection's centroid.
    pub predicted: GeoPoint,
    /// Where the reference point itself sits in the image.
    pub reference_pixel: PixelPoint,
}

/// Whether a best distance should be flagged. Equality counts as flagged.
#[inline]
#[must_use]
pub fn is_flagged(best_distance_m: f64, flag_threshold: f64) -> bool {
    best_distance_m >= flag_threshold
}

/// Chooses the closest detection in an image.
///
/// Holds no per-image state, so one engine can serve any number of images
/// from any number of threads.
#[derive(Debug, Clone, Default)]
pub struct LocalizationEngine<G = Wgs84Geodesic> {
    options: LocalizationOptions,
    geodesic: G,
}

impl LocalizationEngine {
    /// Engine with default options and the WGS84 geodesic.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<G: GeodesicDistance> LocalizationEngine<G> {
    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: LocalizationOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a different geodesic implementation.
    #[must_use]
    pub fn with_geodesic<H: GeodesicDistance>(self, geodesic: H) -> LocalizationEngine<H> {
        LocalizationEngine {
            options: self.options,
            geodesic,
        }
    }

    #[must_use]
    pub fn options(&self) -> &LocalizationOptions {
        &self.options
    }

    /// Select the detection closest to the metadata's reference point.
    ///
    /// Ties on distance go to the box that comes first in `boxes`.
    ///
    /// # Errors
    /// - [`LocateError::EmptyDetection`] if `boxes` is empty.
    /// - [`LocateError::DegenerateBoundingBox`] from the coordinate transforms.
    pub fn localize(
        &self,
        boxes: &[BoundingBox],
        metadata: &ImageMetadata,
        size: ImageSize,
    ) -> LocateResult<LocalizationResult> {
        if boxes.is_empty() {
            return Err(LocateError::EmptyDetection);
        }

        let records = compute_distances_with(metadata, boxes, size, &self.geodesic)?;

        // min_by keeps the first of equal elements
        let (best_index, best) = records
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.distance_m.total_cmp(&b.distance_m))
            .ok_or(LocateError::EmptyDetection)?;

        let reference_pixel = resolve_reference_pixel(metadata, size)?;
        let flagged = is_flagged(best.distance_m, self.options.flag_threshold);

        debug!(
            mode = metadata.mode_name(),
            candidates = records.len(),
            best_index,
            distance_m = best.distance_m,
            flagged,
            "Localized closest detection"
        );

        Ok(LocalizationResult {
            best_distance_m: best.distance_m,
            flagged,
            best_bbox: best.bbox,
            best_index,
            predicted: best.predicted,
            reference_pixel,
        })
    }
}

/// Convenience wrapper: localize with the WGS84 geodesic and the given threshold.
///
/// # Errors
/// Same as [`LocalizationEngine::localize`].
pub fn localize(
    boxes: &[BoundingBox],
    metadata: &ImageMetadata,
    size: ImageSize,
    flag_threshold: f64,
) -> LocateResult<LocalizationResult> {
    LocalizationEngine::new()
        .with_options(LocalizationOptions::default().with_flag_threshold(flag_threshold))
        .localize(boxes, metadata, size)
}
