//! Dataset-level distance statistics.
//!
//! [`BatchStatisticsAggregator`] localizes every image of every configured
//! dataset and collects the best distances per acquisition-type label.
//!
//! Images without metadata are logged and skipped. Anything else that goes
//! wrong with an image (undecodable file, empty detections, degenerate boxes,
//! invalid metadata) aborts the run, since it points at broken upstream data.
//!
//! # Example
//!
//! ```rust,no_run
//! use geoverify::{BatchStatisticsAggregator, BoundingBox, DatasetSpec, LocateResult};
//! use geoverify::source::JsonSidecarStore;
//! use image::DynamicImage;
//!
//! fn detect(_image: &DynamicImage) -> LocateResult<Vec<BoundingBox>> {
//!     Ok(vec![BoundingBox::new(240.0, 240.0, 260.0, 260.0)?])
//! }
//!
//! fn main() -> LocateResult<()> {
//!     let aggregator = BatchStatisticsAggregator::new(detect, JsonSidecarStore);
//!     let stats = aggregator.run(&[
//!         DatasetSpec::new("data/static", "static"),
//!         DatasetSpec::new("data/wms", "wms"),
//!     ])?;
//!
//!     for label in stats.labels() {
//!         if let Some(summary) = stats.summary(label) {
//!             println!("{label}: {} images, median {:.2} m", summary.count, summary.median);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::LocateResult;
use crate::geometry::ImageSize;
use crate::localization::{is_flagged, LocalizationEngine, LocalizationResult};
use crate::source::{ImageEntry, ImageSource, LocalImageSource, MetadataStore, ObjectDetector, ScanOptions};

/// One dataset directory and the acquisition-type label its distances are
/// recorded under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub path: PathBuf,
    pub acquisition_type: String,
}

impl DatasetSpec {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, acquisition_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            acquisition_type: acquisition_type.into(),
        }
    }
}

/// Upper bound on the number of one-metre histogram bins.
pub const MAX_HISTOGRAM_BINS: usize = 1000;

/// Min / max / mean / median of one label's distances, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl DistanceSummary {
    /// Summary of the finite values in `distances`; `None` if there are none.
    #[must_use]
    pub fn from_distances(distances: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = distances.iter().copied().filter(|d| d.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mid = count / 2;
        let median = if count % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };
        // Allow cast precision loss: image counts are far below 2^52
        #[allow(clippy::cast_precision_loss)]
        let mean = sorted.iter().sum::<f64>() / count as f64;

        Some(Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean,
            median,
        })
    }
}

/// Best distances per acquisition-type label, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchStatistics {
    distances: BTreeMap<String, Vec<f64>>,
}

impl BatchStatistics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one distance under `label`.
    pub fn insert(&mut self, label: impl Into<String>, distance_m: f64) {
        self.distances.entry(label.into()).or_default().push(distance_m);
    }

    /// Append a sequence of distances under `label`, creating the label even
    /// when `distances` is empty.
    pub fn extend<I: IntoIterator<Item = f64>>(&mut self, label: impl Into<String>, distances: I) {
        self.distances.entry(label.into()).or_default().extend(distances);
    }

    /// Distances recorded for `label`.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&[f64]> {
        self.distances.get(label).map(Vec::as_slice)
    }

    /// Labels in sorted order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.distances.keys().map(String::as_str)
    }

    /// Iterate over `(label, distances)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.distances.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    #[must_use]
    pub fn summary(&self, label: &str) -> Option<DistanceSummary> {
        self.get(label).and_then(DistanceSummary::from_distances)
    }

    /// How many of `label`'s distances are at or above `threshold`.
    #[must_use]
    pub fn flagged_count(&self, label: &str, threshold: f64) -> usize {
        self.get(label)
            .map_or(0, |d| d.iter().filter(|&&v| is_flagged(v, threshold)).count())
    }

    /// Largest finite distance across every label.
    #[must_use]
    pub fn max_distance(&self) -> Option<f64> {
        self.distances
            .values()
            .flatten()
            .copied()
            .filter(|d| d.is_finite())
            .max_by(f64::total_cmp)
    }

    /// Counts of `label`'s distances in one-metre bins `[0, 1), [1, 2), …`.
    ///
    /// Every label shares the same bins, running up to the ceiling of
    /// [`max_distance`](Self::max_distance). See
    /// [`histogram_up_to`](Self::histogram_up_to) for how the range is bounded.
    #[must_use]
    pub fn histogram(&self, label: &str) -> Option<Vec<usize>> {
        self.histogram_up_to(label, self.max_distance().unwrap_or(0.0))
    }

    /// Counts of `label`'s distances in one-metre bins from 0 to `upper_m`.
    ///
    /// At most [`MAX_HISTOGRAM_BINS`] bins are produced. The last bin is
    /// closed on the right and also collects every distance beyond the range.
    /// Non-finite distances are not counted.
    #[must_use]
    pub fn histogram_up_to(&self, label: &str, upper_m: f64) -> Option<Vec<usize>> {
        let distances = self.get(label)?;

        let upper = if upper_m.is_finite() { upper_m.ceil() } else { 1.0 };
        // Clamped into [1, MAX_HISTOGRAM_BINS] before the cast
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let bins = upper.clamp(1.0, MAX_HISTOGRAM_BINS as f64) as usize;

        let mut counts = vec![0; bins];
        for &d in distances.iter().filter(|d| d.is_finite()) {
            // Float to int casts saturate, so huge distances land in the last bin
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let idx = (d.max(0.0).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }
        Some(counts)
    }
}

/// Localizes every image of a set of datasets.
pub struct BatchStatisticsAggregator<D, S> {
    detector: D,
    store: S,
    engine: LocalizationEngine,
    scan_options: ScanOptions,
}

impl<D: ObjectDetector, S: MetadataStore> BatchStatisticsAggregator<D, S> {
    pub fn new(detector: D, store: S) -> Self {
        Self {
            detector,
            store,
            engine: LocalizationEngine::new(),
            scan_options: ScanOptions::default(),
        }
    }

    /// Use a configured localization engine.
    #[must_use]
    pub fn with_engine(mut self, engine: LocalizationEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Change how dataset directories are scanned.
    #[must_use]
    pub fn with_scan_options(mut self, options: ScanOptions) -> Self {
        self.scan_options = options;
        self
    }

    /// Localize every image in every dataset.
    ///
    /// A label used by more than one dataset accumulates all of their
    /// distances, in dataset order.
    ///
    /// # Errors
    /// Any failure other than missing metadata, including
    /// [`LocateError::DatasetNotFound`](crate::LocateError::DatasetNotFound)
    /// for a missing directory.
    pub fn run(&self, datasets: &[DatasetSpec]) -> LocateResult<BatchStatistics> {
        let mut stats = BatchStatistics::new();

        for dataset in datasets {
            let source = LocalImageSource::scan(&dataset.path, &self.scan_options)?;
            let distances = self.process_source(&source)?;

            info!(
                path = %dataset.path.display(),
                acquisition_type = %dataset.acquisition_type,
                images = source.len(),
                localized = distances.len(),
                "Processed dataset"
            );
            stats.extend(dataset.acquisition_type.clone(), distances);
        }

        Ok(stats)
    }

    /// Best distances for every image of `source` that has metadata, in
    /// enumeration order.
    ///
    /// # Errors
    /// The first per-image failure other than missing metadata.
    pub fn process_source<I: ImageSource + ?Sized>(&self, source: &I) -> LocateResult<Vec<f64>> {
        let results = source
            .entries()
            .par_iter()
            .map(|entry| self.localize_entry(entry))
            .collect::<LocateResult<Vec<_>>>()?;

        Ok(results
            .into_iter()
            .flatten()
            .map(|r| r.best_distance_m)
            .collect())
    }

    /// Localize one image. `Ok(None)` means it has no metadata.
    ///
    /// # Errors
    /// Metadata, decoding, detection and localization failures.
    pub fn localize_entry(&self, entry: &ImageEntry) -> LocateResult<Option<LocalizationResult>> {
        let Some(metadata) = self.store.load(&entry.path)? else {
            warn!(path = %entry.path.display(), "No metadata found for image, skipping");
            return Ok(None);
        };

        let image = entry.open()?;
        let size = ImageSize::new(image.width(), image.height());
        let boxes = self.detector.detect(&image)?;

        let result = self.engine.localize(&boxes, &metadata, size)?;
        debug!(
            path = %entry.path.display(),
            distance_m = result.best_distance_m,
            flagged = result.flagged,
            "Localized image"
        );
        Ok(Some(result))
    }
}
