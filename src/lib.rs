#![doc = include_str!("../README.md")]
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`geometry`]: Coordinate types ([`GeoPoint`], [`BoundingBox`], [`GeoBox`]) and the
//!   geo-box / Web Mercator pixel transforms
//! - [`metadata`]: Per-image acquisition metadata ([`ImageMetadata`]) and its JSON record form
//! - [`distance`]: Ground distances between detections and the reference point
//! - [`localization`]: Closest-detection selection via [`LocalizationEngine`]
//! - [`source`]: Image enumeration, detector and metadata capabilities
//! - [`batch`]: Per-acquisition-type distance statistics over whole datasets
//! - [`casting`]: Checked float to pixel conversions
//! - [`error`]: Crate error type

// ============================================================================
// Public modules
// ============================================================================

pub mod batch;
pub mod casting;
pub mod distance;
pub mod error;
pub mod geometry;
pub mod localization;
pub mod metadata;
pub mod source;

// ============================================================================
// Errors
// ============================================================================

pub use error::{LocateError, LocateResult};

// ============================================================================
// Geometry & Projections
// ============================================================================

pub use geometry::{
    BoundingBox,
    GeoBox,
    GeoPoint,
    ImageSize,
    PixelPoint,
};
pub use geometry::projection::{
    geo_to_pixel_box,
    geo_to_tile_index,
    geo_to_tile_pixel,
    map_size,
    pixel_to_geo_box,
    resolve_reference_pixel,
    tile_pixel_to_geo,
};

// ============================================================================
// Metadata
// ============================================================================

pub use metadata::{
    AcquisitionType,
    ImageMetadata,
    MetadataRecord,
};

// ============================================================================
// Distances & Localization
// ============================================================================
// Primary API: LocalizationEngine::new().localize(&boxes, &metadata, size)

pub use distance::{
    compute_distances,
    compute_distances_with,
    pixel_to_ground,
    DistanceRecord,
    GeodesicDistance,
    Wgs84Geodesic,
};
pub use localization::{
    is_flagged,
    localize,
    LocalizationEngine,
    LocalizationOptions,
    LocalizationResult,
    DEFAULT_FLAG_THRESHOLD,
};

// ============================================================================
// Sources
// ============================================================================

pub use source::{
    ImageEntry,
    ImageSource,
    JsonSidecarStore,
    LocalImageSource,
    MemoryMetadataStore,
    MetadataStore,
    ObjectDetector,
    ScanOptions,
};

// ============================================================================
// Batch Statistics
// ============================================================================
// Primary API: BatchStatisticsAggregator::new(detector, store).run(&datasets)

pub use batch::{
    BatchStatistics,
    BatchStatisticsAggregator,
    DatasetSpec,
    DistanceSummary,
    MAX_HISTOGRAM_BINS,
};
