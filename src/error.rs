//! Error type shared by every geoverify operation.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type LocateResult<T> = Result<T, LocateError>;

/// Errors raised while transforming coordinates, localizing detections or
/// aggregating a batch.
///
/// Everything except a missing metadata sidecar is fatal to the caller; the
/// batch aggregator only recovers from [`MetadataStore`](crate::source::MetadataStore)
/// returning `None`.
#[derive(Debug, Error)]
pub enum LocateError {
    /// A pixel box, geographic box or image size has zero (or non-finite) extent.
    #[error("degenerate bounding box: {0}")]
    DegenerateBoundingBox(String),

    /// Metadata is missing a field its acquisition mode requires, or holds an
    /// out-of-range value.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Localization was asked to choose among zero detections.
    #[error("no detections to localize")]
    EmptyDetection,

    /// A metadata sidecar exists but is not valid JSON.
    #[error("failed to parse metadata {}: {source}", path.display())]
    MetadataParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An image file could not be decoded.
    #[error("failed to decode image {}: {source}", path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The object detector reported a failure.
    #[error("detector failed: {0}")]
    Detection(String),

    /// Filesystem error while enumerating or reading a dataset.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configured dataset directory does not exist.
    #[error("dataset directory does not exist: {}", .0.display())]
    DatasetNotFound(PathBuf),
}

impl LocateError {
    pub(crate) fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateBoundingBox(msg.into())
    }

    pub(crate) fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = LocateError::degenerate("geo box has zero width");
        assert_eq!(err.to_string(), "degenerate bounding box: geo box has zero width");

        let err = LocateError::invalid_metadata("tile mode requires zoom");
        assert_eq!(err.to_string(), "invalid metadata: tile mode requires zoom");

        assert_eq!(LocateError::EmptyDetection.to_string(), "no detections to localize");

        let err = LocateError::DatasetNotFound(PathBuf::from("/data/wms"));
        assert_eq!(err.to_string(), "dataset directory does not exist: /data/wms");
    }

    #[test]
    fn test_parse_error_keeps_source() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = LocateError::MetadataParse {
            path: PathBuf::from("a.json"),
            source,
        };
        assert!(err.to_string().starts_with("failed to parse metadata a.json"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
