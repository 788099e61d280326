//! Capabilities the batch aggregator consumes from the outside world.
//!
//! - [`ImageSource`]: enumerates the images of one dataset.
//! - [`ObjectDetector`]: turns decoded pixels into bounding boxes.
//! - [`MetadataStore`]: resolves an image to its [`ImageMetadata`], or reports
//!   that none exists.
//!
//! Local implementations are provided for directory datasets
//! ([`LocalImageSource`]) and JSON sidecar metadata ([`JsonSidecarStore`]).
//! Detection models are always supplied by the caller.
//!
//! # Example
//!
//! ```rust,no_run
//! use geoverify::source::{ImageSource, JsonSidecarStore, LocalImageSource, MetadataStore, ScanOptions};
//!
//! fn main() -> geoverify::LocateResult<()> {
//!     let source = LocalImageSource::scan("data/wms", &ScanOptions::default())?;
//!     let store = JsonSidecarStore;
//!
//!     for entry in source.entries() {
//!         match store.load(&entry.path)? {
//!             Some(metadata) => println!("{}: {}", entry.name, metadata.mode_name()),
//!             None => println!("{}: no metadata", entry.name),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod local;
pub mod store;

pub use local::{LocalImageSource, ScanOptions};
pub use store::{JsonSidecarStore, MemoryMetadataStore};

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::error::{LocateError, LocateResult};
use crate::geometry::BoundingBox;
use crate::metadata::ImageMetadata;

/// An image discovered in a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    /// Identifier derived from the file stem.
    pub name: String,
    /// Location of the image file.
    pub path: PathBuf,
    /// File size in bytes (if known)
    pub size_bytes: Option<u64>,
}

impl ImageEntry {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();
        Self {
            name,
            path,
            size_bytes: None,
        }
    }

    /// Decode the image.
    ///
    /// # Errors
    /// Returns [`LocateError::ImageDecode`] if the file cannot be read or decoded.
    pub fn open(&self) -> LocateResult<DynamicImage> {
        image::open(&self.path).map_err(|source| LocateError::ImageDecode {
            path: self.path.clone(),
            source,
        })
    }
}

/// Enumerates the images of one dataset, in a stable order.
pub trait ImageSource: Send + Sync {
    /// All discovered images.
    fn entries(&self) -> &[ImageEntry];

    /// Number of discovered images.
    fn len(&self) -> usize {
        self.entries().len()
    }

    /// Check if no images were discovered.
    fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Find an image by name.
    fn get(&self, name: &str) -> Option<&ImageEntry> {
        self.entries().iter().find(|e| e.name == name)
    }
}

/// Detects objects in decoded imagery.
pub trait ObjectDetector: Send + Sync {
    /// Bounding boxes in the image's pixel space.
    ///
    /// # Errors
    /// Implementations report model failures as [`LocateError::Detection`].
    fn detect(&self, image: &DynamicImage) -> LocateResult<Vec<BoundingBox>>;
}

impl<F> ObjectDetector for F
where
    F: Fn(&DynamicImage) -> LocateResult<Vec<BoundingBox>> + Send + Sync,
{
    fn detect(&self, image: &DynamicImage) -> LocateResult<Vec<BoundingBox>> {
        self(image)
    }
}

/// Resolves the acquisition metadata of an image.
pub trait MetadataStore: Send + Sync {
    /// `Ok(None)` means the image has no metadata; errors mean it exists but
    /// cannot be used.
    ///
    /// # Errors
    /// Implementation-specific read, parse and validation failures.
    fn load(&self, image: &Path) -> LocateResult<Option<ImageMetadata>>;
}
