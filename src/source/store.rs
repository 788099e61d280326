//! [`MetadataStore`] implementations.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{LocateError, LocateResult};
use crate::metadata::{ImageMetadata, MetadataRecord};

use super::MetadataStore;

/// Reads `<image stem>.json` next to each image.
///
/// A missing sidecar is reported as `Ok(None)`. A sidecar that exists but
/// cannot be read, parsed or validated is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSidecarStore;

impl JsonSidecarStore {
    /// Path of the sidecar for `image`.
    #[must_use]
    pub fn sidecar_path(image: &Path) -> PathBuf {
        image.with_extension("json")
    }
}

impl MetadataStore for JsonSidecarStore {
    fn load(&self, image: &Path) -> LocateResult<Option<ImageMetadata>> {
        let path = Self::sidecar_path(image);

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(LocateError::Io { path, source }),
        };

        let record: MetadataRecord =
            serde_json::from_str(&text).map_err(|source| LocateError::MetadataParse { path, source })?;

        ImageMetadata::try_from(record).map(Some)
    }
}

/// Metadata held in memory, keyed by image path.
#[derive(Debug, Clone, Default)]
pub struct MemoryMetadataStore {
    entries: HashMap<PathBuf, ImageMetadata>,
}

impl MemoryMetadataStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register metadata for an image, replacing any previous value.
    ///
    /// # Errors
    /// Returns [`LocateError::InvalidMetadata`] if `metadata` fails
    /// [`ImageMetadata::validate`]; nothing is stored in that case.
    pub fn insert(&mut self, image: impl Into<PathBuf>, metadata: ImageMetadata) -> LocateResult<()> {
        metadata.validate()?;
        self.entries.insert(image.into(), metadata);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn load(&self, image: &Path) -> LocateResult<Option<ImageMetadata>> {
        Ok(self.entries.get(image).copied())
    }
}
