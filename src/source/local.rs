//! Local filesystem image source.
//!
//! Scans a dataset directory for image files.

use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{LocateError, LocateResult};

use super::{ImageEntry, ImageSource};

/// Options for scanning dataset directories.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Minimum directory depth to scan (1 = files directly under the root)
    pub min_depth: usize,
    /// Maximum directory depth to scan (None = unlimited)
    pub max_depth: Option<usize>,
    /// File extensions to consider as images (case-insensitive)
    pub extensions: Vec<String>,
    /// Whether to follow symbolic links
    pub follow_links: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            min_depth: 1,
            max_depth: Some(1),
            extensions: vec!["png".to_string()],
            follow_links: false,
        }
    }
}

impl ScanOptions {
    /// Scan every subdirectory, not just the dataset root
    #[must_use]
    pub fn recursive() -> Self {
        Self {
            max_depth: None,
            ..Default::default()
        }
    }

    /// Set maximum depth
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Replace the accepted extensions
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .is_some_and(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
    }
}

/// Image source backed by a directory.
///
/// Entries are sorted by file name within each directory, so repeated scans of
/// the same tree enumerate images in the same order.
#[derive(Debug, Clone)]
pub struct LocalImageSource {
    entries: Vec<ImageEntry>,
}

impl LocalImageSource {
    /// Scan a directory for images.
    ///
    /// # Errors
    /// Returns [`LocateError::DatasetNotFound`] if `root` does not exist and
    /// [`LocateError::Io`] if part of the tree cannot be read.
    pub fn scan<P: AsRef<Path>>(root: P, options: &ScanOptions) -> LocateResult<Self> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(LocateError::DatasetNotFound(root.to_path_buf()));
        }

        let mut walker = WalkDir::new(root)
            .min_depth(options.min_depth)
            .follow_links(options.follow_links)
            .sort_by_file_name();

        if let Some(max) = options.max_depth {
            walker = walker.max_depth(max);
        }

        let mut entries = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| LocateError::Io {
                path: e.path().unwrap_or(root).to_path_buf(),
                source: e.into(),
            })?;
            let path = entry.path();

            if !entry.file_type().is_file() || !options.accepts(path) {
                continue;
            }

            let mut image = ImageEntry::new(path);
            image.size_bytes = entry.metadata().ok().map(|m| m.len());
            debug!(path = %path.display(), "Discovered image");
            entries.push(image);
        }

        Ok(Self { entries })
    }

    /// Wrap an already known list of images.
    #[must_use]
    pub fn from_entries(entries: Vec<ImageEntry>) -> Self {
        Self { entries }
    }
}

impl ImageSource for LocalImageSource {
    fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }
}
