use crate::image::{FileImage, Image, MemoryImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Opens paths as [`Image`]s.
///
/// The disc never touches the filesystem directly. Descriptors, data files and
/// split volumes are all opened through this trait.
pub trait Filters: Send + Sync {
    /// Opens `path`, or returns `None` when it cannot be opened.
    fn open(&self, path: &Path) -> Option<Arc<dyn Image>>;
}

/// [`Filters`] that opens plain files.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsFilters;

impl Filters for FsFilters {
    fn open(&self, path: &Path) -> Option<Arc<dyn Image>> {
        match FileImage::open(path) {
            Ok(v) => Some(Arc::new(v)),
            Err(e) => {
                log::trace!("Cannot open {}: {e}", path.display());
                None
            }
        }
    }
}

/// [`Filters`] serving in-memory files keyed by path.
#[derive(Debug, Default, Clone)]
pub struct MemoryFilters {
    files: HashMap<PathBuf, Arc<MemoryImage>>,
}

impl MemoryFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the file at `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
        self.files
            .insert(path.into(), Arc::new(MemoryImage::new(data)));
    }
}

impl Filters for MemoryFilters {
    fn open(&self, path: &Path) -> Option<Arc<dyn Image>> {
        self.files
            .get(path)
            .map(|image| image.clone() as Arc<dyn Image>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_filters_match_exact_paths() {
        let mut filters = MemoryFilters::new();
        filters.insert("/img/disc.b5i", vec![1, 2, 3]);

        assert_eq!(filters.open(Path::new("/img/disc.b5i")).unwrap().len(), 3);
        assert!(filters.open(Path::new("/img/DISC.B5I")).is_none());
    }

    #[test]
    fn fs_filters_missing_file_is_none() {
        let dir = std::env::temp_dir().join("blindwrite-image-no-such-dir");
        assert!(FsFilters.open(&dir.join("missing.b5i")).is_none());
    }
}
