//! Replacement image cache keyed by sprite name.
//!
//! Hosts swap UI sprites by name: the engine scans a directory of `.png`
//! files once, remembers name → path, and decodes a file only when a sprite
//! is actually requested. Decoded RGBA buffers are large and repeat
//! requests are common, so decoded results live in an [`LruCache`] with a
//! configurable entry capacity.
//!
//! Like [`LruCache`] itself, this type is not internally synchronized.
//! Call sites that touch it from more than one thread must wrap it in a
//! mutex; the engine does not hide that cost.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::cache::LruCache;

/// A decoded replacement image: straight RGBA8, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Name-indexed cache of decoded replacement images.
///
/// `scan` builds the name → path index up front (cheap); `get` decodes
/// lazily on first use and serves repeats from the LRU. Values are handed
/// out as `Arc` so an image evicted mid-use stays alive for its holders
/// and is freed when the last clone drops.
pub struct TextureCache {
    index: HashMap<String, PathBuf>,
    decoded: LruCache<String, Arc<DecodedImage>>,
}

impl TextureCache {
    /// Create a cache that keeps at most `capacity` decoded images.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero (see [`LruCache::new`]).
    pub fn new(capacity: usize) -> Self {
        Self {
            index: HashMap::new(),
            decoded: LruCache::new(capacity),
        }
    }

    /// Scan `root` for `.png` files and rebuild the name → path index.
    ///
    /// The directory is created if missing, matching the loader's posture
    /// towards translation roots. Files discovered later win on name
    /// collisions, mirroring the override rule for text sources. Returns
    /// the number of indexed files.
    pub fn scan(&mut self, root: &Path) -> usize {
        let started = Instant::now();

        if !root.exists() {
            info!(root = %root.display(), "replacement image directory not found, creating");
            if let Err(e) = fs::create_dir_all(root) {
                error!(root = %root.display(), error = %e, "failed to create image directory");
                return 0;
            }
        }

        self.index.clear();
        for entry in WalkDir::new(root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "error while scanning image directory");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let is_png = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
            if !is_png {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                self.index
                    .insert(stem.to_string_lossy().into_owned(), path.to_path_buf());
            }
        }

        info!(
            count = self.index.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "image scan complete"
        );
        self.index.len()
    }

    /// True if a replacement image exists for `name`.
    pub fn is_available(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Fetch the decoded image for `name`, decoding it on first use.
    ///
    /// Returns `None` when no file is indexed under `name` or the file
    /// fails to read or decode; failures are logged, never raised.
    pub fn get(&mut self, name: &str) -> Option<Arc<DecodedImage>> {
        if let Some(image) = self.decoded.get(&name.to_string()) {
            return Some(Arc::clone(image));
        }

        let path = self.index.get(name)?.clone();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(name, path = %path.display(), error = %e, "failed to read image");
                return None;
            }
        };
        let image = match image::load_from_memory(&bytes) {
            Ok(image) => image.to_rgba8(),
            Err(e) => {
                error!(name, path = %path.display(), error = %e, "failed to decode image");
                return None;
            }
        };
        debug!(name, path = %path.display(), "decoded replacement image");

        let decoded = Arc::new(DecodedImage {
            width: image.width(),
            height: image.height(),
            rgba: image.into_raw(),
        });
        // The evicted Arc drops here; its buffer is freed once no caller
        // still holds a clone.
        self.decoded.set(name.to_string(), Arc::clone(&decoded));
        Some(decoded)
    }

    /// Number of files in the name index (not the number decoded).
    pub fn indexed_len(&self) -> usize {
        self.index.len()
    }

    /// Number of images currently decoded and cached.
    pub fn decoded_len(&self) -> usize {
        self.decoded.len()
    }

    /// Drop all decoded images and the name index.
    pub fn clear(&mut self) {
        self.index.clear();
        self.decoded.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use image::{ImageBuffer, Rgba};
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str, w: u32, h: u32) {
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(w, h, Rgba([255, 0, 0, 255]));
        img.save(dir.join(name)).expect("write png");
    }

    #[test]
    fn test_scan_indexes_png_files() {
        let dir = TempDir::new().unwrap();
        write_png(dir.path(), "button_ok.png", 2, 2);
        write_png(dir.path(), "button_cancel.PNG", 2, 2);
        fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let mut cache = TextureCache::new(4);
        assert_eq!(cache.scan(dir.path()), 2);
        assert!(cache.is_available("button_ok"));
        assert!(cache.is_available("button_cancel"));
        assert!(!cache.is_available("notes"));
    }

    #[test]
    fn test_scan_recurses_into_subdirectories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("pack")).unwrap();
        write_png(&dir.path().join("pack"), "icon.png", 2, 2);

        let mut cache = TextureCache::new(4);
        assert_eq!(cache.scan(dir.path()), 1);
        assert!(cache.is_available("icon"));
    }

    #[test]
    fn test_scan_creates_missing_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("missing");
        let mut cache = TextureCache::new(4);
        assert_eq!(cache.scan(&root), 0);
        assert!(root.is_dir());
    }

    #[test]
    fn test_get_decodes_and_caches() {
        let dir = TempDir::new().unwrap();
        write_png(dir.path(), "sprite.png", 3, 2);

        let mut cache = TextureCache::new(4);
        cache.scan(dir.path());

        let first = cache.get("sprite").expect("decoded");
        assert_eq!((first.width, first.height), (3, 2));
        assert_eq!(first.rgba.len(), 3 * 2 * 4);
        assert_eq!(cache.decoded_len(), 1);

        // Second fetch is served from cache: same allocation.
        let second = cache.get("sprite").expect("cached");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_get_unknown_name() {
        let dir = TempDir::new().unwrap();
        let mut cache = TextureCache::new(4);
        cache.scan(dir.path());
        assert!(cache.get("nope").is_none());
    }

    #[test]
    fn test_get_corrupt_file_is_none() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.png"), b"not a png").unwrap();

        let mut cache = TextureCache::new(4);
        cache.scan(dir.path());
        assert!(cache.is_available("broken"));
        assert!(cache.get("broken").is_none());
    }

    #[test]
    fn test_decoded_evicts_at_capacity() {
        let dir = TempDir::new().unwrap();
        write_png(dir.path(), "a.png", 1, 1);
        write_png(dir.path(), "b.png", 1, 1);
        write_png(dir.path(), "c.png", 1, 1);

        let mut cache = TextureCache::new(2);
        cache.scan(dir.path());
        cache.get("a");
        cache.get("b");
        cache.get("c");
        assert_eq!(cache.decoded_len(), 2);
        // "a" was least recently used; it is decoded again on demand.
        assert!(cache.get("a").is_some());
    }
}
