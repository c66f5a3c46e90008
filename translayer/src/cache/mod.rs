//! Caching for expensive derived artifacts.
//!
//! [`LruCache`] is the bounded building block; [`TextureCache`] specializes
//! it for decoded replacement images keyed by sprite name. Neither is
//! internally synchronized; share them behind a mutex.

mod lru;
mod texture;

pub use lru::LruCache;
pub use texture::{DecodedImage, TextureCache};
