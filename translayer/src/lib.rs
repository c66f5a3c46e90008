//! Translayer - translation resolution and background loading for games
//!
//! Translayer merges community translation packs (loose `.txt` and `.csv`
//! files, optionally inside `.zip` archives) into an immutable snapshot on
//! a background thread, then answers lookups through a multi-stage fallback
//! chain (exact, namespace-stripped, normalized, regex templates) without
//! ever blocking the host.
//!
//! The pieces compose like this:
//!
//! ```text
//! directory ──► AsyncLoader ──► LoadResult ──► Resolver::install (atomic swap)
//!   (.txt/.csv/.zip)                               │
//!                              host text ──► Resolver::resolve ──► substitute
//!                                                  │ miss
//!                                                  └──► UntranslatedSink (.csv)
//! ```
//!
//! [`service::TranslationService`] wires one domain end to end;
//! [`cache::TextureCache`] covers the sibling concern of replacement
//! images. Most hosts want one service per text domain and nothing else.

pub mod cache;
pub mod config;
pub mod export;
pub mod loader;
pub mod logging;
pub mod resolve;
pub mod service;
pub mod text;

pub use cache::{LruCache, TextureCache};
pub use config::{ConfigFile, ConfigKey};
pub use export::UntranslatedSink;
pub use loader::{ArchiveOrder, AsyncLoader, LoadResult, ProcessorSet, RegexRule};
pub use resolve::Resolver;
pub use service::{ServiceConfig, TranslationService};
