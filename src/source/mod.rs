//! Input resolution and output caching

pub mod cache;
pub mod resolver;

pub use cache::{CachedDocument, DocumentCache};
pub use resolver::{
    resolve_base64, resolve_cache, resolve_path, resolve_url, AssetKind, ResolvedAsset,
};
