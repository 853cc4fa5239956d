//! Two-tier cache of per-resource graphs.
//!
//! The hot tier is a bounded LRU of recently used graphs; the durable tier is
//! the full set of entries, mirrored to one JSON document on disk.

mod graph_cache;
mod store;

pub use graph_cache::{CacheOptions, CacheStats, GraphCache};
pub use store::CacheEntry;

use serde::Deserialize;

/// When the durable document is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    /// Inside every `put`, under the cache lock.
    WriteThrough,
    /// Once per top-level crawl request, if anything changed.
    #[default]
    AfterRequest,
    /// From a background task on a fixed period.
    Interval,
}
