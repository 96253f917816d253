//! Product cache.
//!
//! A single in-process cache region (`PRODUCT`) sits in front of the
//! persistent store. [`CacheAside`] is the only component that touches both,
//! and it offers three access policies:
//!
//! - **write-through**: [`CacheAside::save`] writes the store, then the cache;
//! - **read-through**: [`CacheAside::fetch_cached`] fills the cache on a miss;
//! - **read-only**: [`CacheAside::fetch_read_only`] consults the cache but
//!   never fills it.
//!
//! [`CacheAside::invalidate`] removes a product from both sides and leaves a
//! retired snapshot behind.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! region = "PRODUCT"
//! ```

mod aside;
mod keys;
mod lock;
mod region;

pub use aside::{
    CacheAside, CacheAsideError, METRIC_CACHE_EVICT_TOTAL, METRIC_CACHE_HIT_TOTAL,
    METRIC_CACHE_MISS_TOTAL, METRIC_CACHE_POPULATE_FAILED_TOTAL, METRIC_CACHE_POPULATE_TOTAL,
    ReadPolicy,
};
pub use keys::{PRODUCT_KEY_NAMESPACE, PRODUCT_REGION, ProductCacheKey};
pub use region::{CacheRegion, CacheRegionError, InMemoryRegion};
