//! Cache-aside coordination between the product store and the cache region.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::application::repos::{BackupsRepo, ProductsRepo, RepoError};
use crate::domain::entities::{ProductRecord, RetiredProductRecord};

use super::keys::ProductCacheKey;
use super::lock::KeyLocks;
use super::region::{CacheRegion, CacheRegionError};

const SOURCE: &str = "cache::aside";

pub const METRIC_CACHE_HIT_TOTAL: &str = "product_cache_hit_total";
pub const METRIC_CACHE_MISS_TOTAL: &str = "product_cache_miss_total";
pub const METRIC_CACHE_POPULATE_TOTAL: &str = "product_cache_populate_total";
pub const METRIC_CACHE_POPULATE_FAILED_TOTAL: &str = "product_cache_populate_failed_total";
pub const METRIC_CACHE_EVICT_TOTAL: &str = "product_cache_evict_total";

const POLICY_WRITE_THROUGH: &str = "write_through";

#[derive(Debug, Error)]
pub enum CacheAsideError {
    #[error("persistent store unavailable: {0}")]
    StoreUnavailable(#[from] RepoError),
    #[error("cache invalidation failed: {0}")]
    CacheInvalidation(#[source] CacheRegionError),
}

/// How a lookup treats the cache on a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Store hits are written back into the cache.
    Populate,
    /// Store hits are returned as-is; the cache is only consulted.
    ReadOnly,
}

impl ReadPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadPolicy::Populate => "cached",
            ReadPolicy::ReadOnly => "read_only",
        }
    }
}

/// Presents the store and the cache region as one logical product store.
///
/// Writers to the same key (`save`, the populating branch of `fetch_cached`
/// and `invalidate`) are serialized per derived key, so a delete that returns
/// successfully cannot be undone by a lookup that read the store before it.
/// Concurrent saves of one key are last-write-wins.
pub struct CacheAside {
    store: Arc<dyn ProductsRepo>,
    region: Arc<dyn CacheRegion<ProductRecord>>,
    backups: Arc<dyn BackupsRepo>,
    locks: KeyLocks,
}

impl CacheAside {
    pub fn new(
        store: Arc<dyn ProductsRepo>,
        region: Arc<dyn CacheRegion<ProductRecord>>,
        backups: Arc<dyn BackupsRepo>,
    ) -> Self {
        Self {
            store,
            region,
            backups,
            locks: KeyLocks::new(),
        }
    }

    pub fn region_name(&self) -> &str {
        self.region.name()
    }

    /// Write `product` to the store, then unconditionally to the cache.
    ///
    /// A store failure returns before the cache is touched. A cache failure is
    /// logged and the stored value is still returned.
    pub async fn save(&self, product: &ProductRecord) -> Result<ProductRecord, CacheAsideError> {
        let key = ProductCacheKey::for_city(&product.city);
        let _guard = self.locks.acquire(key.as_str()).await;

        info!(city = %product.city, "Saving product into store");
        let stored = self.store.upsert_product(product).await?;
        self.populate(&key, &stored, POLICY_WRITE_THROUGH);
        Ok(stored)
    }

    /// Read-through lookup that fills the cache on a store hit.
    pub async fn fetch_cached(
        &self,
        city: &str,
    ) -> Result<Option<ProductRecord>, CacheAsideError> {
        self.read_through(city, ReadPolicy::Populate).await
    }

    /// Read-through lookup that never fills the cache.
    ///
    /// An entry cached by an earlier save or populating lookup is still served
    /// without a store round trip.
    pub async fn fetch_read_only(
        &self,
        city: &str,
    ) -> Result<Option<ProductRecord>, CacheAsideError> {
        self.read_through(city, ReadPolicy::ReadOnly).await
    }

    pub async fn read_through(
        &self,
        city: &str,
        policy: ReadPolicy,
    ) -> Result<Option<ProductRecord>, CacheAsideError> {
        let key = ProductCacheKey::for_city(city);
        if let Some(hit) = self.lookup(&key, "lookup") {
            counter!(METRIC_CACHE_HIT_TOTAL, "policy" => policy.as_str()).increment(1);
            return Ok(Some(hit));
        }
        counter!(METRIC_CACHE_MISS_TOTAL, "policy" => policy.as_str()).increment(1);

        match policy {
            ReadPolicy::ReadOnly => {
                debug!(city, policy = policy.as_str(), "Looking into store for product");
                Ok(self.store.find_product(city).await?)
            }
            ReadPolicy::Populate => self.load_and_populate(city, &key).await,
        }
    }

    async fn load_and_populate(
        &self,
        city: &str,
        key: &ProductCacheKey,
    ) -> Result<Option<ProductRecord>, CacheAsideError> {
        let _guard = self.locks.acquire(key.as_str()).await;

        // A save may have filled the entry while this task waited for the key.
        if let Some(hit) = self.lookup(key, "lookup.recheck") {
            return Ok(Some(hit));
        }

        debug!(
            city,
            policy = ReadPolicy::Populate.as_str(),
            "Looking into store for product"
        );
        let Some(product) = self.store.find_product(city).await? else {
            return Ok(None);
        };
        self.populate(key, &product, ReadPolicy::Populate.as_str());
        Ok(Some(product))
    }

    /// Remove `city` from the store and the cache.
    ///
    /// The cached value, if any, is snapshotted before eviction and handed to
    /// the backup trail once the store delete has succeeded. Invalidating an
    /// absent key succeeds.
    pub async fn invalidate(
        &self,
        city: &str,
    ) -> Result<Option<RetiredProductRecord>, CacheAsideError> {
        let key = ProductCacheKey::for_city(city);
        let _guard = self.locks.acquire(key.as_str()).await;

        let retired = self
            .lookup(&key, "invalidate.snapshot")
            .map(|product| RetiredProductRecord::capture(&product, OffsetDateTime::now_utc()));

        self.store.delete_product(city).await?;
        // Only deletes that reached the store leave a backup row.
        if let Some(retired) = retired.as_ref() {
            self.retire(retired).await;
        }
        self.region.evict(key.as_str()).map_err(|err| {
            warn!(
                op = "invalidate",
                target_module = SOURCE,
                region = self.region.name(),
                key = %key,
                error = %err,
                "Cache eviction failed after store delete"
            );
            CacheAsideError::CacheInvalidation(err)
        })?;
        counter!(METRIC_CACHE_EVICT_TOTAL).increment(1);

        info!(city, region = self.region.name(), "Evicted product from cache");
        Ok(retired)
    }

    /// Empty both the store and the cache region.
    pub async fn clear(&self) -> Result<(), CacheAsideError> {
        self.store.delete_all_products().await?;
        self.region
            .clear()
            .map_err(CacheAsideError::CacheInvalidation)
    }

    fn lookup(&self, key: &ProductCacheKey, op: &'static str) -> Option<ProductRecord> {
        match self.region.get(key.as_str()) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(
                    op,
                    target_module = SOURCE,
                    region = self.region.name(),
                    key = %key,
                    error = %err,
                    "Cache read failed; treating as miss"
                );
                None
            }
        }
    }

    fn populate(&self, key: &ProductCacheKey, product: &ProductRecord, policy: &'static str) {
        match self.region.put(key.as_str(), product.clone()) {
            Ok(()) => {
                counter!(METRIC_CACHE_POPULATE_TOTAL, "policy" => policy).increment(1);
            }
            Err(err) => {
                counter!(METRIC_CACHE_POPULATE_FAILED_TOTAL, "policy" => policy).increment(1);
                warn!(
                    op = "populate",
                    target_module = SOURCE,
                    region = self.region.name(),
                    key = %key,
                    policy,
                    error = %err,
                    "Cache population failed; store remains the source of truth"
                );
            }
        }
    }

    async fn retire(&self, retired: &RetiredProductRecord) {
        match self.backups.record_retired(retired).await {
            Ok(()) => info!(city = %retired.city, "Saved retired product into backup store"),
            Err(err) => warn!(
                op = "invalidate.backup",
                target_module = SOURCE,
                city = %retired.city,
                error = %err,
                "Backup of retired product failed; continuing with delete"
            ),
        }
    }
}
