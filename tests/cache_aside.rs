//! Behaviour of the cache-aside layer against store and region fakes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use product_cache::application::repos::{BackupsRepo, ProductsRepo, RepoError};
use product_cache::cache::{
    CacheAside, CacheAsideError, CacheRegion, CacheRegionError, InMemoryRegion, ProductCacheKey,
};
use product_cache::domain::entities::{ProductRecord, RetiredProductRecord};
use product_cache::infra::memory::InMemoryRepositories;

/// Store fake that counts calls and can be told to fail or to pause lookups.
#[derive(Default)]
struct CountingStore {
    inner: InMemoryRepositories,
    finds: AtomicUsize,
    upserts: AtomicUsize,
    fail: AtomicBool,
    gate: Option<Gate>,
}

/// Pauses the first store lookup after it has read, until released.
struct Gate {
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl CountingStore {
    fn gated() -> Self {
        Self {
            gate: Some(Gate {
                armed: AtomicBool::new(true),
                entered: Notify::new(),
                release: Notify::new(),
            }),
            ..Default::default()
        }
    }

    fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl ProductsRepo for CountingStore {
    async fn find_product(&self, city: &str) -> Result<Option<ProductRecord>, RepoError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let found = self.inner.find_product(city).await?;
        if let Some(gate) = self
            .gate
            .as_ref()
            .filter(|gate| gate.armed.swap(false, Ordering::SeqCst))
        {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        Ok(found)
    }

    async fn upsert_product(&self, product: &ProductRecord) -> Result<ProductRecord, RepoError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.upsert_product(product).await
    }

    async fn delete_product(&self, city: &str) -> Result<(), RepoError> {
        self.check()?;
        self.inner.delete_product(city).await
    }

    async fn delete_all_products(&self) -> Result<(), RepoError> {
        self.check()?;
        self.inner.delete_all_products().await
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        self.check()
    }
}

#[async_trait]
impl BackupsRepo for CountingStore {
    async fn record_retired(&self, retired: &RetiredProductRecord) -> Result<(), RepoError> {
        self.inner.record_retired(retired).await
    }
}

/// Region fake whose operations can be switched to fail one by one.
#[derive(Default)]
struct FlakyRegion {
    inner: InMemoryRegion<ProductRecord>,
    fail_get: AtomicBool,
    fail_put: AtomicBool,
    fail_evict: AtomicBool,
}

impl CacheRegion<ProductRecord> for FlakyRegion {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn get(&self, key: &str) -> Result<Option<ProductRecord>, CacheRegionError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(CacheRegionError::unavailable(self.name(), "read refused"));
        }
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: ProductRecord) -> Result<(), CacheRegionError> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(CacheRegionError::rejected(self.name(), key, "full"));
        }
        self.inner.put(key, value)
    }

    fn evict(&self, key: &str) -> Result<(), CacheRegionError> {
        if self.fail_evict.load(Ordering::SeqCst) {
            return Err(CacheRegionError::unavailable(self.name(), "evict refused"));
        }
        self.inner.evict(key)
    }

    fn clear(&self) -> Result<(), CacheRegionError> {
        self.inner.clear()
    }
}

struct FailingBackups;

#[async_trait]
impl BackupsRepo for FailingBackups {
    async fn record_retired(&self, _retired: &RetiredProductRecord) -> Result<(), RepoError> {
        Err(RepoError::Timeout)
    }
}

struct Fixture {
    cache: Arc<CacheAside>,
    store: Arc<CountingStore>,
    region: Arc<FlakyRegion>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_store(CountingStore::default())
    }

    fn with_store(store: CountingStore) -> Self {
        let store = Arc::new(store);
        let region = Arc::new(FlakyRegion::default());
        let cache = Arc::new(CacheAside::new(
            store.clone(),
            region.clone(),
            store.clone(),
        ));
        Self {
            cache,
            store,
            region,
        }
    }

    fn cached(&self, city: &str) -> Option<ProductRecord> {
        self.region
            .inner
            .get(ProductCacheKey::for_city(city).as_str())
            .expect("in-memory region reads succeed")
    }

    async fn stored(&self, city: &str) -> Option<ProductRecord> {
        self.store
            .inner
            .find_product(city)
            .await
            .expect("in-memory store reads succeed")
    }

    async fn seed_store(&self, city: &str, country: &str) {
        self.store
            .inner
            .upsert_product(&ProductRecord::new(city, country))
            .await
            .expect("seed store");
    }
}

#[tokio::test]
async fn save_writes_store_and_cache() {
    let fx = Fixture::new();
    let product = ProductRecord::new("hamburg", "Germany");

    let saved = fx.cache.save(&product).await.expect("save succeeds");

    assert_eq!(saved, product);
    assert_eq!(fx.stored("hamburg").await, Some(product.clone()));
    assert_eq!(fx.cached("hamburg"), Some(product));
}

#[tokio::test]
async fn populating_read_fills_the_cache() {
    let fx = Fixture::new();
    fx.seed_store("rom", "Italy").await;

    let fetched = fx.cache.fetch_cached("rom").await.expect("fetch succeeds");

    assert_eq!(fetched, Some(ProductRecord::new("rom", "Italy")));
    assert_eq!(fx.cached("rom"), Some(ProductRecord::new("rom", "Italy")));
}

#[tokio::test]
async fn read_only_lookup_never_fills_the_cache() {
    let fx = Fixture::new();
    fx.seed_store("rom", "Italy").await;

    for _ in 0..2 {
        let fetched = fx
            .cache
            .fetch_read_only("rom")
            .await
            .expect("fetch succeeds");
        assert_eq!(fetched, Some(ProductRecord::new("rom", "Italy")));
    }

    assert_eq!(fx.store.finds(), 2);
    assert!(fx.cached("rom").is_none());
    assert!(fx.region.inner.is_empty());
}

#[tokio::test]
async fn read_only_lookup_serves_cached_entries_without_the_store() {
    let fx = Fixture::new();
    fx.region
        .inner
        .put(
            ProductCacheKey::for_city("denver").as_str(),
            ProductRecord::new("denver", "USA"),
        )
        .expect("seed region");

    let fetched = fx
        .cache
        .fetch_read_only("denver")
        .await
        .expect("fetch succeeds");

    assert_eq!(fetched, Some(ProductRecord::new("denver", "USA")));
    assert_eq!(fx.store.finds(), 0);
}

#[tokio::test]
async fn cached_lookup_hits_skip_the_store() {
    let fx = Fixture::new();
    fx.seed_store("rom", "Italy").await;

    fx.cache.fetch_cached("rom").await.expect("first fetch");
    fx.cache.fetch_cached("rom").await.expect("second fetch");

    assert_eq!(fx.store.finds(), 1);
}

#[tokio::test]
async fn invalidate_removes_both_sides() {
    let fx = Fixture::new();
    fx.cache
        .save(&ProductRecord::new("hamburg", "Germany"))
        .await
        .expect("save succeeds");

    let retired = fx
        .cache
        .invalidate("hamburg")
        .await
        .expect("invalidate succeeds")
        .expect("cached value is retired");

    assert_eq!(retired.city, "hamburg");
    assert_eq!(retired.country, "Germany");
    assert!(fx.stored("hamburg").await.is_none());
    assert!(fx.cached("hamburg").is_none());
    assert_eq!(fx.store.inner.retired().await.len(), 1);
}

#[tokio::test]
async fn absent_keys_are_not_errors() {
    let fx = Fixture::new();

    assert!(
        fx.cache
            .fetch_cached("nowhere")
            .await
            .expect("fetch succeeds")
            .is_none()
    );
    assert!(
        fx.cache
            .fetch_read_only("nowhere")
            .await
            .expect("fetch succeeds")
            .is_none()
    );
    assert!(fx.stored("nowhere").await.is_none());
    assert!(fx.region.inner.is_empty());
}

#[tokio::test]
async fn invalidating_an_absent_key_succeeds() {
    let fx = Fixture::new();

    let first = fx.cache.invalidate("nowhere").await.expect("first call");
    let second = fx.cache.invalidate("nowhere").await.expect("second call");

    assert!(first.is_none());
    assert!(second.is_none());
    assert!(fx.store.inner.retired().await.is_empty());
}

#[tokio::test]
async fn saving_twice_overwrites_instead_of_merging() {
    let fx = Fixture::new();

    fx.cache
        .save(&ProductRecord::new("hamburg", "Germany"))
        .await
        .expect("first save");
    assert_eq!(
        fx.cached("hamburg"),
        Some(ProductRecord::new("hamburg", "Germany"))
    );

    fx.cache
        .save(&ProductRecord::new("hamburg", "Austria"))
        .await
        .expect("second save");

    let expected = ProductRecord::new("hamburg", "Austria");
    assert_eq!(fx.stored("hamburg").await, Some(expected.clone()));
    assert_eq!(fx.cached("hamburg"), Some(expected));
}

#[tokio::test]
async fn read_only_then_populating_read() {
    let fx = Fixture::new();
    fx.seed_store("rom", "Italy").await;
    let rom = ProductRecord::new("rom", "Italy");

    assert_eq!(
        fx.cache.fetch_read_only("rom").await.expect("read only"),
        Some(rom.clone())
    );
    assert!(fx.cached("rom").is_none());

    assert_eq!(
        fx.cache.fetch_cached("rom").await.expect("populating"),
        Some(rom.clone())
    );
    assert_eq!(fx.cached("rom"), Some(rom));
}

#[tokio::test]
async fn store_failure_on_save_leaves_cache_untouched() {
    let fx = Fixture::new();
    fx.store.fail.store(true, Ordering::SeqCst);

    let result = fx.cache.save(&ProductRecord::new("hamburg", "Germany")).await;

    assert!(matches!(result, Err(CacheAsideError::StoreUnavailable(_))));
    assert!(fx.cached("hamburg").is_none());
}

#[tokio::test]
async fn store_failure_on_lookup_is_reported() {
    let fx = Fixture::new();
    fx.store.fail.store(true, Ordering::SeqCst);

    assert!(matches!(
        fx.cache.fetch_cached("rom").await,
        Err(CacheAsideError::StoreUnavailable(_))
    ));
    assert!(matches!(
        fx.cache.fetch_read_only("rom").await,
        Err(CacheAsideError::StoreUnavailable(_))
    ));
}

#[tokio::test]
async fn failed_store_delete_leaves_no_backup() {
    let fx = Fixture::new();
    fx.cache
        .save(&ProductRecord::new("rom", "Italy"))
        .await
        .expect("save succeeds");
    fx.store.fail.store(true, Ordering::SeqCst);

    for _ in 0..2 {
        assert!(matches!(
            fx.cache.invalidate("rom").await,
            Err(CacheAsideError::StoreUnavailable(_))
        ));
    }

    assert!(fx.store.inner.retired().await.is_empty());
    assert_eq!(fx.stored("rom").await, Some(ProductRecord::new("rom", "Italy")));
    assert_eq!(fx.cached("rom"), Some(ProductRecord::new("rom", "Italy")));
}

#[tokio::test]
async fn cache_population_failure_is_not_fatal() {
    let fx = Fixture::new();
    fx.region.fail_put.store(true, Ordering::SeqCst);

    let saved = fx
        .cache
        .save(&ProductRecord::new("hamburg", "Germany"))
        .await
        .expect("store write still succeeds");
    assert_eq!(saved, ProductRecord::new("hamburg", "Germany"));
    assert_eq!(fx.stored("hamburg").await, Some(saved.clone()));

    let fetched = fx
        .cache
        .fetch_cached("hamburg")
        .await
        .expect("lookup still succeeds");
    assert_eq!(fetched, Some(saved));
    assert!(fx.cached("hamburg").is_none());
}

#[tokio::test]
async fn unreadable_cache_falls_back_to_the_store() {
    let fx = Fixture::new();
    fx.seed_store("rom", "Italy").await;
    fx.region.fail_get.store(true, Ordering::SeqCst);

    let fetched = fx.cache.fetch_read_only("rom").await.expect("fetch");

    assert_eq!(fetched, Some(ProductRecord::new("rom", "Italy")));
    assert_eq!(fx.store.finds(), 1);
}

#[tokio::test]
async fn eviction_failure_after_delete_is_reported() {
    let fx = Fixture::new();
    fx.cache
        .save(&ProductRecord::new("hamburg", "Germany"))
        .await
        .expect("save succeeds");
    fx.region.fail_evict.store(true, Ordering::SeqCst);

    let result = fx.cache.invalidate("hamburg").await;

    assert!(matches!(result, Err(CacheAsideError::CacheInvalidation(_))));
    assert!(fx.stored("hamburg").await.is_none());
}

#[tokio::test]
async fn backup_failure_does_not_block_the_delete() {
    let store = Arc::new(CountingStore::default());
    let region = Arc::new(InMemoryRegion::<ProductRecord>::default());
    let cache = CacheAside::new(store.clone(), region.clone(), Arc::new(FailingBackups));

    cache
        .save(&ProductRecord::new("rom", "Italy"))
        .await
        .expect("save succeeds");
    let retired = cache.invalidate("rom").await.expect("delete still succeeds");

    assert!(retired.is_some());
    assert!(store.inner.find_product("rom").await.unwrap().is_none());
    assert!(region.is_empty());
}

#[tokio::test]
async fn clear_empties_store_and_cache() {
    let fx = Fixture::new();
    for (city, country) in [("hamburg", "Germany"), ("rom", "Italy")] {
        fx.cache
            .save(&ProductRecord::new(city, country))
            .await
            .expect("save succeeds");
    }

    fx.cache.clear().await.expect("clear succeeds");

    assert!(fx.region.inner.is_empty());
    assert!(fx.stored("hamburg").await.is_none());
    assert!(fx.stored("rom").await.is_none());
}

#[tokio::test]
async fn delete_racing_a_populating_read_is_not_undone() {
    let fx = Fixture::with_store(CountingStore::gated());
    fx.seed_store("rom", "Italy").await;
    let gate = fx.store.gate.as_ref().expect("gated store");

    let reader = {
        let cache = fx.cache.clone();
        tokio::spawn(async move { cache.fetch_cached("rom").await })
    };
    // The reader has read the store and holds the key.
    gate.entered.notified().await;

    let deleter = {
        let cache = fx.cache.clone();
        tokio::spawn(async move { cache.invalidate("rom").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!deleter.is_finished(), "delete must wait for the reader");

    gate.release.notify_one();
    let read = reader.await.expect("reader task").expect("read succeeds");
    let retired = deleter.await.expect("deleter task").expect("delete succeeds");

    assert_eq!(read, Some(ProductRecord::new("rom", "Italy")));
    assert!(retired.is_some());
    assert!(fx.cached("rom").is_none());
    assert!(fx.stored("rom").await.is_none());

    // A later populating read finds nothing to resurrect.
    assert!(fx.cache.fetch_cached("rom").await.expect("fetch").is_none());
    assert!(fx.cached("rom").is_none());
}

#[tokio::test]
async fn concurrent_saves_are_last_write_wins() {
    let fx = Fixture::new();
    let mut handles = Vec::new();
    for country in ["Germany", "Austria", "Switzerland"] {
        let cache = fx.cache.clone();
        handles.push(tokio::spawn(async move {
            cache.save(&ProductRecord::new("hamburg", country)).await
        }));
    }
    for handle in handles {
        handle.await.expect("save task").expect("save succeeds");
    }

    let stored = fx.stored("hamburg").await.expect("stored");
    let cached = fx.cached("hamburg").expect("cached");
    assert_eq!(stored, cached);
    assert_eq!(fx.store.upserts.load(Ordering::SeqCst), 3);
}
