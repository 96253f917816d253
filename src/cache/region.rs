//! Cache region storage.
//!
//! A region is raw key/value storage with no policy of its own: it never
//! expires, bounds or loads entries. [`super::CacheAside`] decides what goes in.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use super::keys::PRODUCT_REGION;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::region";

#[derive(Debug, Error)]
pub enum CacheRegionError {
    #[error("cache region `{region}` unavailable: {message}")]
    Unavailable { region: String, message: String },
    #[error("cache region `{region}` rejected `{key}`: {message}")]
    Rejected {
        region: String,
        key: String,
        message: String,
    },
}

impl CacheRegionError {
    pub fn unavailable(region: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            region: region.into(),
            message: message.into(),
        }
    }

    pub fn rejected(
        region: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            region: region.into(),
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Key/value storage addressed by derived cache keys.
pub trait CacheRegion<V>: Send + Sync {
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> Result<Option<V>, CacheRegionError>;

    /// Create or overwrite the entry under `key`.
    fn put(&self, key: &str, value: V) -> Result<(), CacheRegionError>;

    /// Drop the entry under `key`. Evicting an absent key succeeds.
    fn evict(&self, key: &str) -> Result<(), CacheRegionError>;

    fn clear(&self) -> Result<(), CacheRegionError>;
}

/// Process-local region backed by a `HashMap`.
pub struct InMemoryRegion<V> {
    name: String,
    entries: RwLock<HashMap<String, V>>,
}

impl<V> InMemoryRegion<V> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Default for InMemoryRegion<V> {
    fn default() -> Self {
        Self::new(PRODUCT_REGION)
    }
}

impl<V> CacheRegion<V> for InMemoryRegion<V>
where
    V: Clone + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Result<Option<V>, CacheRegionError> {
        Ok(rw_read(&self.entries, SOURCE, "get").get(key).cloned())
    }

    fn put(&self, key: &str, value: V) -> Result<(), CacheRegionError> {
        rw_write(&self.entries, SOURCE, "put").insert(key.to_string(), value);
        Ok(())
    }

    fn evict(&self, key: &str) -> Result<(), CacheRegionError> {
        rw_write(&self.entries, SOURCE, "evict").remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheRegionError> {
        rw_write(&self.entries, SOURCE, "clear").clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_overwrites_and_evict_removes() {
        let region: InMemoryRegion<String> = InMemoryRegion::default();
        assert_eq!(region.name(), "PRODUCT");

        region.put("PRONUM:hamburg", "Germany".to_string()).unwrap();
        region.put("PRONUM:hamburg", "Austria".to_string()).unwrap();
        assert_eq!(region.len(), 1);
        assert_eq!(
            region.get("PRONUM:hamburg").unwrap().as_deref(),
            Some("Austria")
        );

        region.evict("PRONUM:hamburg").unwrap();
        assert!(region.get("PRONUM:hamburg").unwrap().is_none());
        assert!(region.is_empty());
    }

    #[test]
    fn evicting_an_absent_key_is_a_no_op() {
        let region: InMemoryRegion<String> = InMemoryRegion::new("scratch");
        assert!(region.evict("PRONUM:nowhere").is_ok());
        assert!(region.is_empty());
    }

    #[test]
    fn clear_drops_every_entry() {
        let region: InMemoryRegion<u32> = InMemoryRegion::default();
        region.put("PRONUM:rom", 1).unwrap();
        region.put("PRONUM:denver", 2).unwrap();
        region.clear().unwrap();
        assert!(region.is_empty());
    }
}
