//! Cache key definitions.
//!
//! Product entries live under `PRONUM:<city>`. Only the cache layer derives
//! these keys; callers hand over natural keys.

use std::fmt;

/// Default name of the region holding product entries.
pub const PRODUCT_REGION: &str = "PRODUCT";

/// Namespace prepended to every product's natural key.
pub const PRODUCT_KEY_NAMESPACE: &str = "PRONUM";

/// Derived cache key for a single product.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductCacheKey(String);

impl ProductCacheKey {
    pub fn for_city(city: &str) -> Self {
        Self(format!("{PRODUCT_KEY_NAMESPACE}:{city}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_namespace_colon_city() {
        assert_eq!(ProductCacheKey::for_city("hamburg").as_str(), "PRONUM:hamburg");
        assert_eq!(ProductCacheKey::for_city("rom").to_string(), "PRONUM:rom");
    }

    #[test]
    fn distinct_cities_never_share_a_key() {
        assert_ne!(
            ProductCacheKey::for_city("rom"),
            ProductCacheKey::for_city("roma")
        );
        assert_eq!(
            ProductCacheKey::for_city("rom"),
            ProductCacheKey::for_city("rom")
        );
    }

    #[test]
    fn city_is_kept_verbatim() {
        // No normalisation: keys are case- and whitespace-sensitive like the store.
        assert_eq!(ProductCacheKey::for_city("Rom").as_str(), "PRONUM:Rom");
        assert_ne!(
            ProductCacheKey::for_city("Rom"),
            ProductCacheKey::for_city("rom")
        );
    }
}
