//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::error::DomainError;

/// A product is a city paired with the country it belongs to.
///
/// `city` is the natural key: once a record exists it never changes, only
/// `country` may be updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub city: String,
    pub country: String,
}

impl ProductRecord {
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
        }
    }

    /// Reject records whose natural key cannot address a cache entry.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_city(&self.city)
    }

    /// Return a copy carrying `country`, keeping the natural key untouched.
    pub fn with_country(&self, country: impl Into<String>) -> Self {
        Self {
            city: self.city.clone(),
            country: country.into(),
        }
    }
}

pub fn validate_city(city: &str) -> Result<(), DomainError> {
    if city.trim().is_empty() {
        return Err(DomainError::validation("city must not be empty"));
    }
    Ok(())
}

/// Snapshot of a product captured when it is removed from the cache by a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetiredProductRecord {
    pub city: String,
    pub country: String,
    pub retired_at: OffsetDateTime,
}

impl RetiredProductRecord {
    pub fn capture(product: &ProductRecord, retired_at: OffsetDateTime) -> Self {
        Self {
            city: product.city.clone(),
            country: product.country.clone(),
            retired_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_covers_every_field() {
        let hamburg = ProductRecord::new("hamburg", "Germany");
        assert_eq!(hamburg, ProductRecord::new("hamburg", "Germany"));
        assert_ne!(hamburg, ProductRecord::new("hamburg", "Austria"));
        assert_ne!(hamburg, ProductRecord::new("denver", "Germany"));
    }

    #[test]
    fn with_country_keeps_the_key() {
        let updated = ProductRecord::new("hamburg", "Germany").with_country("Austria");
        assert_eq!(updated.city, "hamburg");
        assert_eq!(updated.country, "Austria");
    }

    #[test]
    fn blank_city_is_rejected() {
        assert!(ProductRecord::new("  ", "Germany").validate().is_err());
        assert!(ProductRecord::new("rom", "Italy").validate().is_ok());
    }

    #[test]
    fn retired_snapshot_copies_attributes() {
        let now = OffsetDateTime::now_utc();
        let retired = RetiredProductRecord::capture(&ProductRecord::new("rom", "Italy"), now);
        assert_eq!(retired.city, "rom");
        assert_eq!(retired.country, "Italy");
        assert_eq!(retired.retired_at, now);
    }
}
