//! Product service: the domain operations request handlers call.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::cache::{CacheAside, CacheAsideError};
use crate::domain::entities::{ProductRecord, RetiredProductRecord, validate_city};
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum ProductServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Cache(#[from] CacheAsideError),
}

#[derive(Debug, Clone)]
pub struct CreateProductCommand {
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone)]
pub struct UpdateProductCommand {
    /// When present it must name the product being updated; cities never change.
    pub city: Option<String>,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted {
        retired: Option<RetiredProductRecord>,
    },
    NotFound,
}

pub struct ProductService {
    cache: Arc<CacheAside>,
}

impl ProductService {
    pub fn new(cache: Arc<CacheAside>) -> Self {
        Self { cache }
    }

    pub async fn create_product(
        &self,
        command: CreateProductCommand,
    ) -> Result<ProductRecord, ProductServiceError> {
        let product = ProductRecord::new(command.city, command.country);
        product.validate()?;
        Ok(self.cache.save(&product).await?)
    }

    pub async fn get_product(
        &self,
        city: &str,
    ) -> Result<Option<ProductRecord>, ProductServiceError> {
        Ok(self.cache.fetch_cached(city).await?)
    }

    pub async fn get_product_read_only(
        &self,
        city: &str,
    ) -> Result<Option<ProductRecord>, ProductServiceError> {
        Ok(self.cache.fetch_read_only(city).await?)
    }

    /// Replace the country of an existing product. Returns `None` when the
    /// product does not exist.
    pub async fn update_product(
        &self,
        city: &str,
        command: UpdateProductCommand,
    ) -> Result<Option<ProductRecord>, ProductServiceError> {
        validate_city(city)?;
        if let Some(requested) = command.city.as_deref() {
            if requested != city {
                return Err(DomainError::invariant(format!(
                    "city `{city}` cannot be renamed to `{requested}`"
                ))
                .into());
            }
        }

        let Some(existing) = self.cache.fetch_cached(city).await? else {
            return Ok(None);
        };
        let updated = existing.with_country(command.country);
        Ok(Some(self.cache.save(&updated).await?))
    }

    /// Delete a product after confirming it exists.
    pub async fn delete_product(&self, city: &str) -> Result<DeleteOutcome, ProductServiceError> {
        if self.cache.fetch_cached(city).await?.is_none() {
            return Ok(DeleteOutcome::NotFound);
        }

        let retired = self.cache.invalidate(city).await?;
        info!(city, "Deleted product");
        Ok(DeleteOutcome::Deleted { retired })
    }
}
