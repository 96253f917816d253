//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{ProductRecord, RetiredProductRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Durable product storage keyed by city.
///
/// Every call is atomic on its own; no transactions span calls.
#[async_trait]
pub trait ProductsRepo: Send + Sync {
    async fn find_product(&self, city: &str) -> Result<Option<ProductRecord>, RepoError>;

    /// Insert or replace the record stored under `product.city`.
    async fn upsert_product(&self, product: &ProductRecord) -> Result<ProductRecord, RepoError>;

    /// Remove the record stored under `city`. Removing an absent city is not an error.
    async fn delete_product(&self, city: &str) -> Result<(), RepoError>;

    async fn delete_all_products(&self) -> Result<(), RepoError>;

    async fn health_check(&self) -> Result<(), RepoError>;
}

/// Write-only audit trail of products removed by a delete.
#[async_trait]
pub trait BackupsRepo: Send + Sync {
    async fn record_retired(&self, retired: &RetiredProductRecord) -> Result<(), RepoError>;
}
