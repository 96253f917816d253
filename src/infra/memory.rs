//! Process-local repositories for development runs and tests.
//!
//! Nothing survives a restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    application::repos::{BackupsRepo, ProductsRepo, RepoError},
    domain::entities::{ProductRecord, RetiredProductRecord},
};

#[derive(Clone, Default)]
pub struct InMemoryRepositories {
    products: Arc<RwLock<HashMap<String, ProductRecord>>>,
    retired: Arc<RwLock<Vec<RetiredProductRecord>>>,
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retired snapshots in the order they were recorded.
    pub async fn retired(&self) -> Vec<RetiredProductRecord> {
        self.retired.read().await.clone()
    }
}

#[async_trait]
impl ProductsRepo for InMemoryRepositories {
    async fn find_product(&self, city: &str) -> Result<Option<ProductRecord>, RepoError> {
        Ok(self.products.read().await.get(city).cloned())
    }

    async fn upsert_product(&self, product: &ProductRecord) -> Result<ProductRecord, RepoError> {
        self.products
            .write()
            .await
            .insert(product.city.clone(), product.clone());
        Ok(product.clone())
    }

    async fn delete_product(&self, city: &str) -> Result<(), RepoError> {
        self.products.write().await.remove(city);
        Ok(())
    }

    async fn delete_all_products(&self) -> Result<(), RepoError> {
        self.products.write().await.clear();
        Ok(())
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

#[async_trait]
impl BackupsRepo for InMemoryRepositories {
    async fn record_retired(&self, retired: &RetiredProductRecord) -> Result<(), RepoError> {
        self.retired.write().await.push(retired.clone());
        Ok(())
    }
}
