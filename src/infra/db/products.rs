use async_trait::async_trait;

use crate::{
    application::repos::{ProductsRepo, RepoError},
    domain::entities::ProductRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ProductRow {
    city: String,
    country: String,
}

impl From<ProductRow> for ProductRecord {
    fn from(row: ProductRow) -> Self {
        Self {
            city: row.city,
            country: row.country,
        }
    }
}

#[async_trait]
impl ProductsRepo for PostgresRepositories {
    async fn find_product(&self, city: &str) -> Result<Option<ProductRecord>, RepoError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT city, country
            FROM products
            WHERE city = $1
            "#,
        )
        .bind(city)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ProductRecord::from))
    }

    async fn upsert_product(&self, product: &ProductRecord) -> Result<ProductRecord, RepoError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products (city, country)
            VALUES ($1, $2)
            ON CONFLICT (city) DO UPDATE SET
                country = EXCLUDED.country
            RETURNING city, country
            "#,
        )
        .bind(&product.city)
        .bind(&product.country)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ProductRecord::from(row))
    }

    async fn delete_product(&self, city: &str) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM products WHERE city = $1")
            .bind(city)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete_all_products(&self) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM products")
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        self.ping().await.map_err(map_sqlx_error)
    }
}
