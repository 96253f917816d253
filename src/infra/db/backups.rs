use async_trait::async_trait;

use crate::{
    application::repos::{BackupsRepo, RepoError},
    domain::entities::RetiredProductRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl BackupsRepo for PostgresRepositories {
    async fn record_retired(&self, retired: &RetiredProductRecord) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO product_backups (city, country, retired_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&retired.city)
        .bind(&retired.country)
        .bind(retired.retired_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
