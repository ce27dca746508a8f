use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};

use procura_core::domain::catalog::{CatalogItem, ItemId};
use procura_core::domain::conversation::UserId;

use super::{CatalogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn search(
        &self,
        keyword: Option<&str>,
        limit: u32,
    ) -> Result<Vec<CatalogItem>, RepositoryError> {
        let limit = i64::from(limit.max(1));
        let rows = match keyword.map(str::trim).filter(|keyword| !keyword.is_empty()) {
            Some(keyword) => {
                let pattern = format!("%{}%", escape_like(keyword));
                sqlx::query(
                    "SELECT id, name, category, description, estimated_price, created_by, created_at
                     FROM catalog_item
                     WHERE name LIKE ? ESCAPE '\\'
                        OR category LIKE ? ESCAPE '\\'
                        OR description LIKE ? ESCAPE '\\'
                     ORDER BY name ASC
                     LIMIT ?",
                )
                .bind(&pattern)
                .bind(&pattern)
                .bind(&pattern)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, name, category, description, estimated_price, created_by, created_at
                     FROM catalog_item
                     ORDER BY name ASC
                     LIMIT ?",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(item_from_row).collect()
    }

    async fn insert(&self, item: CatalogItem) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO catalog_item
                (id, name, category, description, estimated_price, created_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&item.id.0)
        .bind(&item.name)
        .bind(&item.category)
        .bind(&item.description)
        .bind(item.estimated_price.to_string())
        .bind(item.created_by.as_ref().map(|user| user.0.as_str()))
        .bind(item.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &ItemId) -> Result<Option<CatalogItem>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, category, description, estimated_price, created_by, created_at
             FROM catalog_item
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(item_from_row).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CatalogItem>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, category, description, estimated_price, created_by, created_at
             FROM catalog_item
             WHERE LOWER(name) = LOWER(?)
             LIMIT 1",
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.map(item_from_row).transpose()
    }
}

fn escape_like(keyword: &str) -> String {
    keyword.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

pub(crate) fn parse_price(raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw)
        .map_err(|error| RepositoryError::Decode(format!("bad price `{raw}`: {error}")))
}

fn item_from_row(row: SqliteRow) -> Result<CatalogItem, RepositoryError> {
    let price_raw: String = row.try_get("estimated_price")?;

    Ok(CatalogItem {
        id: ItemId(row.try_get("id")?),
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        estimated_price: parse_price(&price_raw)?,
        created_by: row.try_get::<Option<String>, _>("created_by")?.map(UserId),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use procura_core::domain::catalog::{CatalogItem, ItemId};

    use super::SqlCatalogRepository;
    use crate::migrations::run_pending;
    use crate::repositories::CatalogRepository;
    use crate::connect_with_settings;

    async fn repo() -> SqlCatalogRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        SqlCatalogRepository::new(pool)
    }

    fn item(id: &str, name: &str, category: &str) -> CatalogItem {
        CatalogItem {
            id: ItemId(id.to_string()),
            name: name.to_string(),
            category: category.to_string(),
            description: format!("{name} for the office"),
            estimated_price: Decimal::new(450, 2),
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn search_matches_name_category_and_description() {
        let repo = repo().await;
        repo.insert(item("i-1", "Ballpoint pen", "stationery")).await.expect("insert");
        repo.insert(item("i-2", "Desk lamp", "lighting")).await.expect("insert");

        let by_name = repo.search(Some("pen"), 10).await.expect("search");
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id.0, "i-1");

        let by_category = repo.search(Some("lighting"), 10).await.expect("search");
        assert_eq!(by_category.len(), 1);

        let all = repo.search(None, 10).await.expect("search");
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn no_results_is_an_empty_list_not_an_error() {
        let repo = repo().await;
        let results = repo.search(Some("unobtainium"), 10).await.expect("search");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn like_wildcards_in_keywords_are_literal() {
        let repo = repo().await;
        repo.insert(item("i-1", "Ballpoint pen", "stationery")).await.expect("insert");

        let results = repo.search(Some("%"), 10).await.expect("search");
        assert!(results.is_empty(), "a literal percent should not match everything");
    }

    #[tokio::test]
    async fn duplicate_lookup_is_case_insensitive() {
        let repo = repo().await;
        repo.insert(item("i-1", "Ballpoint Pen", "stationery")).await.expect("insert");

        let found = repo.find_by_name("ballpoint pen").await.expect("find");
        assert!(found.is_some());
        let missing = repo.find_by_name("fountain pen").await.expect("find");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn price_round_trips_through_text_storage() {
        let repo = repo().await;
        let mut wanted = item("i-1", "Ballpoint pen", "stationery");
        wanted.estimated_price = Decimal::new(123456, 2);
        repo.insert(wanted.clone()).await.expect("insert");

        let found = repo.find_by_id(&wanted.id).await.expect("find").expect("exists");
        assert_eq!(found.estimated_price, Decimal::new(123456, 2));
    }
}
