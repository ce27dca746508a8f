use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use procura_core::domain::cart::CartLine;
use procura_core::domain::catalog::ItemId;
use procura_core::domain::conversation::UserId;

use super::catalog::parse_price;
use super::{CartRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCartRepository {
    pool: DbPool,
}

impl SqlCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CartRepository for SqlCartRepository {
    async fn upsert_line(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO cart_line (user_id, item_id, quantity, added_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id, item_id) DO UPDATE SET
                quantity = quantity + excluded.quantity",
        )
        .bind(&user_id.0)
        .bind(&item_id.0)
        .bind(i64::from(quantity))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_cart(&self, user_id: &UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT cart_line.item_id, catalog_item.name, cart_line.quantity,
                    catalog_item.estimated_price
             FROM cart_line
             JOIN catalog_item ON catalog_item.id = cart_line.item_id
             WHERE cart_line.user_id = ?
             ORDER BY cart_line.added_at ASC, cart_line.item_id ASC",
        )
        .bind(&user_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(line_from_row).collect()
    }

    async fn clear(&self, user_id: &UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_line WHERE user_id = ?")
            .bind(&user_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn line_from_row(row: SqliteRow) -> Result<CartLine, RepositoryError> {
    let quantity_raw: i64 = row.try_get("quantity")?;
    let quantity = u32::try_from(quantity_raw)
        .map_err(|_| RepositoryError::Decode(format!("bad cart quantity `{quantity_raw}`")))?;
    let price_raw: String = row.try_get("estimated_price")?;

    Ok(CartLine {
        item_id: ItemId(row.try_get("item_id")?),
        item_name: row.try_get("name")?,
        quantity,
        unit_estimate: parse_price(&price_raw)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use procura_core::domain::catalog::{CatalogItem, ItemId};
    use procura_core::domain::conversation::UserId;

    use super::SqlCartRepository;
    use crate::migrations::run_pending;
    use crate::repositories::{CartRepository, CatalogRepository, SqlCatalogRepository};
    use crate::connect_with_settings;

    async fn repos() -> (SqlCatalogRepository, SqlCartRepository) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        (SqlCatalogRepository::new(pool.clone()), SqlCartRepository::new(pool))
    }

    fn item(id: &str, name: &str, cents: i64) -> CatalogItem {
        CatalogItem {
            id: ItemId(id.to_string()),
            name: name.to_string(),
            category: "stationery".to_string(),
            description: String::new(),
            estimated_price: Decimal::new(cents, 2),
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_accumulates_quantity_for_the_same_item() {
        let (catalog, cart) = repos().await;
        catalog.insert(item("i-1", "Pen", 450)).await.expect("insert item");
        let user = UserId("u-1".to_string());

        cart.upsert_line(&user, &ItemId("i-1".to_string()), 2).await.expect("first add");
        cart.upsert_line(&user, &ItemId("i-1".to_string()), 3).await.expect("second add");

        let lines = cart.fetch_cart(&user).await.expect("fetch");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 5);
        assert_eq!(lines[0].item_name, "Pen");
    }

    #[tokio::test]
    async fn carts_are_isolated_per_user_and_clearable() {
        let (catalog, cart) = repos().await;
        catalog.insert(item("i-1", "Pen", 450)).await.expect("insert item");
        let alice = UserId("u-alice".to_string());
        let bob = UserId("u-bob".to_string());

        cart.upsert_line(&alice, &ItemId("i-1".to_string()), 1).await.expect("alice add");
        cart.upsert_line(&bob, &ItemId("i-1".to_string()), 4).await.expect("bob add");

        cart.clear(&alice).await.expect("clear alice");

        assert!(cart.fetch_cart(&alice).await.expect("alice cart").is_empty());
        assert_eq!(cart.fetch_cart(&bob).await.expect("bob cart").len(), 1);
    }
}
