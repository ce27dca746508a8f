use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use procura_core::domain::conversation::UserId;
use procura_core::domain::purchase::{
    PurchaseRequestId, PurchaseRequestSnapshot, PurchaseRequestStatus,
};

use super::catalog::parse_price;
use super::{PurchaseRequestRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPurchaseRequestRepository {
    pool: DbPool,
}

impl SqlPurchaseRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PurchaseRequestRepository for SqlPurchaseRequestRepository {
    async fn insert(&self, request: PurchaseRequestSnapshot) -> Result<(), RepositoryError> {
        let lines_json = serde_json::to_string(&request.lines)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO purchase_request
                (id, user_id, lines_json, estimated_total, notes, status, submitted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(&request.user_id.0)
        .bind(lines_json)
        .bind(request.estimated_total.to_string())
        .bind(request.notes.as_deref())
        .bind(request.status.as_str())
        .bind(request.submitted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &PurchaseRequestId,
    ) -> Result<Option<PurchaseRequestSnapshot>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, user_id, lines_json, estimated_total, notes, status, submitted_at
             FROM purchase_request
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(request_from_row).transpose()
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<PurchaseRequestSnapshot>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, lines_json, estimated_total, notes, status, submitted_at
             FROM purchase_request
             WHERE user_id = ?
             ORDER BY submitted_at DESC
             LIMIT ?",
        )
        .bind(&user_id.0)
        .bind(i64::from(limit.max(1)))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(request_from_row).collect()
    }
}

fn request_from_row(row: SqliteRow) -> Result<PurchaseRequestSnapshot, RepositoryError> {
    let lines_raw: String = row.try_get("lines_json")?;
    let lines = serde_json::from_str(&lines_raw)
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let total_raw: String = row.try_get("estimated_total")?;
    let status_raw: String = row.try_get("status")?;
    let status = PurchaseRequestStatus::parse(&status_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown purchase request status `{status_raw}`"))
    })?;

    Ok(PurchaseRequestSnapshot {
        id: PurchaseRequestId(row.try_get("id")?),
        user_id: UserId(row.try_get("user_id")?),
        lines,
        estimated_total: parse_price(&total_raw)?,
        notes: row.try_get("notes")?,
        status,
        submitted_at: row.try_get::<DateTime<Utc>, _>("submitted_at")?,
    })
}
