use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use procura_db::DbPool;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Ready,
    Degraded,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: ProbeStatus,
    pub database: ProbeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub checked_at: String,
}

#[derive(Clone)]
struct HealthState {
    db_pool: DbPool,
}

fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

/// Binds the health listener on its own port so liveness probes stay
/// answerable even when the API listener is saturated.
pub async fn spawn(bind_address: &str, port: u16, db_pool: DbPool) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(db_pool)).await {
            error!(
                event_name = "system.health.error",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let (database, detail) = match probe_database(&state.db_pool).await {
        Ok(()) => (ProbeStatus::Ready, None),
        Err(reason) => (ProbeStatus::Degraded, Some(reason)),
    };

    let status_code = match database {
        ProbeStatus::Ready => StatusCode::OK,
        ProbeStatus::Degraded => StatusCode::SERVICE_UNAVAILABLE,
    };

    let payload = HealthResponse {
        status: database,
        database,
        detail,
        checked_at: Utc::now().to_rfc3339(),
    };

    (status_code, Json(payload))
}

async fn probe_database(pool: &DbPool) -> Result<(), String> {
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| ())
        .map_err(|error| format!("database query failed: {error}"))
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use procura_db::connect_with_settings;

    use super::{health, HealthState, ProbeStatus};

    #[tokio::test]
    async fn reports_ready_while_the_database_answers() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 5)
            .await
            .expect("pool should connect");

        let (status, Json(payload)) = health(State(HealthState { db_pool: pool.clone() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, ProbeStatus::Ready);
        assert!(payload.detail.is_none());

        pool.close().await;
    }

    #[tokio::test]
    async fn degrades_when_the_database_is_gone() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 5)
            .await
            .expect("pool should connect");
        pool.close().await;

        let (status, Json(payload)) = health(State(HealthState { db_pool: pool })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, ProbeStatus::Degraded);
        assert_eq!(payload.database, ProbeStatus::Degraded);
        assert!(payload.detail.is_some());
    }
}
