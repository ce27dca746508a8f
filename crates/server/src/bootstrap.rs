use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use procura_agent::executor::ToolExecutor;
use procura_agent::intent::IntentResolver;
use procura_agent::llm::{CompletionError, HttpCompletionClient};
use procura_agent::runtime::AgentOrchestrator;
use procura_core::config::{AppConfig, ConfigError, LoadOptions};
use procura_db::repositories::{
    ConversationStore, SqlCartRepository, SqlCatalogRepository, SqlConversationStore,
    SqlPurchaseRequestRepository,
};
use procura_db::{connect_with_settings, migrations, DbPool};

use crate::gateway::DomainToolGateway;
use crate::services::{CartService, CatalogService, CheckoutService};

/// Fully wired application. Every collaborator is injected explicitly;
/// nothing reads configuration or reaches for globals after this point.
pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub store: Arc<dyn ConversationStore>,
    pub catalog: Arc<CatalogService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub orchestrator: Arc<AgentOrchestrator>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("completion client initialization failed: {0}")]
    Completion(#[source] CompletionError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let store: Arc<dyn ConversationStore> = Arc::new(SqlConversationStore::new(db_pool.clone()));
    let catalog_repo = Arc::new(SqlCatalogRepository::new(db_pool.clone()));
    let cart_repo = Arc::new(SqlCartRepository::new(db_pool.clone()));
    let purchase_repo = Arc::new(SqlPurchaseRequestRepository::new(db_pool.clone()));

    let catalog = Arc::new(CatalogService::new(catalog_repo.clone()));
    let cart = Arc::new(CartService::new(catalog_repo, cart_repo.clone()));
    let checkout = Arc::new(CheckoutService::new(cart_repo, purchase_repo));

    let gateway =
        Arc::new(DomainToolGateway::new(catalog.clone(), cart.clone(), checkout.clone()));
    let completion_client =
        HttpCompletionClient::from_config(&config.llm).map_err(BootstrapError::Completion)?;
    let resolver =
        IntentResolver::new(Arc::new(completion_client), config.agent.history_window);
    let orchestrator = Arc::new(AgentOrchestrator::new(
        store.clone(),
        resolver,
        ToolExecutor::new(gateway),
    ));
    info!(
        event_name = "system.bootstrap.agent_ready",
        provider = ?config.llm.provider,
        model = %config.llm.model,
        "agent orchestrator wired"
    );

    Ok(Application { config, db_pool, store, catalog, cart, checkout, orchestrator })
}
