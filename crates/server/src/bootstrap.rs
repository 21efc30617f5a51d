use std::sync::Arc;

use axum::{http::HeaderValue, Router};
use pizzabot_agent::{AgentRuntime, LlmClient, LlmError, OpenAiCompatibleClient};
use pizzabot_core::config::{AppConfig, ConfigError, LoadOptions};
use pizzabot_db::{
    connect_with_settings, migrations, DbPool, MenuSeed, RepositoryError, SqlProductRepository,
};
use thiserror::Error;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::{chat, health};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub agent_runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("menu seeding failed: {0}")]
    Seed(#[source] RepositoryError),
    #[error("language model client could not be built: {0}")]
    Llm(#[source] LlmError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let llm = OpenAiCompatibleClient::from_config(&config.llm).map_err(BootstrapError::Llm)?;
    info!(
        event_name = "system.bootstrap.llm_configured",
        correlation_id = "bootstrap",
        provider = ?config.llm.provider,
        model = %config.llm.model,
        endpoint = %llm.endpoint(),
        "language model client configured"
    );
    bootstrap_with_llm(config, Arc::new(llm)).await
}

/// Connects, migrates and seeds the catalog, then wires the turn runtime around `llm`.
pub async fn bootstrap_with_llm(
    config: AppConfig,
    llm: Arc<dyn LlmClient>,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let catalog = Arc::new(SqlProductRepository::new(db_pool.clone()));
    let seeded = MenuSeed::load(catalog.as_ref()).await.map_err(BootstrapError::Seed)?;
    info!(
        event_name = "system.bootstrap.menu_ready",
        correlation_id = "bootstrap",
        inserted = seeded.inserted,
        already_present = seeded.already_present,
        "menu ready"
    );

    let agent_runtime = Arc::new(AgentRuntime::new(llm, catalog, config.agent.max_steps));
    Ok(Application { config, db_pool, agent_runtime })
}

impl Application {
    pub fn router(&self) -> Router {
        health::router(self.db_pool.clone())
            .merge(chat::router(self.agent_runtime.clone()))
            .layer(cors_layer(&self.config.server.cors_origins))
    }
}

pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|origin| origin.trim() == "*") {
        return layer.allow_origin(Any);
    }

    let allowed = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(
                    event_name = "system.bootstrap.cors_origin_skipped",
                    correlation_id = "bootstrap",
                    origin = %origin,
                    "ignoring invalid CORS origin"
                );
                None
            }
        })
        .collect::<Vec<_>>();
    layer.allow_origin(AllowOrigin::list(allowed))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use pizzabot_agent::{Completion, ScriptedLlmClient};
    use pizzabot_core::config::{AppConfig, LlmProvider};
    use pizzabot_db::MenuSeed;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::bootstrap::{bootstrap_with_config, bootstrap_with_llm};

    fn memory_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.database.url = "sqlite::memory:".to_string();
        config.database.max_connections = 1;
        config
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_seeds_the_menu() {
        let llm = Arc::new(ScriptedLlmClient::new(Vec::<Completion>::new()));
        let app = bootstrap_with_llm(memory_config(), llm).await.expect("bootstrap");

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM pizzas").fetch_one(&app.db_pool).await.expect("count");
        assert_eq!(count as usize, MenuSeed::products().len());
        assert_eq!(app.agent_runtime.max_steps(), 8);

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_builds_http_client_for_local_provider() {
        let mut config = memory_config();
        config.llm.provider = LlmProvider::Ollama;

        let app = bootstrap_with_config(config).await.expect("bootstrap");

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_fails_on_unreachable_database_path() {
        let mut config = memory_config();
        config.database.url = "sqlite:///nonexistent-dir/for/pizzabot/test.db".to_string();
        let llm = Arc::new(ScriptedLlmClient::new(Vec::<Completion>::new()));

        let result = bootstrap_with_llm(config, llm).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn assembled_router_serves_chat_health_and_cors() {
        let llm = Arc::new(ScriptedLlmClient::new([Completion::reply("Olá! Quer ver o cardápio?")]));
        let app = bootstrap_with_llm(memory_config(), llm).await.expect("bootstrap");
        let router = app.router();

        let health = router
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("health response");
        assert_eq!(health.status(), StatusCode::OK);

        let chat = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/chat")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .body(Body::from(json!({"message": "Oi"}).to_string()))
                    .expect("request"),
            )
            .await
            .expect("chat response");
        assert_eq!(chat.status(), StatusCode::OK);
        assert_eq!(
            chat.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).and_then(|value| value.to_str().ok()),
            Some("http://localhost:5173")
        );
        let bytes = to_bytes(chat.into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["response"], "Olá! Quer ver o cardápio?");

        app.db_pool.close().await;
    }
}
