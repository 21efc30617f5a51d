use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use pizzabot_db::DbPool;
use serde::Serialize;

const SERVICE_NAME: &str = "pizzabot-server";

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ComponentStatus {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub database: ComponentStatus,
    pub menu: ComponentStatus,
    pub checked_at: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .with_state(HealthState { db_pool })
}

pub async fn index() -> Json<ServiceInfo> {
    Json(ServiceInfo { service: SERVICE_NAME, version: env!("CARGO_PKG_VERSION"), status: "running" })
}

/// 200 while the database answers; the menu size is informational.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthReport>) {
    let (database, menu) = match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pizzas")
        .fetch_one(&state.db_pool)
        .await
    {
        Ok(count) => (
            ComponentStatus { status: "ready", detail: "database query succeeded".to_string() },
            ComponentStatus {
                status: if count > 0 { "ready" } else { "empty" },
                detail: format!("{count} pizzas on the menu"),
            },
        ),
        Err(error) => (
            ComponentStatus { status: "degraded", detail: format!("database query failed: {error}") },
            ComponentStatus { status: "unknown", detail: "menu could not be read".to_string() },
        ),
    };
    let ready = database.status == "ready";

    let report = HealthReport {
        status: if ready { "ready" } else { "degraded" },
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        database,
        menu,
        checked_at: Utc::now().to_rfc3339(),
    };
    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(report))
}
