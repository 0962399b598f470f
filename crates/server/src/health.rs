use axum::{routing::get, Json, Router};
use serde::Serialize;

pub const SERVICE_MESSAGE: &str = "ProductAI service is running";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", message: SERVICE_MESSAGE })
}
