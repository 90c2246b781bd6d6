pub mod health;
pub mod portfolio;

use crate::config::Config;
use crate::domain::TokenRegistry;
use crate::orchestration::Orchestrator;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub registry: Arc<TokenRegistry>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(config: Config, registry: Arc<TokenRegistry>, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            config,
            registry,
            orchestrator,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/portfolio", get(portfolio::get_portfolio))
        .layer(cors)
        .with_state(state)
}
