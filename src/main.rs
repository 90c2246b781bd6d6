use lpfolio::datasource::{HttpDataSource, PortfolioSource, PriceSource, SubgraphPriceSource};
use lpfolio::orchestration::Orchestrator;
use lpfolio::{api, config::Config, TokenRegistry};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let registry = match config.token_registry_file.as_deref() {
        Some(path) => match TokenRegistry::from_json_file(path) {
            Ok(registry) => registry,
            Err(e) => {
                eprintln!("Failed to load token registry: {}", e);
                std::process::exit(1);
            }
        },
        None => TokenRegistry::default(),
    };
    let registry = Arc::new(registry);

    if config.tracked_addresses.is_empty() {
        tracing::warn!("No tracked addresses configured, portfolio will be empty");
    }

    let source: Arc<dyn PortfolioSource> =
        Arc::new(HttpDataSource::new(config.positions_api_url.clone()));
    let prices: Arc<dyn PriceSource> =
        Arc::new(SubgraphPriceSource::new(config.subgraph_urls.clone()));
    let orchestrator = Arc::new(Orchestrator::new(
        source,
        prices,
        config.networks.clone(),
        config.tracked_addresses.clone(),
    ));

    tokio::spawn(orchestrator.clone().run(config.refresh_interval));

    // Create router
    let port = config.port;
    let app = api::create_router(api::AppState::new(config, registry, orchestrator));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
