use build_notify::api;
use build_notify::config::{DEFAULT_CONFIG_PATH, load_config};
use build_notify::dispatcher::Dispatcher;
use build_notify::logging::setup_logging;
use build_notify::registry::HandlerRegistry;
use build_notify::transport::HttpTransport;
use build_notify::AppState;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config_path =
        std::env::var("NOTIFY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    // load_config applies env overrides before validating
    let config = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let (log_layer, _log_guard) = match setup_logging(&config.logging) {
        Ok(logging) => logging,
        Err(e) => {
            eprintln!("Logging error: {}", e);
            std::process::exit(1);
        }
    };

    let transport = match HttpTransport::new(&config.http) {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            error!("Could not build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let registry = match HandlerRegistry::from_config(&config, transport) {
        Ok(registry) => registry,
        Err(e) => {
            error!("Could not register handlers: {}", e);
            std::process::exit(1);
        }
    };
    info!("{} handler(s) registered", registry.len());

    let bind_address = config.bind_address().to_string();
    let dispatcher = Dispatcher::new(Arc::new(registry));
    let state = Arc::new(AppState::new(config, dispatcher, log_layer));
    let app = api::router(state);

    info!("Listening on {}", bind_address);
    info!("Using config at {:?}", config_path);
    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Could not bind {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
