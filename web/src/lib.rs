//! HTTP interface of the cotrainr backend.
//!
//! Hosts the OAuth redirect endpoints, the authenticated integration
//! endpoints, and the database webhook receiver on top of the operations
//! exposed by the `domain` crate.

use axum::http::{header, HeaderValue, Method};
use log::*;
use service::config::Config;
use tower_http::cors::CorsLayer;

use domain::store::Dependencies;

pub(crate) mod controller;
pub(crate) mod error;
pub(crate) mod extractors;
pub mod router;

pub use self::error::{Error, Result};

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub deps: Dependencies,
}

impl AppState {
    pub fn new(config: Config, deps: Dependencies) -> Self {
        Self { config, deps }
    }
}

/// Bind the listener and serve the API until the process is stopped.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let address = format!("{}:{}", interface, app_state.config.port);

    let allowed_origins: Vec<HeaderValue> = app_state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors_layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(allowed_origins);

    let router = router::define_routes(app_state).layer(cors_layer);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Server starting... listening for connections on http://{}", address);

    axum::serve(listener, router).await
}
