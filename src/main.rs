use std::sync::Arc;

use log::*;
use service::config::Config;
use service::logging::Logger;

use domain::gateway::identity::HttpIdentityVerifier;
use domain::store::{
    Dependencies, IdentityVerifier, InMemoryCredentialStore, InMemoryDeviceTokenStore,
    InMemoryPreferenceStore, StaticIdentityVerifier,
};
use web::AppState;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = Config::new();
    Logger::init_logger(&config);

    info!(
        "Starting cotrainr backend in {} mode",
        config.runtime_env()
    );

    let verifier: Arc<dyn IdentityVerifier> = match config.identity_base_url() {
        Some(base_url) => {
            let verifier = HttpIdentityVerifier::new(&base_url, config.identity_api_key())
                .map_err(|e| std::io::Error::other(format!("identity verifier setup: {e}")))?;
            Arc::new(verifier)
        }
        None => {
            warn!("No identity verifier configured, using the static development verifier");
            Arc::new(StaticIdentityVerifier::new())
        }
    };

    let deps = Dependencies {
        credentials: Arc::new(InMemoryCredentialStore::new()),
        device_tokens: Arc::new(InMemoryDeviceTokenStore::new()),
        preferences: Arc::new(InMemoryPreferenceStore::new()),
        verifier,
    };

    web::init_server(AppState::new(config, deps)).await
}
