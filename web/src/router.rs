use axum::routing::{get, post};
use axum::Router;

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_rapidoc::RapiDoc;

use crate::controller::{health_check_controller, notification_controller, oauth_controller};
use crate::AppState;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Cotrainr Backend API"
        ),
        paths(
            health_check_controller::health_check,
            oauth_controller::authorize,
            oauth_controller::callback,
            oauth_controller::status,
            notification_controller::notifications_webhook,
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "cotrainr", description = "Credential lifecycle & push delivery API")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Defines the bearer token authentication requirement for gaining access
// to the authenticated API endpoints for OpenAPI.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(oauth_routes(app_state.clone()))
        .merge(integration_routes(app_state.clone()))
        .merge(webhook_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn oauth_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/oauth/zoom/authorize", get(oauth_controller::authorize))
        .route("/oauth/zoom/callback", get(oauth_controller::callback))
        .with_state(app_state)
}

fn integration_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/integrations/zoom/status", get(oauth_controller::status))
        .with_state(app_state)
}

fn webhook_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/webhooks/notifications",
            post(notification_controller::notifications_webhook),
        )
        .with_state(app_state)
}
