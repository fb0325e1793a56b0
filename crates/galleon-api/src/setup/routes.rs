//! Route configuration and setup

use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, post, MethodRouter};
use axum::Router;
use galleon_plugins::basic_auth;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// JSON bodies on these routes are tiny
const MAX_BODY_BYTES: usize = 64 * 1024;

/// URL prefix under which plugin static directories are served
pub const PLUGIN_STATIC_PREFIX: &str = "/plugin_static";

/// Handler for a plugin-registered endpoint
fn plugin_handler(endpoint: &str) -> Option<MethodRouter<Arc<AppState>>> {
    match endpoint {
        basic_auth::EDIT_PASS => Some(post(handlers::basic_auth::change_pass)),
        basic_auth::FORGOT_PASSWORD => Some(post(handlers::basic_auth::forgot_password)),
        basic_auth::VERIFY_FORGOT_PASSWORD => Some(
            get(handlers::basic_auth::verify_forgot_password_form)
                .post(handlers::basic_auth::verify_forgot_password),
        ),
        _ => None,
    }
}

/// Setup all application routes
pub async fn setup_routes(state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let api = state.plugins.api().await;

    let mut router: Router<Arc<AppState>> =
        Router::new().route("/health", get(handlers::health::health_check));

    for route in api.routes() {
        match plugin_handler(&route.endpoint) {
            Some(handler) => {
                tracing::debug!(endpoint = %route.endpoint, path = %route.path, "Mounting plugin route");
                router = router.route(&route.path, handler);
            }
            None => {
                tracing::warn!(endpoint = %route.endpoint, "No handler for plugin route, skipping")
            }
        }
    }

    for dir in api.static_dirs() {
        let mount = format!("{}/{}", PLUGIN_STATIC_PREFIX, dir.name);
        tracing::debug!(mount = %mount, path = %dir.path.display(), "Serving plugin static files");
        router = router.nest_service(&mount, ServeDir::new(&dir.path));
    }

    Ok(router.with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
    ))
}
