pub mod api;

use axum::{http::{HeaderValue, Method}, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::docs::ApiDoc;
use crate::websocket::websocket_handler;
use crate::AppState;

pub use api::create_api_routes;

/// Full application router: WebSocket endpoint, REST API and Swagger UI
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = cors_layer(&app_state);

    let ws_routes = Router::<Arc<AppState>>::new()
        .route("/ws", get(websocket_handler))
        .with_state(Arc::clone(&app_state));

    Router::new()
        .merge(ws_routes)
        // Mount API routes
        .nest("/api", create_api_routes(app_state))
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(app_state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = app_state
        .config
        .cors_origin_list()
        .into_iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        if !app_state.config.is_development() {
            warn!("No CORS origins configured outside development, allowing all origins");
        }
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET])
        .allow_headers(Any)
}
