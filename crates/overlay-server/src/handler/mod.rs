use std::sync::Arc;

use axum::{Router, routing::get};
use http::{Method, header};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{config::ServerConfig, service::SceneAuthority};

pub mod scene;
pub mod ws;

#[derive(Clone)]
pub struct AppState {
    pub authority: Arc<SceneAuthority>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            authority: Arc::new(SceneAuthority::new(config.history_limit)),
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    // Overlays are usually loaded from a different origin than the API.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::CACHE_CONTROL]);

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    Router::new()
        .route("/api/scene", get(scene::get_scene).put(scene::put_scene))
        .route("/api/presets", get(scene::list_presets))
        .route("/api/presets/{name}", get(scene::get_preset))
        .route("/api/metrics/realtime", get(scene::realtime_metrics))
        .route("/api/config", get(scene::get_config))
        .route("/ws/overlay", get(ws::overlay))
        .route("/ws/moderator", get(ws::moderator))
        .layer(middleware)
        .with_state(state)
}
