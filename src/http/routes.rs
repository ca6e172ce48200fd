//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - empty CLIENT_ORIGIN allows any origin
    let allowed_origins: Vec<HeaderValue> = state
        .config
        .client_origins
        .iter()
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    let allow_origin = if allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed_origins)
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    players: usize,
    connections: usize,
    round: u32,
    phase: &'static str,
    timer: u32,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = &state.arena.stats;

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        players: stats.players(),
        connections: state.hub.len(),
        round: stats.round(),
        phase: stats.phase().as_str(),
        timer: stats.timer(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn health_reports_fresh_arena() {
        let config = Config::from_lookup(|_| None).unwrap();
        let (state, _arena) = AppState::new(config);

        let Json(health) = health_handler(State(state)).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.players, 0);
        assert_eq!(health.connections, 0);
        assert_eq!(health.round, 1);
        assert_eq!(health.phase, "active");
        assert_eq!(health.timer, 60);
    }

    #[tokio::test]
    async fn router_builds_with_origin_list() {
        let config = Config::from_lookup(|key| {
            (key == "CLIENT_ORIGIN").then(|| "http://localhost:5173".to_string())
        })
        .unwrap();
        let (state, _arena) = AppState::new(config);
        let _router = build_router(state);
    }
}
