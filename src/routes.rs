//! Router assembly.

use axum::routing::{get, post};
use axum::Router;
use http::header::{InvalidHeaderValue, CONTENT_TYPE};
use http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// CORS policy: one exact origin, or any origin when `None`.
pub fn cors_layer(allow_origin: Option<&str>) -> Result<CorsLayer, InvalidHeaderValue> {
    let origin = match allow_origin {
        Some(o) => AllowOrigin::exact(HeaderValue::from_str(o)?),
        None => AllowOrigin::from(Any),
    };
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]))
}

pub fn create_routes(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/polls", post(handlers::create_poll).get(handlers::list_polls))
        .route("/polls/{id}", get(handlers::get_poll))
        .route("/polls/{id}/votes", post(handlers::cast_vote))
        .route("/users", post(handlers::register_user))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
