//! Client address extraction.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRef, FromRequestParts};
use axum::Json;
use http::request::Parts;
use http::{HeaderMap, StatusCode};
use serde_json::{json, Value};

use crate::state::AppState;

/// The caller's address, used as its voter identity key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddress(pub String);

impl<S> FromRequestParts<S> for ClientAddress
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        if let Some(address) = forwarded_for(&parts.headers, state.trusted_proxy_hops) {
            return Ok(ClientAddress(address));
        }
        if let Some(ConnectInfo(peer)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            return Ok(ClientAddress(peer.ip().to_string()));
        }
        Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "client address unavailable" })),
        ))
    }
}

/// The `X-Forwarded-For` entry appended by the outermost of `hops` trusted
/// proxies, counted from the right. Entries further left are client supplied
/// and never believed.
fn forwarded_for(headers: &HeaderMap, hops: usize) -> Option<String> {
    if hops == 0 {
        return None;
    }
    let entries: Vec<&str> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .collect();
    let index = entries.len().checked_sub(hops)?;
    Some(entries[index])
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
