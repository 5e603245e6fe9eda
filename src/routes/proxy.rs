//! Same-origin relay for scrape requests
//!
//! `GET /proxy?url=<target>` forwards to the configured upstream site only and hands the
//! body back verbatim with the upstream status.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use reqwest::redirect::Policy;
use serde::Deserialize;
use url::Url;

use crate::{error::AppResult, services::is_allowed_target};

use super::AppState;

/// Headers that make the relayed request look like a regular browser visit
const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "user-agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    ),
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
    ),
    ("accept-language", "en-US,en;q=0.5"),
    ("dnt", "1"),
    ("upgrade-insecure-requests", "1"),
];

const MAX_REDIRECTS: usize = 10;

/// Redirect policy for the relay client: hops stay on the upstream origin
///
/// A redirect elsewhere is not followed; the 3xx is handed back to the caller as is.
pub fn redirect_policy(upstream: Url) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if is_allowed_target(attempt.url(), &upstream) {
            attempt.follow()
        } else {
            tracing::warn!(target = %attempt.url(), "Refusing off-site redirect");
            attempt.stop()
        }
    })
}

#[derive(Debug, Deserialize)]
pub struct RelayParams {
    pub url: Option<String>,
}

pub async fn relay(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RelayParams>,
) -> Response {
    let Some(target) = params.url.filter(|url| !url.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing 'url' parameter").into_response();
    };

    let target = match Url::parse(target.trim()) {
        Ok(url) if is_allowed_target(&url, &state.upstream) => url,
        _ => {
            tracing::warn!(target = %target, "Rejected relay target");
            let message = format!(
                "Only {} URLs allowed",
                state.upstream.host_str().unwrap_or_default()
            );
            return (StatusCode::FORBIDDEN, message).into_response();
        }
    };

    match fetch_upstream(&state, &target).await {
        Ok((status, body)) => {
            tracing::debug!(target = %target, status = %status, "Relayed upstream response");
            (status, [(header::CONTENT_TYPE, "text/html")], body).into_response()
        }
        Err(e) => {
            tracing::error!(target = %target, error = %e, "Relay request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Proxy error: {}", e),
            )
                .into_response()
        }
    }
}

/// Plain `OPTIONS` (no CORS preflight headers) just gets an empty `200`
pub async fn options() -> StatusCode {
    StatusCode::OK
}

async fn fetch_upstream(state: &AppState, target: &Url) -> AppResult<(StatusCode, String)> {
    let mut request = state.relay_client.get(target.as_str());
    for (name, value) in BROWSER_HEADERS {
        request = request.header(*name, *value);
    }

    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    Ok((status, body))
}
