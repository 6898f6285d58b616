//! Now-playing proxy.
//!
//! Serves `GET /api/nowplaying`: fetches the configured upstream now-playing
//! URL and streams the body back byte-for-byte as `application/json`, so a
//! browser on another origin can read a broadcast server that sends no CORS
//! headers. CORS itself is added by the router layer.
//!
//! Upstream unreachable, timed out or non-2xx → `502 Bad Gateway`.

use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::StreamExt;
use onair_proto::config::ProxyConfig;
use reqwest::Client;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct ProxyState {
    pub upstream_url: String,
    pub client: Client,
}

impl ProxyState {
    pub fn new(config: &ProxyConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(Duration::from_millis(config.timeout_ms))
            // Self-hosted broadcast servers often run on self-signed certs.
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            upstream_url: config.upstream_url.clone(),
            client,
        })
    }
}

async fn now_playing(State(state): State<ProxyState>) -> Response {
    debug!("proxy: fetching {}", state.upstream_url);

    let upstream = match state.client.get(&state.upstream_url).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!("proxy: upstream {} unreachable: {}", state.upstream_url, e);
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let upstream_status = upstream.status();
    if !upstream_status.is_success() {
        warn!(
            "proxy: upstream {} returned {}",
            state.upstream_url, upstream_status
        );
        return StatusCode::BAD_GATEWAY.into_response();
    }

    let reader = StreamReader::new(
        upstream
            .bytes_stream()
            .map(|result| result.map_err(std::io::Error::other)),
    );
    let body = Body::from_stream(ReaderStream::new(reader));

    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

pub fn routes(state: ProxyState) -> Router {
    Router::new()
        .route("/api/nowplaying", get(now_playing))
        .with_state(state)
}
