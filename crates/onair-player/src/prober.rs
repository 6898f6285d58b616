//! Endpoint reachability probes.
//!
//! A probe answers one question: did this URL respond within the timeout?
//! Transport errors, timeouts and (for API probes) non-2xx statuses all map
//! to `false`; nothing escapes as an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str, timeout: Duration) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMethod {
    /// `HEAD`; any response counts. Used for audio streams, which often
    /// answer HEAD with odd statuses but are playable.
    Head,
    /// `GET`; the status must be a success. Used for the JSON API.
    Get,
}

#[derive(Clone)]
pub struct HttpProber {
    client: Client,
    method: ProbeMethod,
}

impl HttpProber {
    pub fn new(client: Client, method: ProbeMethod) -> Self {
        Self { client, method }
    }

    pub fn stream(client: Client) -> Self {
        Self::new(client, ProbeMethod::Head)
    }

    pub fn api(client: Client) -> Self {
        Self::new(client, ProbeMethod::Get)
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str, timeout: Duration) -> bool {
        let request = match self.method {
            ProbeMethod::Head => self.client.head(url),
            ProbeMethod::Get => self.client.get(url),
        };

        match tokio::time::timeout(timeout, request.send()).await {
            Ok(Ok(resp)) => match self.method {
                ProbeMethod::Head => true,
                ProbeMethod::Get => {
                    let ok = resp.status().is_success();
                    if !ok {
                        debug!("probe: {} answered {}", url, resp.status());
                    }
                    ok
                }
            },
            Ok(Err(e)) => {
                debug!("probe: {} unreachable: {}", url, e);
                false
            }
            Err(_) => {
                debug!("probe: {} timed out after {:?}", url, timeout);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    async fn spawn_server() -> String {
        let app = Router::new()
            .route("/ok", get(|| async { "{}" }))
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    "late"
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn head_probe_accepts_any_response() {
        let base = spawn_server().await;
        let prober = HttpProber::stream(Client::new());
        assert!(prober.probe(&format!("{}/ok", base), Duration::from_secs(2)).await);
        assert!(prober.probe(&format!("{}/missing", base), Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn get_probe_requires_success_status() {
        let base = spawn_server().await;
        let prober = HttpProber::api(Client::new());
        assert!(prober.probe(&format!("{}/ok", base), Duration::from_secs(2)).await);
        assert!(!prober.probe(&format!("{}/missing", base), Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn probe_times_out_as_unreachable() {
        let base = spawn_server().await;
        let prober = HttpProber::api(Client::new());
        assert!(
            !prober
                .probe(&format!("{}/slow", base), Duration::from_millis(100))
                .await
        );
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let prober = HttpProber::stream(Client::new());
        assert!(
            !prober
                .probe(&format!("http://{}/radio", addr), Duration::from_secs(1))
                .await
        );
    }
}
