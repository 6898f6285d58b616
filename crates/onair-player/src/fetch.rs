use std::time::Duration;

use async_trait::async_trait;
use onair_proto::protocol::NowPlaying;
use reqwest::Client;

use crate::error::FetchError;

/// Source of now-playing documents.
#[async_trait]
pub trait NowPlayingSource: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<NowPlaying, FetchError>;
}

#[derive(Clone)]
pub struct HttpNowPlaying {
    client: Client,
}

impl HttpNowPlaying {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NowPlayingSource for HttpNowPlaying {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<NowPlaying, FetchError> {
        let request = async {
            let resp = self.client.get(url).send().await?;
            if !resp.status().is_success() {
                return Err(FetchError::Status(resp.status().as_u16()));
            }
            let body = resp.bytes().await?;
            Ok(serde_json::from_slice::<NowPlaying>(&body)?)
        };
        tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| FetchError::Timeout(timeout))?
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
            .route(
                "/np",
                get(|| async {
                    (
                        [("content-type", "application/json")],
                        r#"{"now_playing":{"song":{"title":"A","artist":"B"},"elapsed":1,"duration":2},"listeners":{"current":4}}"#,
                    )
                }),
            )
            .route("/broken", get(|| async { "not json" }))
            .route("/down", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn fetch_decodes_payload() {
        let base = spawn_server().await;
        let source = HttpNowPlaying::new(Client::new());
        let np = source
            .fetch(&format!("{}/np", base), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(np.listeners.unwrap().current, Some(4));
    }

    #[tokio::test]
    async fn fetch_reports_status_and_decode_errors() {
        let base = spawn_server().await;
        let source = HttpNowPlaying::new(Client::new());
        let err = source
            .fetch(&format!("{}/down", base), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status(503)));

        let err = source
            .fetch(&format!("{}/broken", base), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
