//! Remote PDF fetching

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid PDF URL: {0}")]
    InvalidUrl(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Server returned HTTP {0}")]
    Status(u16),

    #[error("PDF larger than {0} bytes")]
    TooLarge(u64),

    #[error("Network error: {0}")]
    Network(String),
}

/// Retrieves raw PDF bytes
#[async_trait]
pub trait PdfFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError>;
}

/// `reqwest`-backed fetcher with a body size limit
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(max_bytes: u64) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("arxiver-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self { client, max_bytes })
    }
}

#[async_trait]
impl PdfFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let parsed = parse_pdf_url(url)?;
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout(timeout)
            } else {
                FetchError::Network(e.to_string())
            }
        };

        // The request timeout covers connect plus the whole body read
        let mut response = self
            .client
            .get(parsed)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return Err(FetchError::TooLarge(self.max_bytes));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(map_err)? {
            body.extend_from_slice(&chunk);
            if body.len() as u64 > self.max_bytes {
                return Err(FetchError::TooLarge(self.max_bytes));
            }
        }

        tracing::debug!(url = %url, size = body.len(), "Fetched PDF");
        Ok(body)
    }
}

fn parse_pdf_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(FetchError::InvalidUrl(url.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn fixture_server() -> Router {
        Router::new()
            .route("/pdf/ok", get(|| async { b"%PDF-1.4 fake".to_vec() }))
            .route("/pdf/big", get(|| async { vec![0u8; 4096] }))
            .route("/pdf/missing", get(|| async { StatusCode::NOT_FOUND }))
            .route(
                "/pdf/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    b"late".to_vec()
                }),
            )
    }

    #[test]
    fn test_rejects_non_http_urls() {
        assert!(matches!(parse_pdf_url("ftp://arxiv.org/x.pdf"), Err(FetchError::InvalidUrl(_))));
        assert!(matches!(parse_pdf_url("not a url"), Err(FetchError::InvalidUrl(_))));
        assert!(parse_pdf_url("https://arxiv.org/pdf/2401.00001v1").is_ok());
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let base = serve(fixture_server()).await;
        let fetcher = HttpFetcher::new(1024).unwrap();

        let body = fetcher
            .fetch(&format!("{}/pdf/ok", base), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(body, b"%PDF-1.4 fake");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let base = serve(fixture_server()).await;
        let fetcher = HttpFetcher::new(1024).unwrap();

        let result = fetcher
            .fetch(&format!("{}/pdf/missing", base), Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(FetchError::Status(404))));
    }

    #[tokio::test]
    async fn test_fetch_enforces_size_limit() {
        let base = serve(fixture_server()).await;
        let fetcher = HttpFetcher::new(1024).unwrap();

        let result = fetcher
            .fetch(&format!("{}/pdf/big", base), Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(FetchError::TooLarge(1024))));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let base = serve(fixture_server()).await;
        let fetcher = HttpFetcher::new(1024).unwrap();

        let started = std::time::Instant::now();
        let result = fetcher
            .fetch(&format!("{}/pdf/slow", base), Duration::from_millis(200))
            .await;
        assert!(matches!(result, Err(FetchError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
