//! HTTP client for the arXiv query API

use std::time::Duration;

use reqwest::Client;

use crate::config::ArxivConfig;

use super::parser::parse_feed;
use super::types::{split_topics, topic_query, ArxivEntry, PageOptions};
use super::ArxivError;

#[derive(Debug, Clone)]
pub struct ArxivClient {
    http: Client,
    base_url: String,
    page_wait: Duration,
}

impl ArxivClient {
    pub fn new(config: &ArxivConfig) -> Result<Self, ArxivError> {
        let http = Client::builder()
            .user_agent(concat!("arxiver-server/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            page_wait: Duration::from_secs_f64(config.page_wait_secs.max(0.0)),
        })
    }

    /// Run a raw arXiv `search_query` (`all:electron`, `au:turing`, ...)
    pub async fn search(
        &self,
        search_query: &str,
        page: &PageOptions,
    ) -> Result<Vec<ArxivEntry>, ArxivError> {
        let mut params: Vec<(&str, String)> = vec![
            ("search_query", search_query.to_string()),
            ("start", page.start.to_string()),
            ("max_results", page.max_results.to_string()),
        ];
        if let Some(sort_by) = page.sort_by {
            params.push(("sortBy", sort_by.as_str().to_string()));
        }
        if let Some(sort_order) = page.sort_order {
            params.push(("sortOrder", sort_order.as_str().to_string()));
        }

        let response = self.http.get(&self.base_url).query(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ArxivError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let entries = parse_feed(&body)?;

        tracing::debug!(
            query = %search_query,
            start = page.start,
            returned = entries.len(),
            "arXiv search complete"
        );
        Ok(entries)
    }

    /// Fetch `total_results` entries in pages of `per_page`, pausing between
    /// requests as the arXiv API terms ask.
    pub async fn search_paged(
        &self,
        search_query: &str,
        total_results: u32,
        per_page: u32,
        page: &PageOptions,
    ) -> Result<Vec<ArxivEntry>, ArxivError> {
        let per_page = per_page.max(1);
        let mut results = Vec::new();
        let mut start = 0;

        while start < total_results {
            let batch = self
                .search(
                    search_query,
                    &PageOptions {
                        start,
                        max_results: per_page,
                        ..*page
                    },
                )
                .await?;
            results.extend(batch);

            start = start.saturating_add(per_page);
            if start < total_results && !self.page_wait.is_zero() {
                tokio::time::sleep(self.page_wait).await;
            }
        }

        Ok(results)
    }

    /// Papers matching any of the topics. No request is made when no topic
    /// survives trimming.
    pub async fn feed_by_topics<S: AsRef<str>>(
        &self,
        topics: &[S],
        page: &PageOptions,
    ) -> Result<Vec<ArxivEntry>, ArxivError> {
        match topic_query(topics) {
            Some(query) => self.search(&query, page).await,
            None => Ok(Vec::new()),
        }
    }

    /// Same as [`feed_by_topics`](Self::feed_by_topics) with a comma separated list
    pub async fn feed_by_topic_string(
        &self,
        topics_csv: &str,
        page: &PageOptions,
    ) -> Result<Vec<ArxivEntry>, ArxivError> {
        self.feed_by_topics(&split_topics(topics_csv), page).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::arxiv::{SortBy, SortOrder, SAMPLE_FEED};
    use axum::{extract::Query, http::StatusCode, routing::get, Router};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    pub(crate) type Recorded = Arc<Mutex<Vec<HashMap<String, String>>>>;

    /// Local stand-in for export.arxiv.org that records query strings
    pub(crate) async fn fixture_api() -> (String, Recorded) {
        let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
        let log = recorded.clone();

        let app = Router::new()
            .route(
                "/api/query",
                get(move |Query(params): Query<HashMap<String, String>>| {
                    let log = log.clone();
                    async move {
                        log.lock().push(params);
                        SAMPLE_FEED
                    }
                }),
            )
            .route("/broken/query", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/api/query", addr), recorded)
    }

    pub(crate) fn client_for(base_url: &str) -> ArxivClient {
        ArxivClient::new(&ArxivConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            page_wait_secs: 0.0,
            max_results: 100,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_search_sends_query_parameters() {
        let (base_url, recorded) = fixture_api().await;
        let client = client_for(&base_url);

        let page = PageOptions {
            start: 5,
            max_results: 2,
            sort_by: Some(SortBy::SubmittedDate),
            sort_order: Some(SortOrder::Descending),
        };
        let entries = client.search("all:electron", &page).await.unwrap();
        assert_eq!(entries.len(), 2);

        let params = recorded.lock()[0].clone();
        assert_eq!(params["search_query"], "all:electron");
        assert_eq!(params["start"], "5");
        assert_eq!(params["max_results"], "2");
        assert_eq!(params["sortBy"], "submittedDate");
        assert_eq!(params["sortOrder"], "descending");
    }

    #[tokio::test]
    async fn test_search_omits_unset_sort() {
        let (base_url, recorded) = fixture_api().await;
        let client = client_for(&base_url);

        client.search("all:x", &PageOptions::default()).await.unwrap();

        let params = recorded.lock()[0].clone();
        assert!(!params.contains_key("sortBy"));
        assert!(!params.contains_key("sortOrder"));
        assert_eq!(params["max_results"], "10");
    }

    #[tokio::test]
    async fn test_feed_by_topics_or_combines() {
        let (base_url, recorded) = fixture_api().await;
        let client = client_for(&base_url);

        client
            .feed_by_topic_string("cs.AI, quantum", &PageOptions::default())
            .await
            .unwrap();

        assert_eq!(recorded.lock()[0]["search_query"], "all:cs.AI OR all:quantum");
    }

    #[tokio::test]
    async fn test_empty_topics_skip_the_request() {
        let (base_url, recorded) = fixture_api().await;
        let client = client_for(&base_url);

        let entries = client
            .feed_by_topics(&[" ", ""], &PageOptions::default())
            .await
            .unwrap();

        assert!(entries.is_empty());
        assert!(recorded.lock().is_empty());
    }

    #[tokio::test]
    async fn test_search_paged_walks_pages() {
        let (base_url, recorded) = fixture_api().await;
        let client = client_for(&base_url);

        let entries = client
            .search_paged("all:electron", 5, 2, &PageOptions::default())
            .await
            .unwrap();

        // Three pages, each answered with the two-entry fixture
        assert_eq!(entries.len(), 6);
        let starts: Vec<String> = recorded.lock().iter().map(|p| p["start"].clone()).collect();
        assert_eq!(starts, vec!["0", "2", "4"]);
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let (base_url, _) = fixture_api().await;
        let client = client_for(&base_url.replace("/api/query", "/broken/query"));

        let result = client.search("all:x", &PageOptions::default()).await;
        assert!(matches!(result, Err(ArxivError::Status(503))));
    }
}
