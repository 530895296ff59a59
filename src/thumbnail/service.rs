//! Thumbnail orchestration
//!
//! Probe the store by deterministic key, and on a miss run
//! fetch -> render -> upload. The object store is the only cache.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::arxiv::ArxivEntry;
use crate::config::ThumbnailConfig;
use crate::pdf::PageRenderer;
use crate::storage::SharedStore;

use super::error::ThumbnailError;
use super::fetcher::PdfFetcher;
use super::key::ThumbnailKey;
use super::workers::BackgroundPool;

const THUMBNAIL_CONTENT_TYPE: &str = "image/png";

/// How bulk population treats cache misses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailMode {
    /// Generate misses before returning
    Eager,
    /// Return cache hits now, generate misses in the background
    Lazy,
}

#[derive(Debug, Clone)]
pub struct BulkOptions {
    pub mode: ThumbnailMode,
    pub concurrency_limit: usize,
    pub per_item_timeout: Duration,
    pub target_width: u32,
    pub folder: String,
}

impl BulkOptions {
    pub fn from_config(config: &ThumbnailConfig, mode: ThumbnailMode) -> Self {
        Self {
            mode,
            concurrency_limit: config.default_concurrency,
            per_item_timeout: Duration::from_secs(config.default_timeout_secs),
            target_width: config.width,
            folder: config.folder.clone(),
        }
    }
}

/// Thumbnail pipeline shared by every request
#[derive(Clone)]
pub struct ThumbnailService {
    inner: Arc<Inner>,
}

struct Inner {
    fetcher: Arc<dyn PdfFetcher>,
    renderer: Arc<dyn PageRenderer>,
    store: SharedStore,
    config: ThumbnailConfig,
    workers: BackgroundPool,
}

impl ThumbnailService {
    pub fn new(
        fetcher: Arc<dyn PdfFetcher>,
        renderer: Arc<dyn PageRenderer>,
        store: SharedStore,
        config: ThumbnailConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                renderer,
                store,
                config,
                workers: BackgroundPool::new(),
            }),
        }
    }

    pub fn config(&self) -> &ThumbnailConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &SharedStore {
        &self.inner.store
    }

    /// Background batches still running
    pub fn pending_batches(&self) -> usize {
        self.inner.workers.pending()
    }

    /// Public URL of an existing thumbnail, without generating anything
    pub async fn cached_url(&self, key: &ThumbnailKey) -> Result<Option<String>, ThumbnailError> {
        let key = key.as_key();
        if !self.inner.store.file_exists(&key).await? {
            return Ok(None);
        }
        match self.inner.store.resolve_url(&key) {
            Some(url) => Ok(Some(url)),
            None => Err(ThumbnailError::Unresolvable(key)),
        }
    }

    /// Unconditionally fetch, render and upload under `key`
    pub async fn generate(
        &self,
        pdf_url: &str,
        key: &ThumbnailKey,
        target_width: u32,
    ) -> Result<String, ThumbnailError> {
        let pdf = self
            .inner
            .fetcher
            .fetch(pdf_url, self.inner.config.fetch_timeout())
            .await?;

        let image = self
            .inner
            .renderer
            .render_first_page(pdf, target_width)
            .await?;
        let (width, height) = (image.width, image.height);

        let key = key.as_key();
        self.inner
            .store
            .put_object(&key, image.data, THUMBNAIL_CONTENT_TYPE)
            .await?;

        tracing::info!(key = %key, width, height, "Generated thumbnail");

        self.inner
            .store
            .resolve_url(&key)
            .ok_or(ThumbnailError::Unresolvable(key))
    }

    /// URL of the thumbnail for `pdf_url`, generating it on a cache miss.
    ///
    /// Returns `None` for an empty URL or when any step fails.
    pub async fn get_or_create(
        &self,
        pdf_url: &str,
        user_id: i64,
        target_width: u32,
        folder: &str,
    ) -> Option<String> {
        if pdf_url.is_empty() {
            return None;
        }

        let key = ThumbnailKey::new(pdf_url, user_id, folder);
        let result = match self.cached_url(&key).await {
            Ok(Some(url)) => {
                tracing::debug!(key = %key, "Thumbnail cache hit");
                Ok(url)
            }
            Ok(None) => self.generate(pdf_url, &key, target_width).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(user_id, pdf_url = %pdf_url, "Thumbnail generation failed: {}", e);
                None
            }
        }
    }

    /// Delete a cached thumbnail so the next request regenerates it
    pub async fn invalidate(&self, pdf_url: &str, user_id: i64, folder: &str) -> bool {
        if pdf_url.is_empty() {
            return false;
        }
        let key = ThumbnailKey::new(pdf_url, user_id, folder);
        self.inner.store.delete(&key.as_key()).await
    }

    /// Fill `thumbnail_url` on feed entries. Order is preserved and a failed
    /// entry is simply left without a URL.
    pub async fn populate_thumbnails(
        &self,
        entries: Vec<ArxivEntry>,
        user_id: i64,
        options: &BulkOptions,
    ) -> Vec<ArxivEntry> {
        match options.mode {
            ThumbnailMode::Eager => self.populate_eager(entries, user_id, options).await,
            ThumbnailMode::Lazy => self.populate_lazy(entries, user_id, options).await,
        }
    }

    async fn populate_eager(
        &self,
        mut entries: Vec<ArxivEntry>,
        user_id: i64,
        options: &BulkOptions,
    ) -> Vec<ArxivEntry> {
        let semaphore = Semaphore::new(options.concurrency_limit.max(1));

        let mut tasks = Vec::with_capacity(entries.len());
        for entry in &entries {
            tasks.push(self.eager_item(entry.pdf_link(), user_id, options, &semaphore));
        }
        let urls = join_all(tasks).await;

        let produced = assign_urls(&mut entries, urls);
        tracing::debug!(user_id, total = entries.len(), produced, "Eager thumbnail population done");
        entries
    }

    async fn eager_item(
        &self,
        pdf_url: &str,
        user_id: i64,
        options: &BulkOptions,
        semaphore: &Semaphore,
    ) -> Option<String> {
        if pdf_url.is_empty() {
            return None;
        }

        // Probe outside the semaphore so hits never wait behind slow renders
        let key = ThumbnailKey::new(pdf_url, user_id, &options.folder);
        match self.cached_url(&key).await {
            Ok(Some(url)) => return Some(url),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(key = %key, "Thumbnail probe failed: {}", e);
                return None;
            }
        }

        let _permit = semaphore.acquire().await.ok()?;
        match timeout(
            options.per_item_timeout,
            self.generate(pdf_url, &key, options.target_width),
        )
        .await
        {
            Ok(Ok(url)) => Some(url),
            Ok(Err(e)) => {
                tracing::warn!(key = %key, pdf_url = %pdf_url, "Thumbnail generation failed: {}", e);
                None
            }
            Err(_) => {
                tracing::warn!(
                    key = %key,
                    timeout_secs = options.per_item_timeout.as_secs_f64(),
                    "Thumbnail generation timed out"
                );
                None
            }
        }
    }

    async fn populate_lazy(
        &self,
        mut entries: Vec<ArxivEntry>,
        user_id: i64,
        options: &BulkOptions,
    ) -> Vec<ArxivEntry> {
        let mut probes = Vec::with_capacity(entries.len());
        for entry in &entries {
            probes.push(self.probe(entry.pdf_link(), user_id, &options.folder));
        }
        let hits = join_all(probes).await;

        let missing: Vec<String> = entries
            .iter()
            .zip(&hits)
            .filter(|(entry, hit)| hit.is_none() && !entry.pdf_link().is_empty())
            .map(|(entry, _)| entry.pdf_link().to_string())
            .collect();

        assign_urls(&mut entries, hits);

        if !missing.is_empty() {
            self.warm_in_background(missing, user_id, options.clone());
        }
        entries
    }

    async fn probe(&self, pdf_url: &str, user_id: i64, folder: &str) -> Option<String> {
        if pdf_url.is_empty() {
            return None;
        }
        let key = ThumbnailKey::new(pdf_url, user_id, folder);
        match self.cached_url(&key).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(key = %key, "Thumbnail probe failed: {}", e);
                None
            }
        }
    }

    fn warm_in_background(&self, pdf_urls: Vec<String>, user_id: i64, options: BulkOptions) {
        let service = self.clone();
        let requested = pdf_urls.len();

        self.inner.workers.submit(async move {
            let semaphore = Arc::new(Semaphore::new(options.concurrency_limit.max(1)));
            let options = Arc::new(options);

            let tasks: Vec<_> = pdf_urls
                .into_iter()
                .map(|pdf_url| {
                    let (service, options, semaphore) =
                        (service.clone(), options.clone(), semaphore.clone());
                    async move {
                        let _permit = semaphore.acquire().await.ok()?;
                        timeout(
                            options.per_item_timeout,
                            service.get_or_create(
                                &pdf_url,
                                user_id,
                                options.target_width,
                                &options.folder,
                            ),
                        )
                        .await
                        .ok()
                        .flatten()
                    }
                })
                .collect();
            let results = join_all(tasks).await;

            let produced = results.iter().filter(|url| url.is_some()).count();
            tracing::info!(user_id, requested, produced, "Background thumbnail batch finished");
        });

        tracing::debug!(user_id, requested, "Queued background thumbnail batch");
    }

    /// Stop background work, giving running batches up to `grace` to finish
    pub async fn shutdown(&self, grace: Duration) {
        self.inner.workers.shutdown(grace).await;
    }
}

fn assign_urls(entries: &mut [ArxivEntry], urls: Vec<Option<String>>) -> usize {
    let mut produced = 0;
    for (entry, url) in entries.iter_mut().zip(urls) {
        if let Some(url) = url {
            entry.thumbnail_url = Some(url);
            produced += 1;
        }
    }
    produced
}
