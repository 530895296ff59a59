//! In-memory collaborators for pipeline and router tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::config::ThumbnailConfig;
use crate::error::StorageError;
use crate::pdf::{PageRenderer, RenderError, RenderedImage};
use crate::storage::ContentStore;

use super::fetcher::{FetchError, PdfFetcher};
use super::service::ThumbnailService;

pub(crate) const STUB_PNG: &[u8] = b"\x89PNG\r\n\x1a\nstub";

/// Fetcher that counts calls and tracks peak concurrency
#[derive(Default)]
pub(crate) struct StubFetcher {
    delay: Duration,
    failing: HashSet<String>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_on(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PdfFetcher for StubFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(url) {
            return Err(FetchError::Status(500));
        }
        // Carry the URL so renderers can fail per document
        Ok(format!("%PDF-1.4 {}", url).into_bytes())
    }
}

/// Renderer that returns a fixed payload after an optional delay
#[derive(Default)]
pub(crate) struct StubRenderer {
    delay: Duration,
    failing: HashSet<String>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    widths: Mutex<Vec<u32>>,
}

impl StubRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail with a malformed-document error for PDFs fetched from `url`
    pub fn failing_for(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn widths(&self) -> Vec<u32> {
        self.widths.lock().clone()
    }
}

#[async_trait]
impl PageRenderer for StubRenderer {
    async fn render_first_page(
        &self,
        pdf: Vec<u8>,
        target_width: u32,
    ) -> Result<RenderedImage, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.widths.lock().push(target_width);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let source = String::from_utf8_lossy(&pdf);
        if self.failing.iter().any(|url| source.ends_with(url.as_str())) {
            return Err(RenderError::Malformed("stub document".to_string()));
        }
        Ok(RenderedImage {
            data: STUB_PNG.to_vec(),
            width: target_width,
            height: target_width,
        })
    }
}

/// HashMap-backed store resolving to `https://cdn.test/{key}`
#[derive(Default)]
pub(crate) struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    calls: AtomicUsize,
    put_delay: Duration,
    failing_probes: bool,
    failing_puts: bool,
    puts_in_flight: AtomicUsize,
    max_puts_in_flight: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_put_delay(mut self, delay: Duration) -> Self {
        self.put_delay = delay;
        self
    }

    /// Every `file_exists` call fails as if the backend were down
    pub fn failing_probes(mut self) -> Self {
        self.failing_probes = true;
        self
    }

    /// Every `put_object` call fails without storing anything
    pub fn failing_puts(mut self) -> Self {
        self.failing_puts = true;
        self
    }

    pub fn max_puts_in_flight(&self) -> usize {
        self.max_puts_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn insert(&self, key: &str, content: &[u8]) {
        self.objects.lock().insert(key.to_string(), content.to_vec());
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn put_object(
        &self,
        key: &str,
        content: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.puts_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_puts_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.put_delay.is_zero() {
            tokio::time::sleep(self.put_delay).await;
        }
        self.puts_in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_puts {
            return Err(StorageError::Transient(format!("put {}", key)));
        }
        self.objects.lock().insert(key.to_string(), content);
        Ok(())
    }

    async fn file_exists(&self, key: &str) -> Result<bool, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_probes {
            return Err(StorageError::Transient(format!("head {}", key)));
        }
        Ok(self.objects.lock().contains_key(key))
    }

    async fn download(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.objects.lock().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.objects.lock().remove(key);
        true
    }

    fn resolve_url(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }
        Some(format!("https://cdn.test/{}", key))
    }
}

/// Service wired to the given stubs with default thumbnail settings
pub(crate) fn stub_service(
    fetcher: Arc<StubFetcher>,
    renderer: Arc<StubRenderer>,
    store: Arc<MemoryStore>,
) -> ThumbnailService {
    ThumbnailService::new(fetcher, renderer, store, test_config())
}

pub(crate) fn test_config() -> ThumbnailConfig {
    crate::config::Config::default().thumbnail
}
