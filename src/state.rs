//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::arxiv::{ArxivClient, ArxivError};
use crate::auth::Authenticator;
use crate::config::Config;
use crate::pdf::MupdfRenderer;
use crate::storage::SharedStore;
use crate::thumbnail::{FetchError, HttpFetcher, ThumbnailService};

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to initialize PDF fetcher: {0}")]
    Fetcher(#[from] FetchError),

    #[error("Failed to initialize arXiv client: {0}")]
    Arxiv(#[from] ArxivError),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    store: SharedStore,
    db: SqlitePool,
    thumbnails: ThumbnailService,
    arxiv: ArxivClient,
    auth: Authenticator,
}

impl AppState {
    /// Wire the production collaborators from configuration
    pub fn new(config: Config, store: SharedStore, db: SqlitePool) -> Result<Self, StateError> {
        let fetcher = HttpFetcher::new(config.thumbnail.max_pdf_bytes)?;
        let renderer = MupdfRenderer::new(config.thumbnail.render_timeout());
        let thumbnails = ThumbnailService::new(
            Arc::new(fetcher),
            Arc::new(renderer),
            store.clone(),
            config.thumbnail.clone(),
        );
        let arxiv = ArxivClient::new(&config.arxiv)?;

        Ok(Self::from_parts(config, store, db, thumbnails, arxiv))
    }

    /// Assemble state from prebuilt parts
    pub fn from_parts(
        config: Config,
        store: SharedStore,
        db: SqlitePool,
        thumbnails: ThumbnailService,
        arxiv: ArxivClient,
    ) -> Self {
        let auth = Authenticator::new(&config.auth.jwt_secret);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                db,
                thumbnails,
                arxiv,
                auth,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the content store
    pub fn store(&self) -> &SharedStore {
        &self.inner.store
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    pub fn thumbnails(&self) -> &ThumbnailService {
        &self.inner.thumbnails
    }

    pub fn arxiv(&self) -> &ArxivClient {
        &self.inner.arxiv
    }

    pub fn auth(&self) -> &Authenticator {
        &self.inner.auth
    }
}
