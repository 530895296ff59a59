//! Configuration management for Arxiver Server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub arxiv: ArxivConfig,
    pub thumbnail: ThumbnailConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: Option<String>,
    /// Root directory for the `local` provider
    pub local_root: PathBuf,
    /// Base URL under which `local` objects are reachable (see `/files`)
    pub public_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    Minio,
    R2,
    S3,
    B2,
    Synology,
    Local,
}

impl StorageProvider {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "minio" => Ok(StorageProvider::Minio),
            "r2" => Ok(StorageProvider::R2),
            "s3" => Ok(StorageProvider::S3),
            "b2" => Ok(StorageProvider::B2),
            "synology" => Ok(StorageProvider::Synology),
            "local" => Ok(StorageProvider::Local),
            other => Err(ConfigError::Invalid {
                name: "STORAGE_PROVIDER",
                value: other.to_string(),
            }),
        }
    }

    /// Whether this provider talks to an S3-compatible endpoint
    pub fn is_s3_compatible(self) -> bool {
        !matches!(self, StorageProvider::Local)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret used to verify bearer tokens
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArxivConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Pause between pages in `search_paged`, as the arXiv API terms ask
    pub page_wait_secs: f64,
    /// Upper bound accepted for `max_results` on a single request
    pub max_results: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThumbnailConfig {
    /// Pixel width used by feeds and paper creation. Not part of the storage key.
    pub width: u32,
    pub folder: String,
    pub fetch_timeout_secs: u64,
    pub render_timeout_secs: u64,
    pub max_pdf_bytes: u64,
    /// Default fan-out for bulk population
    pub default_concurrency: usize,
    /// Hard ceiling on client-requested fan-out
    pub max_concurrency: usize,
    pub default_timeout_secs: u64,
    /// Hard ceiling on client-requested per-item timeout
    pub max_timeout_secs: u64,
}

impl ThumbnailConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Fallback filter when `RUST_LOG` is not set
    pub default_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            storage: StorageConfig {
                provider: StorageProvider::Local,
                endpoint: "http://localhost:9000".to_string(),
                bucket: "arxiver".to_string(),
                access_key: String::new(),
                secret_key: String::new(),
                region: Some("us-east-1".to_string()),
                local_root: PathBuf::from("./data/objects"),
                public_url: "http://localhost:8000/files".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite:./arxiver.db".to_string(),
            },
            // No usable default: `Authenticator` rejects every token until a secret is set
            auth: AuthConfig {
                jwt_secret: String::new(),
            },
            arxiv: ArxivConfig {
                base_url: "http://export.arxiv.org/api/query".to_string(),
                timeout_secs: 30,
                page_wait_secs: 3.0,
                max_results: 100,
            },
            thumbnail: ThumbnailConfig {
                width: 400,
                folder: "thumbnails".to_string(),
                fetch_timeout_secs: 60,
                render_timeout_secs: 30,
                max_pdf_bytes: 50 * 1024 * 1024,
                default_concurrency: 3,
                max_concurrency: 8,
                default_timeout_secs: 20,
                max_timeout_secs: 120,
            },
            log: LogConfig {
                format: LogFormat::Pretty,
                default_filter: "arxiver_server=debug,tower_http=debug".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let provider = StorageProvider::parse(&var_or("STORAGE_PROVIDER", "local"))?;

        let storage = if provider.is_s3_compatible() {
            StorageConfig {
                provider,
                endpoint: required_any(&["S3_ENDPOINT", "SYNOLOGY_BUCKET_URL"], "S3_ENDPOINT")?
                    .trim_end_matches('/')
                    .to_string(),
                bucket: required_any(&["S3_BUCKET", "SYNOLOGY_BUCKET_NAME"], "S3_BUCKET")?,
                access_key: required_any(&["S3_ACCESS_KEY", "SYNOLOGY_KEY_ID"], "S3_ACCESS_KEY")?,
                secret_key: required_any(
                    &["S3_SECRET_KEY", "SYNOLOGY_MASTER_KEY"],
                    "S3_SECRET_KEY",
                )?,
                region: first_var(&["S3_REGION", "SYNOLOGY_REGION"]),
                local_root: defaults.storage.local_root,
                public_url: defaults.storage.public_url,
            }
        } else {
            StorageConfig {
                provider,
                local_root: env::var("LOCAL_STORAGE_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.local_root),
                public_url: var_or("PUBLIC_FILES_URL", &defaults.storage.public_url)
                    .trim_end_matches('/')
                    .to_string(),
                ..defaults.storage
            }
        };

        let thumbnail = ThumbnailConfig {
            width: parse_var("THUMBNAIL_WIDTH", defaults.thumbnail.width)?,
            folder: var_or("THUMBNAIL_FOLDER", &defaults.thumbnail.folder),
            fetch_timeout_secs: parse_var(
                "THUMBNAIL_FETCH_TIMEOUT_SECS",
                defaults.thumbnail.fetch_timeout_secs,
            )?,
            render_timeout_secs: parse_var(
                "THUMBNAIL_RENDER_TIMEOUT_SECS",
                defaults.thumbnail.render_timeout_secs,
            )?,
            max_pdf_bytes: parse_var("THUMBNAIL_MAX_PDF_BYTES", defaults.thumbnail.max_pdf_bytes)?,
            default_concurrency: defaults.thumbnail.default_concurrency,
            max_concurrency: parse_var(
                "THUMBNAIL_MAX_CONCURRENCY",
                defaults.thumbnail.max_concurrency,
            )?,
            default_timeout_secs: defaults.thumbnail.default_timeout_secs,
            max_timeout_secs: parse_var(
                "THUMBNAIL_MAX_TIMEOUT_SECS",
                defaults.thumbnail.max_timeout_secs,
            )?,
        };
        if thumbnail.width == 0 {
            return Err(ConfigError::Invalid {
                name: "THUMBNAIL_WIDTH",
                value: "0".to_string(),
            });
        }

        Ok(Config {
            server: ServerConfig {
                host: var_or("SERVER_HOST", &defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
            },
            storage,
            database: DatabaseConfig {
                url: var_or("DATABASE_URL", &defaults.database.url),
            },
            auth: AuthConfig {
                jwt_secret: jwt_secret(env::var("JWT_SECRET").ok())?,
            },
            arxiv: ArxivConfig {
                base_url: var_or("ARXIV_BASE_URL", &defaults.arxiv.base_url),
                timeout_secs: parse_var("ARXIV_TIMEOUT_SECS", defaults.arxiv.timeout_secs)?,
                page_wait_secs: parse_var("ARXIV_PAGE_WAIT_SECS", defaults.arxiv.page_wait_secs)?,
                max_results: parse_var("ARXIV_MAX_RESULTS", defaults.arxiv.max_results)?,
            },
            thumbnail,
            log: LogConfig {
                format: match var_or("LOG_FORMAT", "pretty").to_ascii_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    _ => LogFormat::Pretty,
                },
                default_filter: defaults.log.default_filter,
            },
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn jwt_secret(value: Option<String>) -> Result<String, ConfigError> {
    value
        .filter(|secret| !secret.trim().is_empty())
        .ok_or(ConfigError::Missing("JWT_SECRET"))
}

fn first_var(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| env::var(name).ok().filter(|v| !v.is_empty()))
}

fn required_any(names: &[&str], canonical: &'static str) -> Result<String, ConfigError> {
    first_var(names).ok_or(ConfigError::Missing(canonical))
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
