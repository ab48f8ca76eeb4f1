//! Centralized configuration management for the tender ingestion core.
//!
//! Configuration follows a simple hierarchy:
//! 1. Safe defaults (defined as constants)
//! 2. Environment variable overrides (`TENDER_*`)
//! 3. Runtime validation
//!
//! No profile selection is required for the defaults to be safe in any
//! environment; [`Profile`] only adjusts a handful of knobs (pool sizes,
//! whether Store/Queue mocks are preferred) for development and test runs.

pub mod error;

pub use error::{ConfigError, ConfigResult};

use std::time::Duration;

// =============================================================================
// SAFE DEFAULTS
// =============================================================================

const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_NAME: &str = "tender";
const DEFAULT_DB_USER: &str = "tender";
const DEFAULT_DB_PASSWORD: &str = "localdev123";
const DEFAULT_DB_SSL_MODE: &str = "disable";
const DEFAULT_DB_WRITE_POOL_SIZE: u32 = 10;
const DEFAULT_DB_READ_POOL_SIZE: u32 = 20;
const DEFAULT_DB_CONNECT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_DB_IDLE_TIMEOUT_SECONDS: u64 = 600;
const DEFAULT_DB_MAX_LIFETIME_SECONDS: u64 = 1800;
const DEFAULT_AUTO_MIGRATE: bool = true;

const DEFAULT_BLOB_ROOT_DIR: &str = "./data/blob";

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_QUEUE_KEY: &str = "tender:queue";

const DEFAULT_MAX_ARCHIVE_DEPTH: u32 = 3;
const DEFAULT_SUPPORTED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "csv", "txt", "x83", "x84", "x85", "x86", "x89", "d83",
    "d84", "d85", "d86", "d89", "p83", "p84", "p85", "p86", "p89", "gaeb",
];

const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 2_000;
const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 60_000;
const DEFAULT_RATE_LIMIT_FLOOR_MS: u64 = 30_000;

const DEFAULT_WORKER_CONCURRENCY: usize = 3;
const DEFAULT_REAP_INTERVAL_MS: u64 = 30_000;
const DEFAULT_QUIESCENT_IDLE_MS: u64 = 10_000;
const DEFAULT_JOB_TIMEOUT_MS: u64 = 1_800_000;
const DEFAULT_RESERVE_BLOCK_MS: u64 = 5_000;

const DEFAULT_API_HOST: &str = "127.0.0.1";
const DEFAULT_API_PORT: u16 = 3000;
const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 100_000_000;

const DEFAULT_TRACING_LEVEL: &str = "info";

/// Deployment profile. Only affects a handful of defaults; every profile
/// produces a config that is safe to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Local development: small pools, auto-migrate on.
    Development,
    /// Production: larger pools, auto-migrate left to the operator.
    Production,
    /// Test: minimal pools, intended to pair with in-memory Store/Queue/Blob
    /// mocks rather than live Postgres/Redis.
    Test,
}

/// Core configuration for the tender ingestion service.
///
/// All settings have safe defaults and can be overridden via environment
/// variables.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ApplicationConfig {
    /// Durable relational store configuration.
    pub store: StoreConfig,
    /// Content-addressed blob store configuration.
    pub blob: BlobConfig,
    /// Redis-backed job queue configuration.
    pub queue: QueueConfig,
    /// Archive expansion configuration.
    pub expander: ExpanderConfig,
    /// Retry / back-off policy.
    pub retry: RetryConfig,
    /// Worker loop configuration.
    pub worker: WorkerConfig,
    /// HTTP API configuration.
    pub api: ApiConfig,
    /// Logging / tracing configuration.
    pub telemetry: TelemetryConfig,
}

impl ApplicationConfig {
    /// Load configuration from environment variables with safe defaults.
    pub fn from_env() -> Self {
        Self {
            store: StoreConfig::from_env(),
            blob: BlobConfig::from_env(),
            queue: QueueConfig::from_env(),
            expander: ExpanderConfig::from_env(),
            retry: RetryConfig::from_env(),
            worker: WorkerConfig::from_env(),
            api: ApiConfig::from_env(),
            telemetry: TelemetryConfig::from_env(),
        }
    }

    /// Load configuration from the environment, then apply profile-specific
    /// overrides for knobs the profile is allowed to touch.
    pub fn with_profile(profile: Profile) -> Self {
        let mut config = Self::from_env();
        match profile {
            Profile::Development => {
                config.store.auto_migrate = true;
            }
            Profile::Production => {
                config.store.write_pool_size = config.store.write_pool_size.max(10);
            }
            Profile::Test => {
                config.store.write_pool_size = 2;
                config.store.read_pool_size = 2;
                config.store.auto_migrate = true;
                config.worker.worker_concurrency = 1;
            }
        }
        config
    }
}

/// Durable relational store (Batch/WorkItem/Summary/Alert) configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StoreConfig {
    /// Full connection string; if unset, built from the other fields.
    pub url: String,
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Username for authentication.
    pub username: String,
    /// Password for authentication.
    pub password: String,
    /// SSL mode ("disable", "prefer", "require").
    pub ssl_mode: String,
    /// Pool size for the write pool (claims, mark-success/failed).
    pub write_pool_size: u32,
    /// Pool size for the read pool (status, summary, quiescent scans).
    pub read_pool_size: u32,
    /// Connection acquisition timeout, seconds.
    pub connect_timeout_seconds: u64,
    /// Idle connection timeout, seconds.
    pub idle_timeout_seconds: u64,
    /// Maximum connection lifetime, seconds.
    pub max_lifetime_seconds: u64,
    /// Run embedded migrations on startup.
    pub auto_migrate: bool,
}

impl StoreConfig {
    /// Load configuration from environment variables with safe defaults.
    pub fn from_env() -> Self {
        let host =
            std::env::var("TENDER_STORE_HOST").unwrap_or_else(|_| DEFAULT_DB_HOST.to_string());
        let port = std::env::var("TENDER_STORE_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DB_PORT);
        let database =
            std::env::var("TENDER_STORE_NAME").unwrap_or_else(|_| DEFAULT_DB_NAME.to_string());
        let username =
            std::env::var("TENDER_STORE_USER").unwrap_or_else(|_| DEFAULT_DB_USER.to_string());
        let password = std::env::var("TENDER_STORE_PASSWORD").unwrap_or_else(|_| {
            tracing::warn!(
                "using default store password - set TENDER_STORE_PASSWORD in any non-local environment"
            );
            DEFAULT_DB_PASSWORD.to_string()
        });
        let ssl_mode = std::env::var("TENDER_STORE_SSL_MODE")
            .unwrap_or_else(|_| DEFAULT_DB_SSL_MODE.to_string());
        let write_pool_size = std::env::var("TENDER_STORE_WRITE_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DB_WRITE_POOL_SIZE);
        let read_pool_size = std::env::var("TENDER_STORE_READ_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DB_READ_POOL_SIZE);
        let connect_timeout_seconds = std::env::var("TENDER_STORE_CONNECT_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DB_CONNECT_TIMEOUT_SECONDS);
        let idle_timeout_seconds = std::env::var("TENDER_STORE_IDLE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DB_IDLE_TIMEOUT_SECONDS);
        let max_lifetime_seconds = std::env::var("TENDER_STORE_MAX_LIFETIME_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DB_MAX_LIFETIME_SECONDS);
        let auto_migrate = std::env::var("TENDER_STORE_AUTO_MIGRATE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_AUTO_MIGRATE);

        let url = std::env::var("TENDER_STORE_URL").unwrap_or_else(|_| {
            format!("postgresql://{username}:{password}@{host}:{port}/{database}")
        });

        Self {
            url,
            host,
            port,
            database,
            username,
            password,
            ssl_mode,
            write_pool_size,
            read_pool_size,
            connect_timeout_seconds,
            idle_timeout_seconds,
            max_lifetime_seconds,
            auto_migrate,
        }
    }

    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Idle timeout as a [`Duration`].
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    /// Max connection lifetime as a [`Duration`].
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_seconds)
    }
}

/// Blob store configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BlobConfig {
    /// Root directory for the filesystem-backed blob store.
    pub root_dir: String,
}

impl BlobConfig {
    /// Load configuration from environment variables with safe defaults.
    pub fn from_env() -> Self {
        let root_dir = std::env::var("TENDER_BLOB_ROOT_DIR")
            .unwrap_or_else(|_| DEFAULT_BLOB_ROOT_DIR.to_string());
        Self { root_dir }
    }
}

/// Redis-backed job queue configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QueueConfig {
    /// Redis connection URL.
    pub redis_url: String,
    /// Base key name (`Q`); derived keys are `{queue_key}:processing`, etc.
    pub queue_key: String,
    /// Blocking timeout for `Reserve`, milliseconds.
    pub reserve_block_ms: u64,
}

impl QueueConfig {
    /// Load configuration from environment variables with safe defaults.
    pub fn from_env() -> Self {
        let redis_url =
            std::env::var("TENDER_QUEUE_REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string());
        let queue_key =
            std::env::var("TENDER_QUEUE_KEY").unwrap_or_else(|_| DEFAULT_QUEUE_KEY.to_string());
        let reserve_block_ms = std::env::var("TENDER_QUEUE_RESERVE_BLOCK_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RESERVE_BLOCK_MS);
        Self {
            redis_url,
            queue_key,
            reserve_block_ms,
        }
    }
}

/// Archive expansion configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExpanderConfig {
    /// Maximum recursion depth for nested archives.
    pub max_archive_depth: u32,
    /// Lower-cased extensions (without the leading dot) eligible for
    /// work-item creation.
    pub supported_extensions: Vec<String>,
}

impl ExpanderConfig {
    /// Load configuration from environment variables with safe defaults.
    pub fn from_env() -> Self {
        let max_archive_depth = std::env::var("TENDER_EXPANDER_MAX_ARCHIVE_DEPTH")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_ARCHIVE_DEPTH);
        let supported_extensions = std::env::var("TENDER_EXPANDER_SUPPORTED_EXTENSIONS")
            .ok()
            .map(|s| s.split(',').map(|e| e.trim().to_lowercase()).collect())
            .unwrap_or_else(|| {
                DEFAULT_SUPPORTED_EXTENSIONS
                    .iter()
                    .map(|e| (*e).to_string())
                    .collect()
            });
        Self {
            max_archive_depth,
            supported_extensions,
        }
    }

    /// Whether `extension` (without a leading dot, any case) is supported.
    pub fn is_supported(&self, extension: &str) -> bool {
        let lower = extension.to_lowercase();
        self.supported_extensions.iter().any(|e| e == &lower)
    }
}

/// Retry / back-off policy for the Worker's consume loop.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RetryConfig {
    /// Maximum retry attempts before a retryable error becomes terminal.
    pub max_retry_attempts: u32,
    /// Base delay for exponential back-off, milliseconds.
    pub retry_base_delay_ms: u64,
    /// Maximum delay cap for exponential back-off, milliseconds.
    pub retry_max_delay_ms: u64,
    /// Minimum delay floor applied to RATE_LIMIT errors, milliseconds.
    pub rate_limit_floor_ms: u64,
}

impl RetryConfig {
    /// Load configuration from environment variables with safe defaults.
    pub fn from_env() -> Self {
        let max_retry_attempts = std::env::var("TENDER_RETRY_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_RETRY_ATTEMPTS);
        let retry_base_delay_ms = std::env::var("TENDER_RETRY_BASE_DELAY_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS);
        let retry_max_delay_ms = std::env::var("TENDER_RETRY_MAX_DELAY_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RETRY_MAX_DELAY_MS);
        let rate_limit_floor_ms = std::env::var("TENDER_RETRY_RATE_LIMIT_FLOOR_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_FLOOR_MS);
        Self {
            max_retry_attempts,
            retry_base_delay_ms,
            retry_max_delay_ms,
            rate_limit_floor_ms,
        }
    }
}

/// Worker loop configuration: consume concurrency, reap cadence, job timeout.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WorkerConfig {
    /// Number of concurrent consume routines per Worker process.
    pub worker_concurrency: usize,
    /// Reap tick interval, milliseconds.
    pub reap_interval_ms: u64,
    /// How long a batch must sit quiescent before the reaper finalizes it,
    /// milliseconds.
    pub quiescent_idle_ms: u64,
    /// Per-job wallclock timeout, milliseconds.
    pub job_timeout_ms: u64,
}

impl WorkerConfig {
    /// Load configuration from environment variables with safe defaults.
    pub fn from_env() -> Self {
        let worker_concurrency = std::env::var("TENDER_WORKER_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_WORKER_CONCURRENCY);
        let reap_interval_ms = std::env::var("TENDER_WORKER_REAP_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_REAP_INTERVAL_MS);
        let quiescent_idle_ms = std::env::var("TENDER_WORKER_QUIESCENT_IDLE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_QUIESCENT_IDLE_MS);
        let job_timeout_ms = std::env::var("TENDER_WORKER_JOB_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_JOB_TIMEOUT_MS);
        Self {
            worker_concurrency,
            reap_interval_ms,
            quiescent_idle_ms,
            job_timeout_ms,
        }
    }

    /// Reap interval as a [`Duration`].
    pub fn reap_interval(&self) -> Duration {
        Duration::from_millis(self.reap_interval_ms)
    }

    /// Quiescent idle threshold as a [`Duration`].
    pub fn quiescent_idle(&self) -> Duration {
        Duration::from_millis(self.quiescent_idle_ms)
    }

    /// Per-job timeout as a [`Duration`].
    pub fn job_timeout(&self) -> Duration {
        Duration::from_millis(self.job_timeout_ms)
    }
}

/// HTTP API server configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ApiConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Upload reject threshold, bytes.
    pub max_file_size_bytes: u64,
}

impl ApiConfig {
    /// Load configuration from environment variables with safe defaults.
    pub fn from_env() -> Self {
        let host =
            std::env::var("TENDER_API_HOST").unwrap_or_else(|_| DEFAULT_API_HOST.to_string());
        let port = std::env::var("TENDER_API_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_API_PORT);
        let max_file_size_bytes = std::env::var("TENDER_API_MAX_FILE_SIZE_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_FILE_SIZE_BYTES);
        Self {
            host,
            port,
            max_file_size_bytes,
        }
    }

    /// Socket address string for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging / tracing configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetryConfig {
    /// Default `tracing` filter directive, e.g. `"info"`.
    pub tracing_level: String,
}

impl TelemetryConfig {
    /// Load configuration from environment variables with safe defaults.
    pub fn from_env() -> Self {
        let tracing_level = std::env::var("TENDER_TRACING_LEVEL")
            .unwrap_or_else(|_| DEFAULT_TRACING_LEVEL.to_string());
        Self { tracing_level }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_config_defaults_build_a_url() {
        let config = StoreConfig {
            url: String::new(),
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            database: DEFAULT_DB_NAME.to_string(),
            username: DEFAULT_DB_USER.to_string(),
            password: DEFAULT_DB_PASSWORD.to_string(),
            ssl_mode: DEFAULT_DB_SSL_MODE.to_string(),
            write_pool_size: DEFAULT_DB_WRITE_POOL_SIZE,
            read_pool_size: DEFAULT_DB_READ_POOL_SIZE,
            connect_timeout_seconds: DEFAULT_DB_CONNECT_TIMEOUT_SECONDS,
            idle_timeout_seconds: DEFAULT_DB_IDLE_TIMEOUT_SECONDS,
            max_lifetime_seconds: DEFAULT_DB_MAX_LIFETIME_SECONDS,
            auto_migrate: DEFAULT_AUTO_MIGRATE,
        };
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn expander_config_matches_case_insensitively() {
        let config = ExpanderConfig {
            max_archive_depth: 3,
            supported_extensions: vec!["pdf".to_string(), "gaeb".to_string()],
        };
        assert!(config.is_supported("PDF"));
        assert!(config.is_supported("gaeb"));
        assert!(!config.is_supported("exe"));
    }

    #[test]
    fn retry_config_defaults_match_spec() {
        let config = RetryConfig {
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            retry_max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
            rate_limit_floor_ms: DEFAULT_RATE_LIMIT_FLOOR_MS,
        };
        assert_eq!(config.max_retry_attempts, 3);
        assert_eq!(config.retry_base_delay_ms, 2_000);
        assert_eq!(config.retry_max_delay_ms, 60_000);
    }

    #[test]
    fn api_config_bind_address_combines_host_and_port() {
        let config = ApiConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
        };
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }
}
