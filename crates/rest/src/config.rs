//! Server configuration.
//!
//! Every setting can come from a command-line flag, an environment variable,
//! or code.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FHIRMAP_PORT` | 8080 | Server port |
//! | `FHIRMAP_HOST` | 127.0.0.1 | Host to bind |
//! | `FHIRMAP_LOG_LEVEL` | info | Log level |
//! | `FHIRMAP_BACKEND` | (unset) | Persistence backend: `sqlite` or `memory` |
//! | `FHIRMAP_DATABASE_URL` | fhir.db | SQLite database path, or `:memory:` |
//! | `FHIRMAP_DEBUG` | false | Verbose diagnostics on failed creates |
//! | `FHIRMAP_BASE_URL` | http://localhost:8080 | Base URL for Bundle links |
//! | `FHIRMAP_DEFAULT_PAGE_SIZE` | 20 | Page size when `_count` is absent |
//! | `FHIRMAP_MAX_PAGE_SIZE` | 1000 | Upper bound for `_count` |
//! | `FHIRMAP_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `FHIRMAP_MAX_BODY_SIZE` | 10485760 | Max request body (bytes) |
//! | `FHIRMAP_ENABLE_CORS` | true | Enable CORS |
//! | `FHIRMAP_CORS_ORIGINS` | * | Allowed origins |
//!
//! An unset backend does not stop the server from starting; the first
//! request that needs a model fails with a configuration error instead.
//!
//! # Example
//!
//! ```rust
//! use fhirmap_rest::ServerConfig;
//!
//! let config = ServerConfig {
//!     port: 3000,
//!     backend: Some("memory".to_string()),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use clap::Parser;
use fhirmap_persistence::registry::BackendSettings;
use fhirmap_persistence::types::PageLimits;

/// Server configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "fhirmap")]
#[command(about = "FHIR request-to-model adapter server")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "FHIRMAP_PORT", default_value = "8080")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "FHIRMAP_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "FHIRMAP_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Persistence backend (sqlite, memory).
    #[arg(long, env = "FHIRMAP_BACKEND")]
    pub backend: Option<String>,

    /// SQLite database path.
    #[arg(long, env = "FHIRMAP_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Put the full error chain into diagnostics of failed creates.
    #[arg(long, env = "FHIRMAP_DEBUG", default_value = "false")]
    pub debug: bool,

    /// Base URL for the server (used in Bundle links).
    #[arg(long, env = "FHIRMAP_BASE_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Default page size for search results.
    #[arg(long, env = "FHIRMAP_DEFAULT_PAGE_SIZE", default_value = "20")]
    pub default_page_size: usize,

    /// Maximum page size for search results.
    #[arg(long, env = "FHIRMAP_MAX_PAGE_SIZE", default_value = "1000")]
    pub max_page_size: usize,

    /// Request timeout in seconds.
    #[arg(long, env = "FHIRMAP_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Maximum request body size in bytes.
    #[arg(long, env = "FHIRMAP_MAX_BODY_SIZE", default_value = "10485760")]
    pub max_body_size: usize,

    /// Enable CORS.
    #[arg(long, env = "FHIRMAP_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "FHIRMAP_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            backend: None,
            database_url: None,
            debug: false,
            base_url: "http://localhost:8080".to_string(),
            default_page_size: 20,
            max_page_size: 1000,
            request_timeout: 30,
            max_body_size: 10 * 1024 * 1024, // 10MB
            enable_cors: true,
            cors_origins: "*".to_string(),
        }
    }
}

impl ServerConfig {
    /// Creates a new ServerConfig from environment variables.
    pub fn from_env() -> Self {
        Self::try_parse_from(["fhirmap"]).unwrap_or_default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the backend selection handed to the model registry.
    pub fn backend_settings(&self) -> BackendSettings {
        BackendSettings {
            backend: self.backend.clone(),
            database_url: self.database_url.clone(),
        }
    }

    /// Returns the paging bounds applied to searches.
    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_count: self.default_page_size,
            max_count: self.max_page_size,
        }
    }

    /// Validates the configuration and returns errors if any.
    ///
    /// The backend is not checked here.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.max_body_size == 0 {
            errors.push("Max body size cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if self.default_page_size == 0 {
            errors.push("Default page size cannot be 0".to_string());
        }

        if self.default_page_size > self.max_page_size {
            errors.push("Default page size cannot exceed max page size".to_string());
        }

        if url::Url::parse(&self.base_url).is_err() {
            errors.push(format!("Base URL '{}' is not a valid URL", self.base_url));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// Uses the in-memory document backend and small page sizes.
    pub fn for_testing() -> Self {
        Self {
            port: 0,
            host: "127.0.0.1".to_string(),
            log_level: "debug".to_string(),
            backend: Some("memory".to_string()),
            database_url: None,
            debug: false,
            base_url: "http://localhost:8080".to_string(),
            default_page_size: 10,
            max_page_size: 100,
            request_timeout: 5,
            max_body_size: 1024 * 1024,
            enable_cors: false,
            cors_origins: "*".to_string(),
        }
    }
}
