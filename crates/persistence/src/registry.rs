//! Resource-type name to model resolution.
//!
//! The [`ModelRegistry`] maps each resource type name to exactly one
//! [`ResourceModel`]. Models are produced by a [`ModelProvider`] on first use
//! and kept for the life of the registry. Concurrent first requests share a
//! single load; a failed load is not remembered and the next request retries.
//!
//! # Example
//!
//! ```
//! use fhirmap_persistence::registry::{BackendSettings, ModelRegistry};
//!
//! # tokio_test_block_on(async {
//! let registry = ModelRegistry::from_settings(BackendSettings::memory());
//! let model = registry.resolve("Patient").await.unwrap();
//! assert_eq!(model.resource_type(), "Patient");
//! assert!(registry.resolve("patient").await.is_err());
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::backends::document::{DocumentModel, DocumentStore};
use crate::core::ResourceModel;
use crate::error::ConfigurationError;

/// Errors raised while resolving a resource type to its model.
#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No model is registered under this name.
    #[error("resource type '{resource_type}' is not registered")]
    NotFound { resource_type: String },

    /// The models could not be loaded.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Produces the models a registry serves.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Builds every model. Called at most once per successful registry load.
    async fn load_models(&self) -> Result<Vec<Arc<dyn ResourceModel>>, ConfigurationError>;
}

/// A process-scoped registry of resource models.
pub struct ModelRegistry {
    provider: Box<dyn ModelProvider>,
    models: OnceCell<HashMap<&'static str, Arc<dyn ResourceModel>>>,
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("loaded", &self.is_loaded())
            .field("models", &self.models.get().map(HashMap::len))
            .finish_non_exhaustive()
    }
}

impl ModelRegistry {
    /// Creates a registry that loads its models from `provider` on first use.
    pub fn new(provider: impl ModelProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            models: OnceCell::new(),
        }
    }

    /// Creates a registry for the backend named in `settings`.
    pub fn from_settings(settings: BackendSettings) -> Self {
        Self::new(ConfiguredModels::new(settings))
    }

    /// Creates a registry over a fixed list of models.
    pub fn with_models(models: Vec<Arc<dyn ResourceModel>>) -> Self {
        Self::new(StaticModels(models))
    }

    /// Returns true once the models have been loaded successfully.
    pub fn is_loaded(&self) -> bool {
        self.models.initialized()
    }

    /// Loads the models if that has not happened yet.
    ///
    /// # Errors
    ///
    /// Returns the provider's [`ConfigurationError`], or
    /// `ConfigurationError::DuplicateModel` when two models claim one name.
    pub async fn load(&self) -> Result<(), ConfigurationError> {
        self.models().await.map(|_| ())
    }

    async fn models(
        &self,
    ) -> Result<&HashMap<&'static str, Arc<dyn ResourceModel>>, ConfigurationError> {
        self.models
            .get_or_try_init(|| async {
                let loaded = self.provider.load_models().await.inspect_err(|e| {
                    warn!(error = %e, "Failed to load resource models");
                })?;

                let mut models = HashMap::with_capacity(loaded.len());
                for model in loaded {
                    let name = model.resource_type();
                    if models.insert(name, model).is_some() {
                        return Err(ConfigurationError::DuplicateModel {
                            resource_type: name.to_string(),
                        });
                    }
                }

                info!(count = models.len(), "Loaded resource models");
                Ok::<_, ConfigurationError>(models)
            })
            .await
    }

    /// Resolves a resource type name to its model.
    ///
    /// Lookup is exact and case-sensitive.
    ///
    /// # Errors
    ///
    /// * `RegistryError::Configuration` - the models could not be loaded
    /// * `RegistryError::NotFound` - no model serves this name
    pub async fn resolve(&self, resource_type: &str) -> Result<Arc<dyn ResourceModel>, RegistryError> {
        let models = self.models().await?;
        match models.get(resource_type) {
            Some(model) => Ok(Arc::clone(model)),
            None => {
                debug!(resource_type, "No model registered");
                Err(RegistryError::NotFound {
                    resource_type: resource_type.to_string(),
                })
            }
        }
    }

    /// Returns the registered resource type names, sorted.
    pub async fn resource_types(&self) -> Result<Vec<&'static str>, ConfigurationError> {
        let mut names: Vec<_> = self.models().await?.keys().copied().collect();
        names.sort_unstable();
        Ok(names)
    }
}

/// A provider over a fixed list of models.
struct StaticModels(Vec<Arc<dyn ResourceModel>>);

#[async_trait]
impl ModelProvider for StaticModels {
    async fn load_models(&self) -> Result<Vec<Arc<dyn ResourceModel>>, ConfigurationError> {
        Ok(self.0.clone())
    }
}

/// Default SQLite database path.
pub const DEFAULT_DATABASE_URL: &str = "fhir.db";

/// Which persistence backend to use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Backend name: `sqlite` or `memory`. Unset is a configuration error.
    pub backend: Option<String>,

    /// SQLite database path, or `:memory:`.
    pub database_url: Option<String>,
}

impl BackendSettings {
    /// Settings for the SQLite backend at `database_url`.
    pub fn sqlite(database_url: impl Into<String>) -> Self {
        Self {
            backend: Some(BackendKind::Sqlite.to_string()),
            database_url: Some(database_url.into()),
        }
    }

    /// Settings for the in-memory document backend.
    pub fn memory() -> Self {
        Self {
            backend: Some(BackendKind::Memory.to_string()),
            database_url: None,
        }
    }

    /// Parses the backend name.
    pub fn kind(&self) -> Result<BackendKind, ConfigurationError> {
        match self.backend.as_deref().map(str::trim) {
            None | Some("") => Err(ConfigurationError::BackendNotConfigured),
            Some(name) => name.parse(),
        }
    }

    /// Returns the SQLite database path, falling back to the default.
    pub fn database_url(&self) -> &str {
        self.database_url
            .as_deref()
            .unwrap_or(DEFAULT_DATABASE_URL)
    }
}

/// Supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Relational storage in SQLite.
    Sqlite,
    /// Process-local document collections.
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(BackendKind::Sqlite),
            "memory" | "document" => Ok(BackendKind::Memory),
            _ => Err(ConfigurationError::UnknownBackend {
                backend: s.to_string(),
            }),
        }
    }
}

/// Loads one model per known resource type for the configured backend.
#[derive(Debug, Clone)]
pub struct ConfiguredModels {
    settings: BackendSettings,
}

impl ConfiguredModels {
    /// Creates a provider for the given settings.
    pub fn new(settings: BackendSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ModelProvider for ConfiguredModels {
    async fn load_models(&self) -> Result<Vec<Arc<dyn ResourceModel>>, ConfigurationError> {
        let kind = self.settings.kind()?;
        info!(backend = %kind, "Initializing persistence backend");

        match kind {
            BackendKind::Memory => {
                let store = Arc::new(DocumentStore::new());
                Ok(DocumentModel::for_catalog(store)
                    .into_iter()
                    .map(|model| Arc::new(model) as Arc<dyn ResourceModel>)
                    .collect())
            }
            BackendKind::Sqlite => self.load_sqlite().await,
        }
    }
}

impl ConfiguredModels {
    #[cfg(feature = "sqlite")]
    async fn load_sqlite(&self) -> Result<Vec<Arc<dyn ResourceModel>>, ConfigurationError> {
        use crate::backends::sqlite::{SqliteBackend, SqliteModel};

        let database_url = self.settings.database_url().to_string();
        let failed = |message: String| ConfigurationError::InitializationFailed {
            backend: BackendKind::Sqlite.to_string(),
            message,
        };

        let opened = tokio::task::spawn_blocking(move || {
            if database_url == ":memory:" {
                SqliteBackend::in_memory()
            } else {
                SqliteBackend::open(&database_url)
            }
        })
        .await
        .map_err(|e| failed(e.to_string()))?;
        let backend = Arc::new(opened.map_err(|e| failed(e.to_string()))?);

        Ok(SqliteModel::for_catalog(backend)
            .into_iter()
            .map(|model| Arc::new(model) as Arc<dyn ResourceModel>)
            .collect())
    }

    #[cfg(not(feature = "sqlite"))]
    async fn load_sqlite(&self) -> Result<Vec<Arc<dyn ResourceModel>>, ConfigurationError> {
        Err(ConfigurationError::BackendDisabled {
            backend: BackendKind::Sqlite.to_string(),
        })
    }
}
