//! Shared application state.

use std::sync::Arc;

use fhirmap_persistence::registry::ModelRegistry;

use crate::config::ServerConfig;
use crate::dispatch::{DispatchOptions, RequestDispatcher};

/// State shared by all handlers.
///
/// Holds the dispatcher, which owns the model registry, and the server
/// configuration. Cloning is cheap.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use fhirmap_persistence::registry::{BackendSettings, ModelRegistry};
/// use fhirmap_rest::{AppState, ServerConfig};
///
/// let registry = Arc::new(ModelRegistry::from_settings(BackendSettings::memory()));
/// let state = AppState::new(registry, ServerConfig::for_testing());
/// assert!(!state.registry().is_loaded());
/// ```
#[derive(Debug, Clone)]
pub struct AppState {
    dispatcher: Arc<RequestDispatcher>,
    config: Arc<ServerConfig>,
}

impl AppState {
    /// Creates the state for a registry and configuration.
    pub fn new(registry: Arc<ModelRegistry>, config: ServerConfig) -> Self {
        let options = DispatchOptions::from(&config);
        Self {
            dispatcher: Arc::new(RequestDispatcher::new(registry, options)),
            config: Arc::new(config),
        }
    }

    /// Returns the request dispatcher.
    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    /// Returns the model registry.
    pub fn registry(&self) -> &ModelRegistry {
        self.dispatcher.registry()
    }

    /// Returns a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
