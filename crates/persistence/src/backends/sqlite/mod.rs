//! SQLite backend implementation.
//!
//! Supports both in-memory databases (great for testing) and file-based
//! databases (for development and small deployments).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fhirmap_persistence::backends::sqlite::{SqliteBackend, SqliteModel};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Open a database file; the schema is created on first use
//! let backend = Arc::new(SqliteBackend::open("./data/fhir.db")?);
//!
//! // One model per resource type, all sharing the backend
//! let models = SqliteModel::for_catalog(backend);
//! assert!(!models.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! -- Main resource table
//! CREATE TABLE resources (
//!     resource_type TEXT NOT NULL,
//!     id TEXT NOT NULL,
//!     version_id TEXT NOT NULL,
//!     data TEXT NOT NULL,  -- JSON data
//!     created_at TEXT NOT NULL,
//!     last_updated TEXT NOT NULL,
//!     PRIMARY KEY (resource_type, id)
//! );
//!
//! -- One row per extracted search value
//! CREATE TABLE search_index (
//!     resource_type TEXT NOT NULL,
//!     resource_id TEXT NOT NULL,
//!     param_name TEXT NOT NULL,
//!     value_text TEXT,
//!     value_lower TEXT,
//!     value_number REAL
//! );
//! ```

mod backend;
mod model;
mod query_builder;
mod schema;

pub use backend::{SqliteBackend, SqliteBackendConfig};
pub use model::SqliteModel;
pub use schema::SCHEMA_VERSION;
