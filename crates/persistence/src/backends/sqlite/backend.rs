//! SQLite backend implementation.

use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, Row, params, params_from_iter};
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, ResourceError, StorageError, StorageResult};
use crate::schema::ResourceDefinition;
use crate::search::{CompiledFilter, IndexValue, extract_all};
use crate::types::StoredResource;

use super::query_builder::build_search;
use super::schema;

/// SQLite backend for FHIR resource storage.
///
/// Resources live in one `resources` table keyed by `(resource_type, id)`;
/// extracted search values live in `search_index`. The backend is shared by
/// every [`SqliteModel`](super::SqliteModel) through an `Arc`.
pub struct SqliteBackend {
    pool: Pool<SqliteConnectionManager>,
    config: SqliteBackendConfig,
    is_memory: bool,
}

impl Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("config", &self.config)
            .field("is_memory", &self.is_memory)
            .finish_non_exhaustive()
    }
}

/// Configuration for the SQLite backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteBackendConfig {
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Enable WAL mode for better concurrency.
    #[serde(default = "default_true")]
    pub enable_wal: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for SqliteBackendConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            enable_wal: true,
        }
    }
}

impl SqliteBackend {
    /// Creates a new in-memory SQLite backend with its schema initialized.
    pub fn in_memory() -> StorageResult<Self> {
        let backend = Self::with_config(":memory:", SqliteBackendConfig::default())?;
        backend.init_schema()?;
        Ok(backend)
    }

    /// Opens or creates a file-based SQLite database and initializes its schema.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let backend = Self::with_config(path, SqliteBackendConfig::default())?;
        backend.init_schema()?;
        Ok(backend)
    }

    /// Creates a backend with custom configuration.
    ///
    /// The schema is not touched; call [`init_schema`](Self::init_schema).
    pub fn with_config<P: AsRef<Path>>(
        path: P,
        config: SqliteBackendConfig,
    ) -> StorageResult<Self> {
        let is_memory = path.as_ref().to_string_lossy() == ":memory:";

        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let manager = if is_memory {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path.as_ref())
        }
        .with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")
        });

        // Every in-memory connection is its own database, so the pool must
        // hold exactly one connection and never recycle it.
        let builder = if is_memory {
            Pool::builder()
                .max_size(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            Pool::builder().max_size(config.max_connections)
        };

        let pool = builder
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
            .build(manager)
            .map_err(|e| {
                StorageError::Backend(BackendError::ConnectionFailed {
                    backend_name: "sqlite".to_string(),
                    message: e.to_string(),
                })
            })?;

        let backend = Self {
            pool,
            config,
            is_memory,
        };
        backend.configure_connection()?;

        Ok(backend)
    }

    /// Initialize the database schema.
    pub fn init_schema(&self) -> StorageResult<()> {
        let conn = self.get_connection()?;
        schema::initialize_schema(&conn)
    }

    /// Get a connection from the pool.
    pub(crate) fn get_connection(
        &self,
    ) -> StorageResult<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: "sqlite".to_string(),
                message: e.to_string(),
            })
        })
    }

    fn configure_connection(&self) -> StorageResult<()> {
        if self.config.enable_wal && !self.is_memory {
            let conn = self.get_connection()?;
            // journal_mode returns the resulting mode as a row.
            conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
                .map_err(|e| {
                    StorageError::Backend(BackendError::Internal {
                        backend_name: "sqlite".to_string(),
                        message: format!("Failed to enable WAL mode: {}", e),
                        source: None,
                    })
                })?;
        }
        Ok(())
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.is_memory
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &SqliteBackendConfig {
        &self.config
    }

    /// Checks that a connection can be obtained and used.
    pub fn health_check(&self) -> StorageResult<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    /// Loads one resource by type and id.
    pub fn fetch(&self, resource_type: &str, id: &str) -> StorageResult<Option<StoredResource>> {
        let conn = self.get_connection()?;
        let row = conn
            .query_row(
                "SELECT resource_type, id, version_id, data, created_at, last_updated
                 FROM resources WHERE resource_type = ?1 AND id = ?2",
                params![resource_type, id],
                RawRow::from_row,
            )
            .optional()?;
        row.map(RawRow::into_stored).transpose()
    }

    /// Inserts a new resource and its search index rows in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::AlreadyExists` if the id is taken.
    pub fn insert(
        &self,
        definition: &ResourceDefinition,
        resource: &StoredResource,
    ) -> StorageResult<()> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS (SELECT 1 FROM resources WHERE resource_type = ?1 AND id = ?2)",
            params![resource.resource_type(), resource.id()],
            |row| row.get(0),
        )?;
        if exists {
            return Err(ResourceError::AlreadyExists {
                resource_type: resource.resource_type().to_string(),
                id: resource.id().to_string(),
            }
            .into());
        }

        let data = serde_json::to_string(resource.content())?;
        tx.execute(
            "INSERT INTO resources (resource_type, id, version_id, data, created_at, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                resource.resource_type(),
                resource.id(),
                resource.version_id(),
                data,
                resource.created_at().to_rfc3339(),
                resource.last_modified().to_rfc3339(),
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO search_index
                    (resource_type, resource_id, param_name, value_text, value_lower, value_number)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for extracted in extract_all(definition, resource.content()) {
                let (text, lower, number) = match &extracted.value {
                    IndexValue::Text(text) => (Some(text.as_str()), Some(text.to_lowercase()), None),
                    IndexValue::Number(n) => (None, None, Some(*n)),
                };
                stmt.execute(params![
                    resource.resource_type(),
                    resource.id(),
                    extracted.param_name,
                    text,
                    lower,
                    number,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Returns every resource of a type matching all filters, in insertion order.
    pub fn search(
        &self,
        resource_type: &str,
        filters: &[CompiledFilter],
    ) -> StorageResult<Vec<StoredResource>> {
        let fragment = build_search(resource_type, filters);
        tracing::trace!(sql = %fragment.sql, "Executing search");

        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&fragment.sql)?;
        let rows = stmt
            .query_map(params_from_iter(fragment.params.iter()), RawRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(RawRow::into_stored).collect()
    }
}

/// A `resources` row before its JSON and timestamps are decoded.
struct RawRow {
    resource_type: String,
    id: String,
    version_id: String,
    data: String,
    created_at: String,
    last_updated: String,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            resource_type: row.get(0)?,
            id: row.get(1)?,
            version_id: row.get(2)?,
            data: row.get(3)?,
            created_at: row.get(4)?,
            last_updated: row.get(5)?,
        })
    }

    fn into_stored(self) -> StorageResult<StoredResource> {
        let content = serde_json::from_str(&self.data)?;
        Ok(StoredResource::from_storage(
            self.resource_type,
            self.id,
            self.version_id,
            content,
            parse_timestamp(&self.created_at)?,
            parse_timestamp(&self.last_updated)?,
        ))
    }
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StorageError::Backend(BackendError::SerializationError {
                message: format!("invalid timestamp '{}': {}", value, e),
            })
        })
}
