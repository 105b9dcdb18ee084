//! SQLite schema definitions.

use rusqlite::Connection;

use crate::error::{BackendError, StorageError, StorageResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

fn schema_error(context: &str, e: rusqlite::Error) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: "sqlite".to_string(),
        message: format!("{}: {}", context, e),
        source: Some(Box::new(e)),
    })
}

/// Initialize the database schema.
///
/// Safe to call on every start: a database already at the current version
/// is left alone.
pub fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: format!(
                "database schema version {} is newer than supported version {}",
                current_version, SCHEMA_VERSION
            ),
            source: None,
        }));
    }

    Ok(())
}

/// Get the current schema version, 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> StorageResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| schema_error("Failed to create schema_version table", e))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> StorageResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| schema_error("Failed to clear schema_version", e))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| schema_error("Failed to set schema_version", e))?;
    Ok(())
}

fn create_schema_v1(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(SCHEMA_V1)
        .map_err(|e| schema_error("Failed to create schema", e))
}

/// One row per resource; one `search_index` row per extracted search value.
const SCHEMA_V1: &str = "
    CREATE TABLE IF NOT EXISTS resources (
        resource_type TEXT NOT NULL,
        id TEXT NOT NULL,
        version_id TEXT NOT NULL,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL,
        last_updated TEXT NOT NULL,
        PRIMARY KEY (resource_type, id)
    );

    CREATE TABLE IF NOT EXISTS search_index (
        resource_type TEXT NOT NULL,
        resource_id TEXT NOT NULL,
        param_name TEXT NOT NULL,
        value_text TEXT,
        value_lower TEXT,
        value_number REAL,
        FOREIGN KEY (resource_type, resource_id)
            REFERENCES resources (resource_type, id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_search_index_param
        ON search_index (resource_type, param_name, value_lower);

    CREATE INDEX IF NOT EXISTS idx_search_index_resource
        ON search_index (resource_type, resource_id);
";
