//! Schema setup for the libSQL store.
//!
//! The applied schema version lives in SQLite's `user_version` pragma.
//! Opening a store applies every step above that version, in order.

use libsql::Connection;

use crate::error::StoreError;

/// Schema steps, indexed from version 1. Append only.
const SCHEMA: &[&str] = &[r#"
    CREATE TABLE IF NOT EXISTS kv_store (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
"#];

/// Bring the schema up to date.
pub async fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current = schema_version(conn).await?;

    for (version, sql) in (1..).zip(SCHEMA).skip(current as usize) {
        tracing::info!(version, "Applying schema step");
        conn.execute_batch(&format!("BEGIN;\n{sql}\nPRAGMA user_version = {version};\nCOMMIT;"))
            .await
            .map_err(|e| StoreError::Migration(format!("schema V{version}: {e}")))?;
    }
    Ok(())
}

/// The applied schema version; 0 for a fresh database.
pub(crate) async fn schema_version(conn: &Connection) -> Result<i64, StoreError> {
    let mut rows = conn
        .query("PRAGMA user_version", ())
        .await
        .map_err(|e| StoreError::Migration(format!("read user_version: {e}")))?;

    match rows
        .next()
        .await
        .map_err(|e| StoreError::Migration(format!("read user_version: {e}")))?
    {
        Some(row) => row
            .get::<i64>(0)
            .map_err(|e| StoreError::Migration(format!("parse user_version: {e}"))),
        None => Ok(0),
    }
}
