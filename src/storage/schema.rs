//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Campus-Harvest record index.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per acquired page or document
CREATE TABLE IF NOT EXISTS acquired_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    institute_id TEXT NOT NULL,
    actual_url TEXT NOT NULL,
    storage_url TEXT NOT NULL,
    title TEXT NOT NULL,
    status INTEGER NOT NULL,
    file_type TEXT NOT NULL,
    metadata TEXT,
    acquired_at TEXT NOT NULL,
    UNIQUE(institute_id, actual_url)
);

CREATE INDEX IF NOT EXISTS idx_records_institute ON acquired_records(institute_id);
CREATE INDEX IF NOT EXISTS idx_records_file_type ON acquired_records(file_type);

-- Final extracted-field map per institute
CREATE TABLE IF NOT EXISTS extracted_fields (
    institute_id TEXT PRIMARY KEY,
    fields TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["acquired_records", "extracted_fields"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
