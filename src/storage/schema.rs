//! Database schema definitions
//!
//! The checkpoint database holds exactly one snapshot at a time. Every save
//! replaces all rows inside a single transaction.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Metadata for the stored snapshot (at most one row)
CREATE TABLE IF NOT EXISTS checkpoints (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    saved_at TEXT NOT NULL,
    config_hash TEXT,
    schema_version INTEGER NOT NULL
);

-- Every URL known to the frontier
CREATE TABLE IF NOT EXISTS urls (
    url TEXT PRIMARY KEY,
    priority INTEGER NOT NULL,
    status TEXT NOT NULL,
    outfit_urls TEXT NOT NULL DEFAULT '[]',
    entity_id TEXT
);

CREATE INDEX IF NOT EXISTS idx_urls_status ON urls(status);

-- Extracted products; set-valued columns are JSON arrays/objects
CREATE TABLE IF NOT EXISTS entities (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    classification TEXT NOT NULL,
    prices TEXT NOT NULL DEFAULT '[]',
    color TEXT,
    description TEXT NOT NULL,
    attributes TEXT NOT NULL DEFAULT '{}',
    image_urls TEXT NOT NULL DEFAULT '[]',
    url TEXT NOT NULL,
    related_ids TEXT NOT NULL DEFAULT '[]'
);

-- Listing page counts per classification
CREATE TABLE IF NOT EXISTS buckets (
    classification TEXT PRIMARY KEY,
    count INTEGER NOT NULL,
    items INTEGER NOT NULL DEFAULT 0
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Gets the current schema version
///
/// Stored with each checkpoint row.
pub fn get_schema_version() -> u32 {
    1
}
