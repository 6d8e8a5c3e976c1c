//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the SnapshotStore trait.

use crate::graph::Entity;
use crate::state::{AggregateBucket, UrlRecord, UrlStatus};
use crate::storage::schema::{get_schema_version, initialize_schema};
use crate::storage::traits::{SnapshotStore, StorageError, StorageResult};
use crate::storage::{Snapshot, SnapshotRecord};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

/// SQLite checkpoint backend
pub struct SqliteStore {
    conn: Connection,
}

/// Raw entity row before its JSON columns are decoded
struct EntityRow {
    id: String,
    name: String,
    classification: String,
    prices: String,
    color: Option<String>,
    description: String,
    attributes: String,
    image_urls: String,
    url: String,
    related_ids: String,
}

impl SqliteStore {
    /// Opens (or creates) a checkpoint database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Opens an existing checkpoint database without creating or altering it
    ///
    /// Fails if the file does not exist. Saves through this handle fail.
    pub fn open_read_only(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn load_urls(&self) -> StorageResult<Vec<UrlRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url, priority, status, outfit_urls, entity_id FROM urls")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (url, priority, status, outfit_urls, entity_id) in rows {
            let status = UrlStatus::from_db_string(&status).ok_or_else(|| {
                StorageError::Corrupt(format!("Unknown status '{}' for {}", status, url))
            })?;

            records.push(UrlRecord {
                url,
                priority,
                status,
                outfit_urls: serde_json::from_str(&outfit_urls)?,
                entity_id,
            });
        }

        Ok(records)
    }

    fn load_entities(&self) -> StorageResult<Vec<Entity>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, classification, prices, color, description, attributes,
             image_urls, url, related_ids FROM entities",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(EntityRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    classification: row.get(2)?,
                    prices: row.get(3)?,
                    color: row.get(4)?,
                    description: row.get(5)?,
                    attributes: row.get(6)?,
                    image_urls: row.get(7)?,
                    url: row.get(8)?,
                    related_ids: row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut entities = Vec::with_capacity(rows.len());
        for row in rows {
            entities.push(Entity {
                id: row.id,
                name: row.name,
                classification: row.classification,
                prices: serde_json::from_str(&row.prices)?,
                color: row.color,
                description: row.description,
                attributes: serde_json::from_str(&row.attributes)?,
                image_urls: serde_json::from_str(&row.image_urls)?,
                url: row.url,
                related_ids: serde_json::from_str(&row.related_ids)?,
            });
        }

        Ok(entities)
    }

    fn load_buckets(&self) -> StorageResult<Vec<(String, AggregateBucket)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT classification, count, items FROM buckets ORDER BY classification")?;

        let buckets = stmt
            .query_map([], |row| {
                let count: i64 = row.get(1)?;
                let items: i64 = row.get(2)?;
                Ok((
                    row.get::<_, String>(0)?,
                    AggregateBucket {
                        count: count.max(0) as u64,
                        items: items.max(0) as u64,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(buckets)
    }
}

impl SnapshotStore for SqliteStore {
    fn load_snapshot(&self) -> StorageResult<Option<Snapshot>> {
        let header: Option<(String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT saved_at, config_hash FROM checkpoints WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (saved_at, config_hash) = match header {
            Some(header) => header,
            None => return Ok(None),
        };

        let saved_at = DateTime::parse_from_rfc3339(&saved_at)
            .map_err(|e| StorageError::Corrupt(format!("Invalid saved_at '{}': {}", saved_at, e)))?
            .with_timezone(&Utc);

        let mut snapshot = Snapshot {
            saved_at,
            config_hash,
            records: Vec::new(),
        };

        for record in self.load_urls()? {
            snapshot.push(SnapshotRecord::Url(record));
        }
        for entity in self.load_entities()? {
            snapshot.push(SnapshotRecord::Entity(entity));
        }
        for (classification, bucket) in self.load_buckets()? {
            snapshot.push(SnapshotRecord::Bucket {
                classification,
                bucket,
            });
        }

        Ok(Some(snapshot))
    }

    fn save_snapshot(&mut self, snapshot: &Snapshot) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        tx.execute_batch(
            "
            DELETE FROM urls;
            DELETE FROM entities;
            DELETE FROM buckets;
            DELETE FROM checkpoints;
        ",
        )?;

        {
            let mut insert_url = tx.prepare(
                "INSERT INTO urls (url, priority, status, outfit_urls, entity_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            let mut insert_entity = tx.prepare(
                "INSERT INTO entities (id, name, classification, prices, color, description,
                 attributes, image_urls, url, related_ids)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            let mut insert_bucket = tx.prepare(
                "INSERT INTO buckets (classification, count, items) VALUES (?1, ?2, ?3)",
            )?;

            // Each record kind has its own table
            for record in &snapshot.records {
                match record {
                    SnapshotRecord::Url(url) => {
                        insert_url.execute(params![
                            url.url,
                            url.priority,
                            url.status.to_db_string(),
                            serde_json::to_string(&url.outfit_urls)?,
                            url.entity_id,
                        ])?;
                    }
                    SnapshotRecord::Entity(entity) => {
                        insert_entity.execute(params![
                            entity.id,
                            entity.name,
                            entity.classification,
                            serde_json::to_string(&entity.prices)?,
                            entity.color,
                            entity.description,
                            serde_json::to_string(&entity.attributes)?,
                            serde_json::to_string(&entity.image_urls)?,
                            entity.url,
                            serde_json::to_string(&entity.related_ids)?,
                        ])?;
                    }
                    SnapshotRecord::Bucket {
                        classification,
                        bucket,
                    } => {
                        insert_bucket.execute(params![
                            classification,
                            bucket.count as i64,
                            bucket.items as i64,
                        ])?;
                    }
                }
            }
        }

        tx.execute(
            "INSERT INTO checkpoints (id, saved_at, config_hash, schema_version)
             VALUES (1, ?1, ?2, ?3)",
            params![
                snapshot.saved_at.to_rfc3339(),
                snapshot.config_hash,
                get_schema_version(),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }
}
