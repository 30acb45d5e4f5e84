//! SQLite persistence.
//!
//! Records are stored as JSON documents next to the columns they are looked
//! up by. The credential secret lives in its own column because the JSON form
//! of a data source redacts it.

use crate::error::{ExchangeError, Result};
use crate::store::{DataSourceStore, FootprintStore, PutOutcome};
use common::model::datasource::{Credentials, DataSource, Endpoint, Secret};
use common::model::footprint::{Footprint, FootprintId};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS data_sources (
    id        TEXT PRIMARY KEY,
    name      TEXT NOT NULL,
    kind      TEXT NOT NULL,
    username  TEXT NOT NULL,
    secret    TEXT NOT NULL,
    endpoints TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS footprints (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    data_source_id TEXT,
    data_id        TEXT NOT NULL,
    version        INTEGER NOT NULL,
    body           TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS footprints_origin
    ON footprints (data_source_id, data_id)
    WHERE data_source_id IS NOT NULL;
";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!("Opened footprint database at {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ExchangeError::internal("database lock poisoned"))
    }
}

struct SourceRow {
    id: String,
    name: String,
    kind: String,
    username: String,
    secret: String,
    endpoints: String,
}

fn source_from_row(row: &Row<'_>) -> rusqlite::Result<SourceRow> {
    Ok(SourceRow {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        username: row.get(3)?,
        secret: row.get(4)?,
        endpoints: row.get(5)?,
    })
}

fn decode_source(row: SourceRow) -> Result<DataSource> {
    Ok(DataSource {
        data_source_id: row.id,
        data_source_name: row.name,
        source_type: serde_json::from_value(serde_json::Value::String(row.kind))?,
        credentials: Credentials {
            username: row.username,
            secret: Secret::new(row.secret),
        },
        endpoints: serde_json::from_str::<Vec<Endpoint>>(&row.endpoints)?,
    })
}

fn footprint_from_row(row: &Row<'_>) -> rusqlite::Result<(FootprintId, String)> {
    Ok((row.get(0)?, row.get(1)?))
}

fn decode_footprint((id, body): (FootprintId, String)) -> Result<Footprint> {
    let mut footprint: Footprint = serde_json::from_str(&body)?;
    footprint.id = Some(id);
    Ok(footprint)
}

fn kind_tag(source: &DataSource) -> Result<String> {
    match serde_json::to_value(source.source_type)? {
        serde_json::Value::String(tag) => Ok(tag),
        other => Err(ExchangeError::internal(format!("unexpected type tag {}", other))),
    }
}

impl DataSourceStore for SqliteStore {
    fn get(&self, id: &str) -> Result<Option<DataSource>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, name, kind, username, secret, endpoints FROM data_sources WHERE id = ?1",
                params![id],
                source_from_row,
            )
            .optional()?;
        row.map(decode_source).transpose()
    }

    fn list(&self) -> Result<Vec<DataSource>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, kind, username, secret, endpoints FROM data_sources ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], source_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(decode_source).collect()
    }

    fn put(&self, source: &DataSource) -> Result<()> {
        let endpoints = serde_json::to_string(&source.endpoints)?;
        let kind = kind_tag(source)?;
        self.conn()?.execute(
            "INSERT OR REPLACE INTO data_sources (id, name, kind, username, secret, endpoints)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                source.data_source_id,
                source.data_source_name,
                kind,
                source.credentials.username,
                source.credentials.secret.expose(),
                endpoints
            ],
        )?;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let removed = self
            .conn()?
            .execute("DELETE FROM data_sources WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}

impl FootprintStore for SqliteStore {
    fn get(&self, id: FootprintId) -> Result<Option<Footprint>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, body FROM footprints WHERE id = ?1",
                params![id],
                footprint_from_row,
            )
            .optional()?;
        row.map(decode_footprint).transpose()
    }

    fn list(&self, data_source_id: Option<&str>) -> Result<Vec<Footprint>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, body FROM footprints
             WHERE ?1 IS NULL OR data_source_id = ?1
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![data_source_id], footprint_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(decode_footprint).collect()
    }

    fn find_by_data_id(&self, data_source_id: &str, data_id: &str) -> Result<Option<Footprint>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, body FROM footprints WHERE data_source_id = ?1 AND data_id = ?2",
                params![data_source_id, data_id],
                footprint_from_row,
            )
            .optional()?;
        row.map(decode_footprint).transpose()
    }

    fn insert(&self, mut footprint: Footprint) -> Result<Footprint> {
        footprint.id = None;
        let body = serde_json::to_string(&footprint)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO footprints (data_source_id, data_id, version, body) VALUES (?1, ?2, ?3, ?4)",
            params![footprint.data_source_id, footprint.data_id, footprint.version, body],
        )?;
        footprint.id = Some(conn.last_insert_rowid());
        Ok(footprint)
    }

    fn update(&self, footprint: &Footprint) -> Result<()> {
        let id = footprint
            .id
            .ok_or_else(|| ExchangeError::validation("footprint has no id"))?;
        let body = serde_json::to_string(footprint)?;
        let changed = self.conn()?.execute(
            "UPDATE footprints SET data_source_id = ?1, data_id = ?2, version = ?3, body = ?4
             WHERE id = ?5",
            params![footprint.data_source_id, footprint.data_id, footprint.version, body, id],
        )?;
        if changed == 0 {
            return Err(ExchangeError::not_found(format!("footprint {}", id)));
        }
        Ok(())
    }

    fn put_if_newer(&self, mut footprint: Footprint) -> Result<PutOutcome> {
        let data_source_id = footprint
            .data_source_id
            .clone()
            .ok_or_else(|| ExchangeError::validation("partner footprint has no dataSourceId"))?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let existing: Option<(FootprintId, u32)> = tx
            .query_row(
                "SELECT id, version FROM footprints WHERE data_source_id = ?1 AND data_id = ?2",
                params![data_source_id, footprint.data_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let outcome = match existing {
            Some((id, stored_version)) if stored_version > footprint.version => {
                return Ok(PutOutcome::Stale { id, stored_version });
            }
            Some((id, _)) => {
                footprint.id = Some(id);
                let body = serde_json::to_string(&footprint)?;
                tx.execute(
                    "UPDATE footprints SET version = ?1, body = ?2 WHERE id = ?3",
                    params![footprint.version, body, id],
                )?;
                PutOutcome::Replaced { id }
            }
            None => {
                footprint.id = None;
                let body = serde_json::to_string(&footprint)?;
                tx.execute(
                    "INSERT INTO footprints (data_source_id, data_id, version, body)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![data_source_id, footprint.data_id, footprint.version, body],
                )?;
                PutOutcome::Inserted {
                    id: tx.last_insert_rowid(),
                }
            }
        };
        tx.commit()?;
        Ok(outcome)
    }

    fn delete(&self, id: FootprintId) -> Result<bool> {
        let removed = self
            .conn()?
            .execute("DELETE FROM footprints WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}
