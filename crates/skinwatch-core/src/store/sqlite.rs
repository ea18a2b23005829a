//! Relational item store on SQLite.
//!
//! # Schema
//!
//! ```text
//! hero(id INTEGER PK, name TEXT UNIQUE)
//! skin(id INTEGER PK, id_hero -> hero.id, name, price INTEGER, code TEXT UNIQUE, is_active INTEGER)
//! ```
//!
//! Natural order is `hero.name, skin.name`, with `skin.code` as a tie-break so
//! the snapshot order is fully deterministic.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::error::{Result, WatchError};
use crate::types::ItemRecord;

use super::ItemStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS hero (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL
);
CREATE TABLE IF NOT EXISTS skin (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    id_hero   INTEGER NOT NULL,
    name      TEXT NOT NULL,
    price     INTEGER DEFAULT 0,
    code      TEXT UNIQUE NOT NULL,
    is_active INTEGER DEFAULT 1,
    FOREIGN KEY(id_hero) REFERENCES hero(id)
);
";

// ---------------------------------------------------------------------------
// ImportReport
// ---------------------------------------------------------------------------

/// Counts from [`SqliteItemStore::import`]. Duplicates are skipped, not errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub heroes_seen: usize,
    pub heroes_inserted: usize,
    pub skins_inserted: usize,
    pub skins_skipped: usize,
}

// ---------------------------------------------------------------------------
// SqliteItemStore
// ---------------------------------------------------------------------------

pub struct SqliteItemStore {
    conn: Mutex<Connection>,
}

impl SqliteItemStore {
    /// Open or create the database at `path`, creating tables if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::bootstrap(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| WatchError::Store("sqlite connection lock poisoned".into()))
    }

    /// Copy `records` into this store in a single transaction.
    ///
    /// Heroes are inserted in alphabetical order; skins whose code already
    /// exists are skipped. Prices are not carried over and default to 0.
    pub fn import(&self, records: &[ItemRecord]) -> Result<ImportReport> {
        let mut by_hero: BTreeMap<&str, Vec<&ItemRecord>> = BTreeMap::new();
        for record in records {
            by_hero
                .entry(record.owner_group_name.as_str())
                .or_default()
                .push(record);
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut report = ImportReport {
            heroes_seen: by_hero.len(),
            ..ImportReport::default()
        };

        for (hero, skins) in &by_hero {
            report.heroes_inserted +=
                tx.execute("INSERT OR IGNORE INTO hero (name) VALUES (?1)", params![hero])?;
            let hero_id: i64 =
                tx.query_row("SELECT id FROM hero WHERE name = ?1", params![hero], |row| {
                    row.get(0)
                })?;

            for skin in skins {
                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO skin (id_hero, name, code, price, is_active)
                     VALUES (?1, ?2, ?3, 0, ?4)",
                    params![hero_id, skin.display_name, skin.code, skin.active],
                )?;
                if inserted == 0 {
                    report.skins_skipped += 1;
                } else {
                    report.skins_inserted += 1;
                }
            }
        }

        tx.commit()?;
        Ok(report)
    }

    /// Look up a single record by code.
    pub fn find(&self, code: &str) -> Result<Option<ItemRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                "SELECT skin.code, skin.name, skin.id_hero, hero.name, skin.is_active, skin.price
                 FROM skin JOIN hero ON skin.id_hero = hero.id
                 WHERE skin.code = ?1",
                params![code],
                map_row,
            )
            .optional()?;
        Ok(record)
    }
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ItemRecord> {
    let active: i64 = row.get(4)?;
    Ok(ItemRecord {
        code: row.get(0)?,
        display_name: row.get(1)?,
        owner_group_id: row.get(2)?,
        owner_group_name: row.get(3)?,
        active: active != 0,
        price: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
    })
}

impl ItemStore for SqliteItemStore {
    fn list_all(&self) -> Result<Vec<ItemRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT skin.code, skin.name, skin.id_hero, hero.name, skin.is_active, skin.price
             FROM skin JOIN hero ON skin.id_hero = hero.id
             ORDER BY hero.name, skin.name, skin.code",
        )?;
        let rows = stmt.query_map([], map_row)?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn update_active_flag(&self, code: &str, active: bool) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE skin SET is_active = ?1 WHERE code = ?2",
            params![i64::from(active), code],
        )?;
        Ok(changed > 0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
