//! Flat-file item store: one JSON object keyed by hero name.
//!
//! ```json
//! { "Ana": [ { "code": "…", "name": "…", "url": "…", "is_active": true } ] }
//! ```
//!
//! Heroes come back in key order (sorted), skins in file order. Every update
//! rewrites the whole file atomically.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatchError};
use crate::io::atomic_write;
use crate::types::ItemRecord;

use super::ItemStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct JsonSkin {
    code: String,
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    url: String,
    #[serde(default = "default_active")]
    is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    price: Option<i64>,
}

fn default_active() -> bool {
    true
}

type SkinDatabase = BTreeMap<String, Vec<JsonSkin>>;

pub struct JsonFileStore {
    path: PathBuf,
    // Serialises read-modify-write cycles on the file.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<SkinDatabase> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            WatchError::Store(format!("cannot read {}: {e}", self.path.display()))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, db: &SkinDatabase) -> Result<()> {
        let data = serde_json::to_vec_pretty(db)?;
        atomic_write(&self.path, &data)
    }
}

impl ItemStore for JsonFileStore {
    fn list_all(&self) -> Result<Vec<ItemRecord>> {
        let db = self.load()?;
        let records = db
            .into_iter()
            .enumerate()
            .flat_map(|(idx, (hero, skins))| {
                skins.into_iter().map(move |skin| ItemRecord {
                    code: skin.code,
                    display_name: skin.name,
                    // No hero table here; the position in the sorted map stands in.
                    owner_group_id: idx as i64 + 1,
                    owner_group_name: hero.clone(),
                    active: skin.is_active,
                    price: skin.price.unwrap_or(0),
                })
            })
            .collect();
        Ok(records)
    }

    fn update_active_flag(&self, code: &str, active: bool) -> Result<bool> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| WatchError::Store("json store lock poisoned".into()))?;

        let mut db = self.load()?;
        let Some(skin) = db
            .values_mut()
            .flat_map(|skins| skins.iter_mut())
            .find(|skin| skin.code == code)
        else {
            return Ok(false);
        };

        if skin.is_active != active {
            skin.is_active = active;
            self.save(&db)?;
        }
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FIXTURE: &str = r#"{
        "Tracer": [
            { "code": "TRC-PUNK", "name": "Punk", "url": "https://x/TRC-PUNK", "is_active": true }
        ],
        "Ana": [
            { "code": "ANA-WASTE", "name": "Wasteland", "url": "https://x/ANA-WASTE", "is_active": false },
            { "code": "ANA-CAPT", "name": "Captain", "url": "https://x/ANA-CAPT", "is_active": true }
        ]
    }"#;

    fn fixture() -> (TempDir, JsonFileStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skins.json");
        std::fs::write(&path, FIXTURE).unwrap();
        let store = JsonFileStore::new(&path);
        (dir, store)
    }

    #[test]
    fn list_all_sorts_heroes_and_keeps_file_order_within_hero() {
        let (_dir, store) = fixture();
        let codes: Vec<String> = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|r| r.code)
            .collect();
        assert_eq!(codes, vec!["ANA-WASTE", "ANA-CAPT", "TRC-PUNK"]);
    }

    #[test]
    fn update_rewrites_flag_and_preserves_url() {
        let (_dir, store) = fixture();
        assert!(store.update_active_flag("ANA-WASTE", true).unwrap());

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let db: SkinDatabase = serde_json::from_str(&raw).unwrap();
        let skin = db["Ana"].iter().find(|s| s.code == "ANA-WASTE").unwrap();
        assert!(skin.is_active);
        assert_eq!(skin.url, "https://x/ANA-WASTE");
    }

    #[test]
    fn update_unknown_code_returns_false() {
        let (_dir, store) = fixture();
        assert!(!store.update_active_flag("MISSING", true).unwrap());
    }

    #[test]
    fn missing_file_is_a_store_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(&dir.path().join("absent.json"));
        assert!(matches!(store.list_all(), Err(WatchError::Store(_))));
    }

    #[test]
    fn is_active_defaults_to_true() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skins.json");
        std::fs::write(&path, r#"{"Mei":[{"code":"MEI-1","name":"Luna"}]}"#).unwrap();
        let all = JsonFileStore::new(&path).list_all().unwrap();
        assert!(all[0].active);
        assert_eq!(all[0].owner_group_id, 1);
    }
}
