//! SQLite-backed persistence for alarm definitions.
//!
//! One row per alarm id. The definition itself is stored as JSON so new
//! optional fields do not need a migration. Rows keep the position they were
//! first inserted at, which is the registry order on load.

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::definition::AlarmDefinition;
use super::registry::AlarmRegistry;
use crate::error::StorageError;
use crate::storage::data_dir;

pub struct AlarmStore {
    conn: Connection,
}

impl AlarmStore {
    /// Open the store at `~/.config/smart-alarm/alarms.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened.
    pub fn open() -> Result<Self, StorageError> {
        let dir = data_dir().map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        Self::open_at(&dir.join("alarms.db"))
    }

    /// Open (or create) a store at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory store.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS alarms (
                id          TEXT PRIMARY KEY,
                position    INTEGER NOT NULL,
                definition  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_alarms_position ON alarms(position);",
        )?;
        Ok(())
    }

    /// Insert or replace a definition. Existing rows keep their position.
    pub fn save(&self, definition: &AlarmDefinition) -> Result<(), StorageError> {
        let json = serde_json::to_string(definition).map_err(|e| StorageError::Corrupt {
            id: definition.id.clone(),
            message: e.to_string(),
        })?;
        self.conn.execute(
            "INSERT INTO alarms (id, position, definition, updated_at)
             VALUES (?1, (SELECT COALESCE(MAX(position), 0) + 1 FROM alarms), ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                definition = excluded.definition,
                updated_at = excluded.updated_at",
            params![definition.id, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Delete a definition. Returns whether a row existed.
    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let changed = self
            .conn
            .execute("DELETE FROM alarms WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn get(&self, id: &str) -> Result<Option<AlarmDefinition>, StorageError> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT definition FROM alarms WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| decode(id, &j)).transpose()
    }

    /// Load every stored alarm in insertion order.
    pub fn load_registry(&self) -> Result<AlarmRegistry, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, definition FROM alarms ORDER BY position ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut definitions = Vec::new();
        for row in rows {
            let (id, json) = row?;
            definitions.push(decode(&id, &json)?);
        }
        Ok(AlarmRegistry::from_definitions(definitions))
    }
}

fn decode(id: &str, json: &str) -> Result<AlarmDefinition, StorageError> {
    serde_json::from_str(json).map_err(|e| StorageError::Corrupt {
        id: id.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::definition::DayName;

    fn alarm(id: &str, time: &str) -> AlarmDefinition {
        AlarmDefinition::weekly(id, "Wake", time.parse().unwrap(), [DayName::Monday, DayName::Friday])
    }

    #[test]
    fn save_and_load_keeps_order() {
        let store = AlarmStore::open_memory().unwrap();
        store.save(&alarm("b", "08:00")).unwrap();
        store.save(&alarm("a", "07:00")).unwrap();

        let reg = store.load_registry().unwrap();
        let ids: Vec<_> = reg.list().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn resave_replaces_definition_but_keeps_position() {
        let store = AlarmStore::open_memory().unwrap();
        store.save(&alarm("1", "07:00")).unwrap();
        store.save(&alarm("2", "08:00")).unwrap();
        store.save(&alarm("1", "06:45")).unwrap();

        let reg = store.load_registry().unwrap();
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.list()[0].id, "1");
        assert_eq!(reg.list()[0].time.to_string(), "06:45");
    }

    #[test]
    fn delete_and_get() {
        let store = AlarmStore::open_memory().unwrap();
        store.save(&alarm("1", "07:00")).unwrap();
        assert!(store.get("1").unwrap().is_some());
        assert!(store.delete("1").unwrap());
        assert!(!store.delete("1").unwrap());
        assert!(store.get("1").unwrap().is_none());
    }

    #[test]
    fn corrupt_row_is_reported() {
        let store = AlarmStore::open_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO alarms (id, position, definition, updated_at) VALUES ('x', 1, '{', '')",
                [],
            )
            .unwrap();
        assert!(matches!(
            store.load_registry(),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[test]
    fn store_on_disk_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alarms.db");
        {
            let store = AlarmStore::open_at(&path).unwrap();
            store.save(&alarm("1", "07:00")).unwrap();
        }
        let store = AlarmStore::open_at(&path).unwrap();
        assert_eq!(store.load_registry().unwrap().len(), 1);
    }
}
