use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{error, info};

/// A configured language definition: one selectable language/option with a
/// display label and an icon URL. The generated `id` is the stable key that
/// link rows reference, so relabeling a definition never orphans data.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LanguageDefinition {
    pub id: i64,
    pub label: String,
    pub icon_url: String,
    pub sort_order: i64,
}

/// A stored per-post link value for one language definition.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LanguageLink {
    pub id: i64,
    pub post_id: i64,
    pub definition_id: i64,
    pub url: String,
    pub created_at: String,
    pub updated_at: String,
}

/// One entry of a settings-form submission. `id` is present for definitions
/// that already exist; `None` inserts a new one.
#[derive(Debug, Clone)]
pub struct DefinitionUpdate {
    pub id: Option<i64>,
    pub label: String,
    pub icon_url: String,
}

/// Result of replacing the definition list: the new ordered list plus the
/// definitions (and therefore link rows) that were purged.
#[derive(Debug, Clone)]
pub struct ReplaceOutcome {
    pub definitions: Vec<LanguageDefinition>,
    pub removed: Vec<LanguageDefinition>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open the database and create tables. Failures are logged for
    /// operators before being returned.
    pub fn open(database_path: &str) -> StoreResult<Self> {
        let conn = Connection::open(database_path).map_err(|source| {
            error!("failed to open language links database at {database_path}: {source}");
            StoreError::Open {
                path: database_path.to_string(),
                source,
            }
        })?;

        conn.pragma_update(None, "foreign_keys", true)?;

        if let Err(e) = Self::create_tables(&conn) {
            error!("language links table creation failed: {e}");
            return Err(e);
        }
        info!("language links tables ready at {database_path}");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn create_tables(conn: &Connection) -> StoreResult<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS language_definitions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                label TEXT NOT NULL,
                icon_url TEXT NOT NULL DEFAULT '',
                sort_order INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS language_links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id INTEGER NOT NULL,
                definition_id INTEGER NOT NULL REFERENCES language_definitions(id),
                url TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (post_id, definition_id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_language_links_post_id
             ON language_links (post_id)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS options (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    // ==================== Language definitions ====================

    /// All definitions in their configured order.
    pub fn list_definitions(&self) -> StoreResult<Vec<LanguageDefinition>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, label, icon_url, sort_order FROM language_definitions
             ORDER BY sort_order, id",
        )?;

        let definitions = stmt
            .query_map([], |row| {
                Ok(LanguageDefinition {
                    id: row.get(0)?,
                    label: row.get(1)?,
                    icon_url: row.get(2)?,
                    sort_order: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(definitions)
    }

    /// Replace the definition list with `entries`, in order. Definitions
    /// missing from `entries` are deleted together with every link row that
    /// references them, all in one transaction.
    pub fn replace_definitions(&self, entries: &[DefinitionUpdate]) -> StoreResult<ReplaceOutcome> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let existing: Vec<LanguageDefinition> = {
            let mut stmt = tx.prepare(
                "SELECT id, label, icon_url, sort_order FROM language_definitions
                 ORDER BY sort_order, id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(LanguageDefinition {
                        id: row.get(0)?,
                        label: row.get(1)?,
                        icon_url: row.get(2)?,
                        sort_order: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        let existing_ids: HashSet<i64> = existing.iter().map(|d| d.id).collect();

        let mut kept_ids = HashSet::new();
        let mut definitions = Vec::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            let sort_order = index as i64;
            let id = match entry.id {
                Some(id) if existing_ids.contains(&id) => {
                    tx.execute(
                        "UPDATE language_definitions
                         SET label = ?1, icon_url = ?2, sort_order = ?3
                         WHERE id = ?4",
                        params![entry.label, entry.icon_url, sort_order, id],
                    )?;
                    id
                }
                // Unknown or absent id: insert as a new definition.
                _ => {
                    tx.execute(
                        "INSERT INTO language_definitions (label, icon_url, sort_order)
                         VALUES (?1, ?2, ?3)",
                        params![entry.label, entry.icon_url, sort_order],
                    )?;
                    tx.last_insert_rowid()
                }
            };
            kept_ids.insert(id);
            definitions.push(LanguageDefinition {
                id,
                label: entry.label.clone(),
                icon_url: entry.icon_url.clone(),
                sort_order,
            });
        }

        let mut removed = Vec::new();
        for definition in existing {
            if kept_ids.contains(&definition.id) {
                continue;
            }
            // Link rows first: the foreign key forbids dangling references.
            tx.execute(
                "DELETE FROM language_links WHERE definition_id = ?1",
                params![definition.id],
            )?;
            tx.execute(
                "DELETE FROM language_definitions WHERE id = ?1",
                params![definition.id],
            )?;
            removed.push(definition);
        }

        tx.commit()?;
        Ok(ReplaceOutcome {
            definitions,
            removed,
        })
    }

    // ==================== Language links ====================

    /// All link rows for a post, in insertion order.
    pub fn links_for_post(&self, post_id: i64) -> StoreResult<Vec<LanguageLink>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, post_id, definition_id, url, created_at, updated_at
             FROM language_links
             WHERE post_id = ?1
             ORDER BY id",
        )?;

        let links = stmt
            .query_map(params![post_id], |row| {
                Ok(LanguageLink {
                    id: row.get(0)?,
                    post_id: row.get(1)?,
                    definition_id: row.get(2)?,
                    url: row.get(3)?,
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(links)
    }

    /// Insert or update the link for (post, definition) in one statement.
    /// The UNIQUE constraint guarantees at most one row per pair even under
    /// concurrent saves; an update keeps the row's id and created_at.
    pub fn upsert_link(&self, post_id: i64, definition_id: i64, url: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO language_links (post_id, definition_id, url, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT (post_id, definition_id)
             DO UPDATE SET url = excluded.url, updated_at = excluded.updated_at",
            params![post_id, definition_id, url, now],
        )?;

        Ok(())
    }

    /// Remove the link for (post, definition). Returns whether a row existed.
    pub fn delete_link(&self, post_id: i64, definition_id: i64) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute(
            "DELETE FROM language_links WHERE post_id = ?1 AND definition_id = ?2",
            params![post_id, definition_id],
        )?;

        Ok(rows_affected > 0)
    }

    /// Remove every link row for a definition, across all posts. Returns the
    /// number of rows deleted.
    pub fn delete_links_for_definition(&self, definition_id: i64) -> StoreResult<usize> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute(
            "DELETE FROM language_links WHERE definition_id = ?1",
            params![definition_id],
        )?;

        Ok(rows_affected)
    }

    // ==================== Options ====================

    /// Read a value from the key-value configuration surface.
    pub fn option_get(&self, name: &str) -> StoreResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let value = conn
            .query_row(
                "SELECT value FROM options WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value)
    }

    /// Write a value to the key-value configuration surface.
    pub fn option_set(&self, name: &str, value: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO options (name, value) VALUES (?1, ?2)
             ON CONFLICT (name) DO UPDATE SET value = excluded.value",
            params![name, value],
        )?;

        Ok(())
    }
}
