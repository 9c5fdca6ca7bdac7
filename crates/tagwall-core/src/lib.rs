//! tagwall-core: listing enrichment pipeline, storage traits, and in-memory store

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use time::OffsetDateTime;

pub mod adapter;
pub mod cache;
pub mod config;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod item;
pub mod listing;
pub mod pagination;
pub mod queue;
pub mod selection;
pub mod session;
pub mod tags;

pub use adapter::{ExtractedMetadata, NoopPresenter, PageAdapter, Presenter, RawDocument};
pub use cache::{CacheEntry, CacheStats, Clock, MetadataCache, SystemClock};
pub use config::WallConfig;
pub use enrich::{EnrichReport, Enricher};
pub use error::{FetchError, QueueError, WallError};
pub use filter::FilterEngine;
pub use item::{
    item_id_from_url, normalize_resource_id, ContextKey, Item, ListingQuery, QuerySignature,
    RawItem,
};
pub use listing::Listing;
pub use pagination::{
    AutoFiller, FillEvent, FillLimits, FillReport, FillState, PaginationContext, StopReason,
};
pub use queue::{TaskHandle, TaskQueue};
pub use selection::{FilterSelection, SelectionStore};
pub use session::Wall;
pub use tags::{NormalizedTagSet, TagLearningStore};

/// Logical tables of the persisted layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    FilterSelection,
    TagBank,
    MetadataCache,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::FilterSelection => "filter-selection",
            Namespace::TagBank => "tag-bank",
            Namespace::MetadataCache => "metadata-cache",
        }
    }
}

pub trait Store: Send + Sync {
    fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }
    fn get(&self, ns: Namespace, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, ns: Namespace, key: &str, value: &str) -> anyhow::Result<()>;
    /// Returns whether a row was removed.
    fn delete(&self, ns: Namespace, key: &str) -> anyhow::Result<bool>;
    /// All `(key, value)` pairs of a namespace, ordered by key.
    fn scan(&self, ns: Namespace) -> anyhow::Result<Vec<(String, String)>>;
}

/// In-memory store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<HashMap<(Namespace, String), String>>,
    writes: Mutex<u64>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls served so far.
    pub fn write_count(&self) -> u64 {
        *self.writes.lock().expect("poisoned")
    }
}

impl Store for MemStore {
    fn get(&self, ns: Namespace, key: &str) -> anyhow::Result<Option<String>> {
        let m = self.inner.read().expect("poisoned");
        Ok(m.get(&(ns, key.to_string())).cloned())
    }

    fn set(&self, ns: Namespace, key: &str, value: &str) -> anyhow::Result<()> {
        let mut m = self.inner.write().expect("poisoned");
        m.insert((ns, key.to_string()), value.to_string());
        *self.writes.lock().expect("poisoned") += 1;
        Ok(())
    }

    fn delete(&self, ns: Namespace, key: &str) -> anyhow::Result<bool> {
        let mut m = self.inner.write().expect("poisoned");
        Ok(m.remove(&(ns, key.to_string())).is_some())
    }

    fn scan(&self, ns: Namespace) -> anyhow::Result<Vec<(String, String)>> {
        let m = self.inner.read().expect("poisoned");
        let mut out: Vec<(String, String)> = m
            .iter()
            .filter(|((n, _), _)| *n == ns)
            .map(|((_, k), v)| (k.clone(), v.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}

#[cfg(feature = "sqlite")]
mod sqlite_store {
    use super::*;
    use include_dir::{include_dir, Dir};
    use rusqlite::{params, Connection, OptionalExtension};
    use std::path::{Path, PathBuf};

    static MIGRATIONS: Dir = include_dir!("$CARGO_MANIFEST_DIR/migrations");

    pub struct SqliteStore {
        path: PathBuf,
        conn: Mutex<Connection>,
    }

    impl SqliteStore {
        pub fn new<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
            Self::new_with(path, true)
        }

        pub fn new_with<P: AsRef<Path>>(path: P, auto_migrate: bool) -> anyhow::Result<Self> {
            let path = path.as_ref().to_path_buf();
            let conn = Connection::open(&path)?;
            let _ = conn.pragma_update(None, "journal_mode", "WAL");
            let _ = conn.busy_timeout(std::time::Duration::from_millis(5000));
            let store = Self {
                path,
                conn: Mutex::new(conn),
            };
            {
                let conn = store.conn.lock().expect("poisoned");
                store.run_migrations(&conn, auto_migrate)?;
            }
            Ok(store)
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        fn migration_files() -> Vec<&'static include_dir::File<'static>> {
            let mut files: Vec<_> = MIGRATIONS
                .files()
                .filter(|f| f.path().extension().map(|e| e == "sql").unwrap_or(false))
                .collect();
            files.sort_by_key(|f| f.path().to_path_buf());
            files
        }

        fn file_version(file: &include_dir::File<'_>) -> i64 {
            file.path()
                .file_stem()
                .and_then(|s| super::parse_version_prefix(&s.to_string_lossy()))
                .unwrap_or(0) as i64
        }

        fn run_migrations(&self, conn: &Connection, auto: bool) -> anyhow::Result<()> {
            let current: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
            for file in Self::migration_files() {
                let ver = Self::file_version(file);
                if ver <= current {
                    continue;
                }
                // Without auto-migrate a fresh database only gets the base schema.
                if current == 0 && !auto && ver > 1 {
                    break;
                }
                let sql = file.contents_utf8().ok_or_else(|| {
                    anyhow::anyhow!("invalid utf-8 in migration {}", file.path().display())
                })?;
                let tx = conn.unchecked_transaction()?;
                tx.execute_batch(sql)?;
                tx.execute(&format!("PRAGMA user_version = {}", ver), [])?;
                tx.commit()?;
                tracing::debug!(version = ver, "applied migration");
            }
            Ok(())
        }

        pub fn migrate_all(&self) -> anyhow::Result<()> {
            let conn = self.conn.lock().expect("poisoned");
            self.run_migrations(&conn, true)
        }

        pub fn migration_status(&self) -> anyhow::Result<MigrationStatus> {
            let conn = self.conn.lock().expect("poisoned");
            let current: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
            let files = Self::migration_files();
            let latest = files.last().map(|f| Self::file_version(f)).unwrap_or(0);
            let pending = files
                .iter()
                .filter(|f| Self::file_version(f) > current)
                .filter_map(|f| Some(f.path().file_name()?.to_string_lossy().to_string()))
                .collect();
            Ok(MigrationStatus {
                current,
                latest,
                pending,
            })
        }
    }

    impl Store for SqliteStore {
        fn get(&self, ns: Namespace, key: &str) -> anyhow::Result<Option<String>> {
            let conn = self.conn.lock().expect("poisoned");
            let v = conn
                .query_row(
                    "SELECT value FROM kv WHERE ns = ? AND key = ?",
                    params![ns.as_str(), key],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(v)
        }

        fn set(&self, ns: Namespace, key: &str, value: &str) -> anyhow::Result<()> {
            let now = OffsetDateTime::now_utc().unix_timestamp();
            let conn = self.conn.lock().expect("poisoned");
            conn.execute(
                "INSERT INTO kv(ns, key, value, updated_at) VALUES(?1, ?2, ?3, ?4)
                 ON CONFLICT(ns, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![ns.as_str(), key, value, now],
            )?;
            Ok(())
        }

        fn delete(&self, ns: Namespace, key: &str) -> anyhow::Result<bool> {
            let conn = self.conn.lock().expect("poisoned");
            let n = conn.execute(
                "DELETE FROM kv WHERE ns = ? AND key = ?",
                params![ns.as_str(), key],
            )?;
            Ok(n > 0)
        }

        fn scan(&self, ns: Namespace) -> anyhow::Result<Vec<(String, String)>> {
            let conn = self.conn.lock().expect("poisoned");
            let mut stmt = conn.prepare("SELECT key, value FROM kv WHERE ns = ? ORDER BY key")?;
            let mut rows = stmt.query([ns.as_str()])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push((row.get(0)?, row.get(1)?));
            }
            Ok(out)
        }
    }

    // Re-export
    pub use SqliteStore as StoreImpl;
}

#[cfg(not(feature = "sqlite"))]
mod sqlite_store {
    pub use super::MemStore as StoreImpl;
}

pub use sqlite_store::StoreImpl;

#[derive(Debug, Clone)]
pub struct MigrationStatus {
    pub current: i64,
    pub latest: i64,
    pub pending: Vec<String>,
}

#[allow(dead_code)]
pub(crate) fn parse_version_prefix(name: &str) -> Option<u32> {
    let digits: String = name.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse::<u32>().ok()
    }
}

pub(crate) fn unix_now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}
