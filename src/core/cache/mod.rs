//! SQLite-backed LCA result cache
//!
//! Computed indicator values are stored on a tree of typed items:
//! variant → element types → elements → components, plus final energy and
//! transport items below the variant. Writes mark items outdated; an update
//! run propagates the flag upward and recomputes totals bottom-up.
//!
//! Virtual items are excluded when their parent sums its children. Composite
//! elements are virtual and sum their sub-elements through
//! `composite_item_id` instead, so sub-elements are counted once.
//!
//! The cache is user-local and gitignored; it can always be rebuilt from the
//! model files.

mod aggregate;
mod queries;
mod schema;
mod store;
mod types;

pub use aggregate::derive_leaf_totals;
pub use types::*;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::{IntoDiagnostic, Result};
use rusqlite::{params, Connection};

use crate::core::project::Project;
use crate::core::Config;

/// Cache file location within a workspace
pub const CACHE_FILE: &str = ".elca/cache.db";

/// Current schema version - cache is rebuilt on version mismatch
const SCHEMA_VERSION: i32 = 1;

/// The result cache backed by SQLite
pub struct ResultCache {
    conn: Connection,
    path: Option<PathBuf>,
}

impl ResultCache {
    /// Open or create the cache of a workspace
    pub fn open(project: &Project, config: &Config) -> Result<Self> {
        let cache_path = project.root().join(CACHE_FILE);

        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent).into_diagnostic()?;
        }

        Self::open_path(&cache_path, config.busy_timeout())
    }

    /// Open or create a cache database at an explicit path
    pub fn open_path(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path).into_diagnostic()?;
        conn.busy_timeout(busy_timeout).into_diagnostic()?;

        // WAL lets readers continue while an update holds the write lock
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .into_diagnostic()?;

        Self::with_connection(conn, Some(path.to_path_buf()))
    }

    /// Cache living only in memory (for tests)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().into_diagnostic()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .into_diagnostic()?;
        Self::with_connection(conn, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        let cache = Self { conn, path };

        // No migrations: a version mismatch rebuilds from scratch
        if cache.schema_version() != SCHEMA_VERSION {
            tracing::info!(version = SCHEMA_VERSION, "initializing cache schema");
            cache.reinitialize_schema()?;
        }

        Ok(cache)
    }

    fn schema_version(&self) -> i32 {
        self.conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Run `f` atomically
    ///
    /// The outermost call opens an immediate transaction so concurrent
    /// writers queue on the busy timeout instead of failing mid-way. Nested
    /// calls use a savepoint named `name` and roll back only their own work.
    pub fn atomically<T>(&self, name: &'static str, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let outermost = self.conn.is_autocommit();

        let (begin, commit, rollback) = if outermost {
            (
                "BEGIN IMMEDIATE".to_string(),
                "COMMIT".to_string(),
                "ROLLBACK".to_string(),
            )
        } else {
            (
                format!("SAVEPOINT {}", name),
                format!("RELEASE {}", name),
                format!("ROLLBACK TO {0}; RELEASE {0}", name),
            )
        };

        self.conn.execute_batch(&begin).into_diagnostic()?;

        match f(self) {
            Ok(value) => {
                self.conn.execute_batch(&commit).into_diagnostic()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.conn.execute_batch(&rollback) {
                    tracing::error!(%rollback_err, scope = name, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Get cache statistics
    pub fn statistics(&self) -> Result<CacheStats> {
        let count = |sql: &str| -> Result<usize> {
            self.conn
                .query_row(sql, [], |row| row.get(0))
                .into_diagnostic()
        };

        let total_items = count("SELECT COUNT(*) FROM items")?;
        let outdated_items = count("SELECT COUNT(*) FROM items WHERE is_outdated = 1")?;
        let indicator_values = count("SELECT COUNT(*) FROM indicator_values")?;
        let variants = count("SELECT COUNT(*) FROM project_variants")?;

        let mut by_type = std::collections::BTreeMap::new();
        {
            let mut stmt = self
                .conn
                .prepare("SELECT type, COUNT(*) FROM items GROUP BY type")
                .into_diagnostic()?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, usize>(1)?))
                })
                .into_diagnostic()?;

            for row in rows {
                let (item_type, n) = row.into_diagnostic()?;
                by_type.insert(item_type, n);
            }
        }

        let db_size_bytes = self
            .path
            .as_ref()
            .and_then(|p| fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(CacheStats {
            total_items,
            outdated_items,
            indicator_values,
            variants,
            by_type,
            db_size_bytes,
        })
    }

    /// Execute raw SQL query (read-only)
    pub fn query_raw(&self, sql: &str) -> Result<Vec<Vec<String>>> {
        let mut stmt = self.conn.prepare(sql).into_diagnostic()?;
        if !stmt.readonly() {
            return Err(miette::miette!("only read-only statements are allowed"));
        }
        let column_count = stmt.column_count();

        let rows = stmt
            .query_map([], |row| {
                let mut values = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    let value: String = row
                        .get::<_, rusqlite::types::Value>(i)
                        .map(|v| match v {
                            rusqlite::types::Value::Null => "NULL".to_string(),
                            rusqlite::types::Value::Integer(i) => i.to_string(),
                            rusqlite::types::Value::Real(f) => f.to_string(),
                            rusqlite::types::Value::Text(s) => s,
                            rusqlite::types::Value::Blob(_) => "<blob>".to_string(),
                        })
                        .unwrap_or_default();
                    values.push(value);
                }
                Ok(values)
            })
            .into_diagnostic()?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .into_diagnostic()
    }

    /// Get column names for a query
    pub fn query_columns(&self, sql: &str) -> Result<Vec<String>> {
        let stmt = self.conn.prepare(sql).into_diagnostic()?;
        Ok(stmt.column_names().iter().map(|s| s.to_string()).collect())
    }

    /// Remove all cached results; the next compute starts from scratch
    pub fn clear(&self) -> Result<()> {
        self.atomically("clear", |cache| {
            cache
                .conn
                .execute_batch(
                    r#"
                DELETE FROM items;
                DELETE FROM variant_sources;
                DELETE FROM project_life_cycle_usages;
                DELETE FROM indicators;
                "#,
                )
                .into_diagnostic()
        })
    }

    /// Set `is_outdated` on one item
    fn mark_outdated(&self, item_id: i64) -> Result<()> {
        self.conn
            .execute(
                "UPDATE items SET is_outdated = 1, modified = ?2 WHERE id = ?1",
                params![item_id, now()],
            )
            .into_diagnostic()?;
        Ok(())
    }
}

/// Timestamp stored in `created`/`modified` columns
fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests;
