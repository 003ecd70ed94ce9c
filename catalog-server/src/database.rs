use std::path::Path;

use anyhow::{Context, Result};

use crate::config::DatabaseConfig;

#[derive(Clone)]
pub struct Database {
    pub pool: r2d2::Pool<r2d2_sqlite::SqliteConnectionManager>,
}

impl Database {
    pub async fn connect(conf: &DatabaseConfig) -> Result<Self> {
        Self::open(&conf.path).await
    }

    /// Open (creating if needed) the database file at `path` and bring it up to date.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Creating {}", parent.display()))?;
        }
        // Cascading deletes depend on this being set on every connection.
        let manager = r2d2_sqlite::SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = r2d2::Pool::new(manager)?;
        let me = Self { pool };
        me.migrate().await?;
        Ok(me)
    }

    /// Migrate the database to the latest version.
    async fn migrate(&self) -> Result<()> {
        let migrations = [
            include_str!("migrations/01-initial.sql"),
            include_str!("migrations/02-authors.sql"),
        ];
        // Find the current migration version. If it fails, we need to run all the migrations.
        let conn = self.pool.get()?;
        let current_version: String = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = 'schema_version'",
                rusqlite::params![],
                |row| row.get(0),
            )
            .unwrap_or("0".to_string());
        let current_version = current_version.parse::<usize>().unwrap_or(0);
        tracing::info!("Current schema version: {}", current_version);
        for (index, migration) in migrations.iter().enumerate().skip(current_version) {
            tracing::warn!("Applying migration {}", index + 1);
            conn.execute_batch(migration)
                .with_context(|| format!("Applying migration {}", index + 1))?;
        }
        Ok(())
    }

    /// Convenience method to collect rows from a query into a Vec.
    pub fn collect_rows<T: FromRow, P: rusqlite::Params>(
        &self,
        sql: &str,
        parameters: P,
    ) -> Result<Vec<T>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query(parameters)?;
        rows.mapped(T::from_row)
            .map(|r| r.map_err(Into::into))
            .collect::<Result<_>>()
    }

    /// Run a `SELECT COUNT(*)`-style query returning one integer.
    pub fn count<P: rusqlite::Params>(&self, sql: &str, parameters: P) -> Result<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(sql, parameters, |row| row.get(0))?;
        Ok(count as usize)
    }
}

pub trait FromRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self>
    where
        Self: Sized;
}
