use std::path::Path;

use async_trait::async_trait;
use docmigrate_common::{Error, Result};
use rusqlite::config::DbConfig;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info};

use crate::backend::{ColumnInfo, SchemaBackend};
use crate::dialect::Dialect;

/// Schema backend for a local SQLite database file.
pub struct SqliteBackend {
    conn: Option<Connection>,
}

impl SqliteBackend {
    /// Open an existing database file. A missing file is an error rather
    /// than a fresh empty database.
    pub fn open(db_path: &Path) -> Result<Self> {
        info!("opening sqlite database at {}", db_path.display());
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(db_path, flags).map_err(|e| {
            Error::Connection(format!(
                "failed to open database {}: {e}",
                db_path.display()
            ))
        })?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Connection(format!("failed to open in-memory database: {e}")))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // Unknown double-quoted identifiers must fail instead of turning into
        // string literals, or CREATE INDEX accepts a column that is not there.
        for config in [DbConfig::SQLITE_DBCONFIG_DQS_DDL, DbConfig::SQLITE_DBCONFIG_DQS_DML] {
            conn.set_db_config(config, false)
                .map_err(|e| Error::Connection(format!("failed to configure database: {e}")))?;
        }
        Ok(Self { conn: Some(conn) })
    }

    /// Run arbitrary setup SQL. Intended for seeding fixtures.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.connection()?
            .execute_batch(sql)
            .map_err(|e| Error::Ddl(format!("batch failed: {e}")))
    }

    fn connection(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| Error::Connection("connection closed".into()))
    }

    fn probe(&self, sql: &str, args: &[&str]) -> Result<bool> {
        let conn = self.connection()?;
        conn.query_row(sql, rusqlite::params_from_iter(args), |_| Ok(()))
            .optional()
            .map(|row| row.is_some())
            .map_err(|e| Error::Metadata(format!("catalog query failed: {e}")))
    }
}

#[async_trait]
impl SchemaBackend for SqliteBackend {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn table_exists(&mut self, table: &str) -> Result<bool> {
        self.probe(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE LIMIT 1",
            &[table],
        )
    }

    async fn column_exists(&mut self, table: &str, column: &str) -> Result<bool> {
        let found = self.probe(
            "SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2 COLLATE NOCASE LIMIT 1",
            &[table, column],
        )?;
        debug!("column {table}.{column} exists: {found}");
        Ok(found)
    }

    async fn index_exists(&mut self, table: &str, index: &str) -> Result<bool> {
        let found = self.probe(
            "SELECT 1 FROM sqlite_master
             WHERE type = 'index' AND tbl_name = ?1 COLLATE NOCASE AND name = ?2 COLLATE NOCASE
             LIMIT 1",
            &[table, index],
        )?;
        debug!("index {table}.{index} exists: {found}");
        Ok(found)
    }

    async fn describe_columns(&mut self, table: &str) -> Result<Vec<ColumnInfo>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT name, type, \"notnull\", dflt_value
                 FROM pragma_table_info(?1)
                 ORDER BY cid",
            )
            .map_err(|e| Error::Metadata(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map(params![table], |row| {
                let not_null: i64 = row.get(2)?;
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    column_type: row.get(1)?,
                    nullable: not_null == 0,
                    default: row.get(3)?,
                    comment: None,
                })
            })
            .map_err(|e| Error::Metadata(format!("failed to query columns: {e}")))?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row.map_err(|e| Error::Metadata(format!("failed to read column row: {e}")))?);
        }
        Ok(columns)
    }

    async fn execute_ddl(&mut self, sql: &str) -> Result<()> {
        self.connection()?
            .execute_batch(sql)
            .map_err(|e| Error::Ddl(format!("{sql}: {e}")))?;
        info!("applied: {sql}");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .map_err(|(_, e)| Error::Connection(format!("failed to close database: {e}")))?;
            debug!("sqlite database closed");
        }
        Ok(())
    }
}
