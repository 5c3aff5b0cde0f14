use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use docmigrate_common::{Error, Result};
use docmigrate_config::DatabaseConfig;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{Connection, Row};
use tracing::{debug, info};

use crate::backend::{ColumnInfo, SchemaBackend};
use crate::dialect::Dialect;

const TABLE_EXISTS_SQL: &str = "SELECT 1 FROM information_schema.TABLES
     WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
     LIMIT 1";

const COLUMN_EXISTS_SQL: &str = "SELECT 1 FROM information_schema.COLUMNS
     WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND COLUMN_NAME = ?
     LIMIT 1";

const INDEX_EXISTS_SQL: &str = "SELECT 1 FROM information_schema.STATISTICS
     WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND INDEX_NAME = ?
     LIMIT 1";

// Catalog columns are cast so MySQL 8 does not hand them back as binary.
const DESCRIBE_SQL: &str = "SELECT CAST(COLUMN_NAME AS CHAR),
            CAST(COLUMN_TYPE AS CHAR),
            CAST(IS_NULLABLE AS CHAR),
            CAST(COLUMN_DEFAULT AS CHAR),
            CAST(COLUMN_COMMENT AS CHAR)
     FROM information_schema.COLUMNS
     WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
     ORDER BY ORDINAL_POSITION";

/// Schema backend for a MySQL server, one auto-commit session.
pub struct MySqlBackend {
    conn: Option<MySqlConnection>,
    schema: String,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl MySqlBackend {
    /// Open a session. Fails with [`Error::Connection`] on refusal, bad
    /// credentials, or when `connect_timeout` elapses.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .charset("utf8mb4");

        let conn = bounded(config.connect_timeout, MySqlConnection::connect_with(&options))
            .await
            .map_err(|e| {
                Error::Connection(format!(
                    "failed to connect to {}:{}: {e}",
                    config.host, config.port
                ))
            })?;

        info!(
            "connected to {}:{} db={} user={}",
            config.host, config.port, config.database, config.user
        );

        Ok(Self {
            conn: Some(conn),
            schema: config.database.clone(),
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
        })
    }

    fn connection(&mut self) -> Result<&mut MySqlConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| Error::Connection("connection closed".into()))
    }

    async fn probe(&mut self, sql: &'static str, args: &[&str]) -> Result<bool> {
        let limit = self.read_timeout;
        let schema = self.schema.clone();
        let conn = self.connection()?;

        let mut query = sqlx::query(sql).bind(schema);
        for arg in args {
            query = query.bind(arg.to_string());
        }

        let row = bounded(limit, query.fetch_optional(conn))
            .await
            .map_err(|e| Error::Metadata(format!("catalog query failed: {e}")))?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl SchemaBackend for MySqlBackend {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn table_exists(&mut self, table: &str) -> Result<bool> {
        self.probe(TABLE_EXISTS_SQL, &[table]).await
    }

    async fn column_exists(&mut self, table: &str, column: &str) -> Result<bool> {
        let found = self.probe(COLUMN_EXISTS_SQL, &[table, column]).await?;
        debug!("column {table}.{column} exists: {found}");
        Ok(found)
    }

    async fn index_exists(&mut self, table: &str, index: &str) -> Result<bool> {
        let found = self.probe(INDEX_EXISTS_SQL, &[table, index]).await?;
        debug!("index {table}.{index} exists: {found}");
        Ok(found)
    }

    async fn describe_columns(&mut self, table: &str) -> Result<Vec<ColumnInfo>> {
        let limit = self.read_timeout;
        let schema = self.schema.clone();
        let conn = self.connection()?;

        let query = sqlx::query(DESCRIBE_SQL)
            .bind(schema)
            .bind(table.to_string());
        let rows = bounded(limit, query.fetch_all(conn))
            .await
            .map_err(|e| Error::Metadata(format!("failed to list columns: {e}")))?;

        rows.iter()
            .map(|row| -> Result<ColumnInfo> {
                let read = |e: sqlx::Error| Error::Metadata(format!("failed to read column row: {e}"));
                let nullable: String = row.try_get(2).map_err(read)?;
                let comment: Option<String> = row.try_get(4).map_err(read)?;
                Ok(ColumnInfo {
                    name: row.try_get(0).map_err(read)?,
                    column_type: row.try_get(1).map_err(read)?,
                    nullable: nullable.eq_ignore_ascii_case("YES"),
                    default: row.try_get(3).map_err(read)?,
                    comment: comment.filter(|c| !c.is_empty()),
                })
            })
            .collect()
    }

    async fn execute_ddl(&mut self, sql: &str) -> Result<()> {
        let limit = self.write_timeout;
        let conn = self.connection()?;

        // A bare &str has no arguments, so it goes over the text protocol:
        // not every server accepts DDL as a prepared statement.
        bounded(limit, sqlx::Executor::execute(conn, sql))
            .await
            .map_err(|e| Error::Ddl(format!("{sql}: {e}")))?;
        info!("applied: {sql}");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .await
                .map_err(|e| Error::Connection(format!("failed to close connection: {e}")))?;
            debug!("mysql connection closed");
        }
        Ok(())
    }
}

/// Await `fut`, giving up once `limit` elapses.
async fn bounded<T, F>(limit: Duration, fut: F) -> std::result::Result<T, String>
where
    F: Future<Output = sqlx::Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {}s", limit.as_secs())),
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;

    /// A local port that nothing is listening on.
    fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind to random port");
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn refused_connection_is_a_connection_error() {
        let mut config = DatabaseConfig::with_password("pw");
        config.port = closed_port();
        config.connect_timeout = Duration::from_secs(5);

        let err = MySqlBackend::connect(&config).await.err().unwrap();
        assert!(err.is_connection(), "{err}");
        assert!(err.to_string().contains(&config.port.to_string()));
    }

    #[tokio::test]
    async fn bounded_reports_timeouts() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, sqlx::Error>(())
        };
        let err = bounded(Duration::from_millis(10), slow).await.unwrap_err();
        assert!(err.starts_with("timed out"));
    }
}
