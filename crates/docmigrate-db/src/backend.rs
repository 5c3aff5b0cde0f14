use async_trait::async_trait;
use docmigrate_common::Result;

use crate::dialect::Dialect;

/// One row of a table's column listing, as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub column_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub comment: Option<String>,
}

/// A single exclusively-owned database session that can introspect and alter
/// schema.
///
/// Every DDL statement commits on its own. Implementations never wrap calls
/// in a transaction, so partially applied work survives a later failure.
#[async_trait]
pub trait SchemaBackend: Send {
    fn dialect(&self) -> Dialect;

    async fn table_exists(&mut self, table: &str) -> Result<bool>;

    async fn column_exists(&mut self, table: &str, column: &str) -> Result<bool>;

    async fn index_exists(&mut self, table: &str, index: &str) -> Result<bool>;

    /// Columns of `table` in ordinal order.
    async fn describe_columns(&mut self, table: &str) -> Result<Vec<ColumnInfo>>;

    async fn execute_ddl(&mut self, sql: &str) -> Result<()>;

    /// Release the session. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}
