pub mod backend;
pub mod dialect;
pub mod ensure;
pub mod mysql;
pub mod runner;
pub mod sqlite;

pub use backend::{ColumnInfo, SchemaBackend};
pub use dialect::Dialect;
pub use ensure::{ApplyMode, Step, StepAction, StepKind, ensure_column, ensure_index};
pub use mysql::MySqlBackend;
pub use runner::{MigrationReport, MigrationRunner};
pub use sqlite::SqliteBackend;
