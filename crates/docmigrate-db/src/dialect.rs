use docmigrate_common::{ColumnSpec, IndexSpec};

/// SQL flavour used when rendering DDL.
///
/// Neither rendering uses `IF NOT EXISTS`; MySQL 5.7 has no such clause for
/// `ADD COLUMN` or `CREATE INDEX`, so callers check the catalog first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn quote(self, ident: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", ident.replace('`', "``")),
            Dialect::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    pub fn add_column(self, table: &str, column: &ColumnSpec) -> String {
        let null = if column.nullable { "NULL" } else { "NOT NULL" };
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {} {}",
            self.quote(table),
            self.quote(&column.name),
            column.sql_type.trim(),
            null
        );

        // SQLite has no column comments.
        if let (Dialect::MySql, Some(comment)) = (self, &column.comment) {
            sql.push_str(" COMMENT ");
            sql.push_str(&string_literal(comment));
        }
        sql
    }

    pub fn create_index(self, table: &str, index: &IndexSpec) -> String {
        let columns = index
            .columns
            .iter()
            .map(|c| self.quote(c))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "CREATE INDEX {} ON {}({})",
            self.quote(&index.name),
            self.quote(table),
            columns
        )
    }
}

fn string_literal(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "''");
    format!("'{escaped}'")
}
