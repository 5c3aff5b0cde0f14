use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// MySQL caps identifier length at 64 characters.
const MAX_IDENTIFIER_LEN: usize = 64;

/// A column that must exist on the target table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

/// A secondary index that must exist on the target table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
}

/// The desired end state for one table: columns first, then indexes.
///
/// Applying a delta only ever adds elements. Anything already present on
/// the table, including columns whose definition differs from the spec,
/// is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDelta {
    pub table: String,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
}

fn default_nullable() -> bool {
    true
}

impl ColumnSpec {
    pub fn nullable(
        name: impl Into<String>,
        sql_type: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: true,
            comment: Some(comment.into()),
        }
    }
}

impl IndexSpec {
    pub fn on(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: vec![column.into()],
        }
    }
}

impl SchemaDelta {
    /// Object-storage columns for `application_documents`.
    pub fn application_documents() -> Self {
        Self {
            table: "application_documents".to_string(),
            columns: vec![
                ColumnSpec::nullable(
                    "file_path",
                    "VARCHAR(500)",
                    "Legacy: Local file path (deprecated - use gcs_path instead)",
                ),
                ColumnSpec::nullable(
                    "document_label",
                    "VARCHAR(255)",
                    "Human readable label (e.g., บัตรประชาชน)",
                ),
                ColumnSpec::nullable(
                    "gcs_path",
                    "VARCHAR(500)",
                    "Path in Google Cloud Storage bucket",
                ),
                ColumnSpec::nullable(
                    "gcs_signed_url",
                    "TEXT",
                    "GCS signed URL (temporary, expires)",
                ),
                ColumnSpec::nullable(
                    "gcs_signed_url_expires_at",
                    "DATETIME",
                    "Expiration time for signed URL",
                ),
            ],
            indexes: vec![IndexSpec::on("idx_gcs_path", "gcs_path")],
        }
    }

    /// Names of the desired columns, used to filter the verification listing.
    pub fn column_names(&self) -> HashSet<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Reject anything that cannot be interpolated into DDL safely.
    pub fn validate(&self) -> Result<()> {
        validate_identifier("table", &self.table)?;

        let mut seen = HashSet::new();
        for column in &self.columns {
            validate_identifier("column", &column.name)?;
            validate_sql_type(&column.name, &column.sql_type)?;
            if !seen.insert(column.name.to_ascii_lowercase()) {
                return Err(Error::Config(format!(
                    "duplicate column `{}` in delta for `{}`",
                    column.name, self.table
                )));
            }
        }

        let mut seen = HashSet::new();
        for index in &self.indexes {
            validate_identifier("index", &index.name)?;
            if index.columns.is_empty() {
                return Err(Error::Config(format!(
                    "index `{}` must name at least one column",
                    index.name
                )));
            }
            for column in &index.columns {
                validate_identifier("index column", column)?;
            }
            if !seen.insert(index.name.to_ascii_lowercase()) {
                return Err(Error::Config(format!(
                    "duplicate index `{}` in delta for `{}`",
                    index.name, self.table
                )));
            }
        }

        Ok(())
    }
}

fn validate_identifier(kind: &str, ident: &str) -> Result<()> {
    let starts_ok = ident
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let chars_ok = ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !starts_ok || !chars_ok || ident.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::Config(format!("invalid {kind} name: {ident:?}")));
    }
    Ok(())
}

fn validate_sql_type(column: &str, sql_type: &str) -> Result<()> {
    let trimmed = sql_type.trim();
    let chars_ok = trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '(' | ')' | ','));
    let starts_ok = trimmed.chars().next().is_some_and(|c| c.is_ascii_alphabetic());

    if !starts_ok || !chars_ok {
        return Err(Error::Config(format!(
            "invalid type for column `{column}`: {sql_type:?}"
        )));
    }
    Ok(())
}
