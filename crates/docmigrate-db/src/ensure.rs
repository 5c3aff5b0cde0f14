//! Check-then-apply primitives.
//!
//! Each call checks the catalog for one element and only issues DDL when the
//! element is absent, so repeating a call is always safe.

use docmigrate_common::{ColumnSpec, Error, IndexSpec, Result};
use tracing::info;

use crate::backend::SchemaBackend;

/// Whether missing elements are created or only reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyMode {
    #[default]
    Apply,
    DryRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Column,
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// Already present; nothing sent.
    Skip,
    /// Missing; DDL sent.
    Apply,
    /// Missing; DDL withheld because of [`ApplyMode::DryRun`].
    Plan,
}

/// Outcome for one desired schema element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub kind: StepKind,
    pub name: String,
    pub action: StepAction,
    /// The DDL for this element, unless it was skipped.
    pub sql: Option<String>,
}

impl Step {
    fn skipped(kind: StepKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            action: StepAction::Skip,
            sql: None,
        }
    }

    fn pending(kind: StepKind, name: &str, mode: ApplyMode, sql: String) -> Self {
        let action = match mode {
            ApplyMode::Apply => StepAction::Apply,
            ApplyMode::DryRun => StepAction::Plan,
        };
        Self {
            kind,
            name: name.to_string(),
            action,
            sql: Some(sql),
        }
    }
}

/// Add `column` to `table` unless the catalog already lists it.
///
/// `before_apply` sees the step before any DDL is sent.
pub async fn ensure_column<B, F>(
    backend: &mut B,
    table: &str,
    column: &ColumnSpec,
    mode: ApplyMode,
    before_apply: F,
) -> Result<Step>
where
    B: SchemaBackend + ?Sized,
    F: FnOnce(&Step),
{
    if backend.column_exists(table, &column.name).await? {
        let step = Step::skipped(StepKind::Column, &column.name);
        before_apply(&step);
        return Ok(step);
    }

    let sql = backend.dialect().add_column(table, column);
    let step = Step::pending(StepKind::Column, &column.name, mode, sql);
    before_apply(&step);

    if let (ApplyMode::Apply, Some(sql)) = (mode, &step.sql) {
        info!("adding column {table}.{}", column.name);
        backend.execute_ddl(sql).await?;
    }
    Ok(step)
}

/// Create `index` on `table` unless the catalog already lists it.
///
/// The indexed columns must exist by the time this runs; when applying, a
/// missing one fails with [`Error::Ddl`] before any DDL is sent. A dry run
/// skips that check because the column may be planned in the same run.
pub async fn ensure_index<B, F>(
    backend: &mut B,
    table: &str,
    index: &IndexSpec,
    mode: ApplyMode,
    before_apply: F,
) -> Result<Step>
where
    B: SchemaBackend + ?Sized,
    F: FnOnce(&Step),
{
    if backend.index_exists(table, &index.name).await? {
        let step = Step::skipped(StepKind::Index, &index.name);
        before_apply(&step);
        return Ok(step);
    }

    if mode == ApplyMode::Apply {
        for column in &index.columns {
            if !backend.column_exists(table, column).await? {
                return Err(Error::Ddl(format!(
                    "index `{}` covers missing column {table}.{column}",
                    index.name
                )));
            }
        }
    }

    let sql = backend.dialect().create_index(table, index);
    let step = Step::pending(StepKind::Index, &index.name, mode, sql);
    before_apply(&step);

    if let (ApplyMode::Apply, Some(sql)) = (mode, &step.sql) {
        info!("creating index {} on {table}", index.name);
        backend.execute_ddl(sql).await?;
    }
    Ok(step)
}
