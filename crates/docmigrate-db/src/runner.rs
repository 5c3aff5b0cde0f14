use docmigrate_common::{Error, Result, SchemaDelta};
use tracing::{info, warn};

use crate::backend::{ColumnInfo, SchemaBackend};
use crate::ensure::{self, ApplyMode, Step, StepAction};

type Observer<'a> = Box<dyn FnMut(&Step) + 'a>;

/// What a run did, in order.
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    pub steps: Vec<Step>,
    /// Desired columns as listed by the catalog after the run.
    pub verified: Vec<ColumnInfo>,
}

impl MigrationReport {
    fn count(&self, action: StepAction) -> usize {
        self.steps.iter().filter(|s| s.action == action).count()
    }

    pub fn applied(&self) -> usize {
        self.count(StepAction::Apply)
    }

    pub fn skipped(&self) -> usize {
        self.count(StepAction::Skip)
    }

    pub fn planned(&self) -> usize {
        self.count(StepAction::Plan)
    }
}

/// Brings one table up to a [`SchemaDelta`] over a single owned session.
///
/// Columns are handled before indexes because an index may cover a column
/// added in the same run. There is no transaction around the sequence: DDL
/// auto-commits, so a failure leaves earlier steps applied and a re-run
/// picks up where it stopped.
pub struct MigrationRunner<'a, B: SchemaBackend> {
    backend: B,
    delta: &'a SchemaDelta,
    mode: ApplyMode,
    observer: Option<Observer<'a>>,
}

impl<'a, B: SchemaBackend> MigrationRunner<'a, B> {
    pub fn new(backend: B, delta: &'a SchemaDelta) -> Self {
        Self {
            backend,
            delta,
            mode: ApplyMode::Apply,
            observer: None,
        }
    }

    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.mode = if enabled {
            ApplyMode::DryRun
        } else {
            ApplyMode::Apply
        };
        self
    }

    /// Called for every step before its DDL is sent.
    pub fn on_step(mut self, observer: impl FnMut(&Step) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub async fn column_exists(&mut self, column: &str) -> Result<bool> {
        self.backend.column_exists(&self.delta.table, column).await
    }

    pub async fn index_exists(&mut self, index: &str) -> Result<bool> {
        self.backend.index_exists(&self.delta.table, index).await
    }

    pub async fn apply_missing_columns(&mut self) -> Result<Vec<Step>> {
        let delta = self.delta;
        let mut steps = Vec::with_capacity(delta.columns.len());
        for column in &delta.columns {
            let observer = &mut self.observer;
            let step = ensure::ensure_column(
                &mut self.backend,
                &delta.table,
                column,
                self.mode,
                |step| notify(observer, step),
            )
            .await?;
            steps.push(step);
        }
        Ok(steps)
    }

    pub async fn apply_missing_indexes(&mut self) -> Result<Vec<Step>> {
        let delta = self.delta;
        let mut steps = Vec::with_capacity(delta.indexes.len());
        for index in &delta.indexes {
            let observer = &mut self.observer;
            let step = ensure::ensure_index(
                &mut self.backend,
                &delta.table,
                index,
                self.mode,
                |step| notify(observer, step),
            )
            .await?;
            steps.push(step);
        }
        Ok(steps)
    }

    /// The catalog's listing of the desired columns, in table order.
    ///
    /// Read-only. A short listing (e.g. after a dry run) is not an error.
    pub async fn verify(&mut self) -> Result<Vec<ColumnInfo>> {
        let wanted = self.delta.column_names();
        let columns = self.backend.describe_columns(&self.delta.table).await?;
        Ok(columns
            .into_iter()
            .filter(|c| wanted.contains(c.name.as_str()))
            .collect())
    }

    /// Apply the whole delta, then release the session whatever the outcome.
    pub async fn run(mut self) -> Result<MigrationReport> {
        let result = self.apply_all().await;

        if let Err(e) = self.backend.close().await {
            warn!("failed to release connection: {e}");
        }

        match &result {
            Ok(report) => info!(
                "migration of `{}` finished: {} applied, {} skipped, {} planned",
                self.delta.table,
                report.applied(),
                report.skipped(),
                report.planned()
            ),
            Err(e) => warn!("migration of `{}` aborted: {e}", self.delta.table),
        }
        result
    }

    async fn apply_all(&mut self) -> Result<MigrationReport> {
        if !self.backend.table_exists(&self.delta.table).await? {
            return Err(Error::NotFound(format!("table `{}`", self.delta.table)));
        }

        let mut report = MigrationReport::default();
        report.steps.extend(self.apply_missing_columns().await?);
        report.steps.extend(self.apply_missing_indexes().await?);
        report.verified = self.verify().await?;
        Ok(report)
    }
}

fn notify(observer: &mut Option<Observer<'_>>, step: &Step) {
    if let Some(observer) = observer.as_mut() {
        observer(step);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use docmigrate_common::IndexSpec;

    use super::*;
    use crate::ensure::StepKind;
    use crate::sqlite::SqliteBackend;

    fn fresh_backend() -> SqliteBackend {
        let backend = SqliteBackend::in_memory().unwrap();
        backend
            .execute_batch(
                "CREATE TABLE application_documents (
                    id INTEGER PRIMARY KEY,
                    document_type VARCHAR(50) NOT NULL
                )",
            )
            .unwrap();
        backend
    }

    #[tokio::test]
    async fn fresh_table_gets_every_column_and_index() {
        let delta = SchemaDelta::application_documents();
        let report = MigrationRunner::new(fresh_backend(), &delta)
            .run()
            .await
            .unwrap();

        assert_eq!(report.applied(), 6);
        assert_eq!(report.skipped(), 0);
        assert_eq!(report.verified.len(), 5);
        assert!(report.verified.iter().all(|c| c.nullable));
    }

    #[tokio::test]
    async fn observer_sees_steps_in_delta_order() {
        let delta = SchemaDelta::application_documents();
        let seen = RefCell::new(Vec::new());

        MigrationRunner::new(fresh_backend(), &delta)
            .on_step(|step| seen.borrow_mut().push((step.kind, step.name.clone())))
            .run()
            .await
            .unwrap();

        let seen = seen.into_inner();
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[0], (StepKind::Column, "file_path".to_string()));
        assert_eq!(seen[4], (StepKind::Column, "gcs_signed_url_expires_at".to_string()));
        assert_eq!(seen[5], (StepKind::Index, "idx_gcs_path".to_string()));
    }

    #[tokio::test]
    async fn missing_table_aborts_before_any_ddl() {
        let delta = SchemaDelta::application_documents();
        let backend = SqliteBackend::in_memory().unwrap();
        let steps = RefCell::new(0);

        let err = MigrationRunner::new(backend, &delta)
            .on_step(|_| *steps.borrow_mut() += 1)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(*steps.borrow(), 0);
    }

    #[tokio::test]
    async fn ddl_failure_keeps_earlier_columns() {
        let mut delta = SchemaDelta::application_documents();
        // Index on a column nobody creates.
        delta.indexes = vec![IndexSpec::on("idx_missing", "no_such_column")];

        let mut runner = MigrationRunner::new(fresh_backend(), &delta);
        let err = runner.apply_all().await.unwrap_err();
        assert!(matches!(err, Error::Ddl(_)));

        for column in &delta.columns {
            assert!(runner.column_exists(&column.name).await.unwrap());
        }
        assert!(!runner.index_exists("idx_missing").await.unwrap());
    }

    #[tokio::test]
    async fn dry_run_plans_without_applying() {
        let delta = SchemaDelta::application_documents();
        let mut runner = MigrationRunner::new(fresh_backend(), &delta).dry_run(true);

        let report = runner.apply_all().await.unwrap();
        assert_eq!(report.planned(), 6);
        assert_eq!(report.applied(), 0);
        assert!(report.verified.is_empty());
        assert!(!runner.column_exists("gcs_path").await.unwrap());
    }
}
