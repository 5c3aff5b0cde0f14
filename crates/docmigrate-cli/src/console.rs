use docmigrate_common::SchemaDelta;
use docmigrate_config::DatabaseConfig;
use docmigrate_db::{ColumnInfo, MigrationReport, Step, StepAction, StepKind};

/// Print the run header.
pub fn print_header(delta: &SchemaDelta, dry_run: bool) {
    let verb = if dry_run { "Planning" } else { "Applying" };
    println!(
        "== {verb} migration: {} ({}, {}) ==",
        delta.table,
        plural(delta.columns.len(), "column"),
        plural(delta.indexes.len(), "index")
    );
}

/// Print where we are about to connect. Never includes the password.
pub fn print_target(config: &DatabaseConfig) {
    println!(
        "Connecting to {}:{} db={} user={}",
        config.host, config.port, config.database, config.user
    );
}

pub fn print_step(step: &Step) {
    println!("{}", step_line(step));
}

pub fn print_verification(report: &MigrationReport) {
    println!("-- Verify columns");
    for column in &report.verified {
        println!("{}", column_line(column));
    }
}

pub fn print_success(report: &MigrationReport, dry_run: bool) {
    if dry_run {
        println!(
            "✅ Dry run complete ({} pending, {} present)",
            report.planned(),
            report.skipped()
        );
    } else {
        println!(
            "✅ Migration complete ({} applied, {} skipped)",
            report.applied(),
            report.skipped()
        );
    }
}

pub fn print_failure(error: &anyhow::Error) {
    println!("❌ Migration failed: {error:#}");
}

fn step_line(step: &Step) -> String {
    let kind = match step.kind {
        StepKind::Column => "column",
        StepKind::Index => "index",
    };
    match (step.action, step.kind) {
        (StepAction::Skip, _) => format!("-- Skip: {kind} {} already exists", step.name),
        (StepAction::Apply, StepKind::Column) => format!("-- Add column: {}", step.name),
        (StepAction::Apply, StepKind::Index) => format!("-- Create index: {}", step.name),
        (StepAction::Plan, StepKind::Column) => format!("-- Would add column: {}", step.name),
        (StepAction::Plan, StepKind::Index) => format!("-- Would create index: {}", step.name),
    }
}

fn column_line(column: &ColumnInfo) -> String {
    format!(
        "  ✅ {} {} NULL={} DEFAULT={}",
        column.name,
        column.column_type,
        if column.nullable { "YES" } else { "NO" },
        column.default.as_deref().unwrap_or("NULL")
    )
}

fn plural(n: usize, noun: &str) -> String {
    match (n, noun) {
        (1, _) => format!("1 {noun}"),
        (_, "index") => format!("{n} indexes"),
        _ => format!("{n} {noun}s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(kind: StepKind, name: &str, action: StepAction) -> Step {
        Step {
            kind,
            name: name.to_string(),
            action,
            sql: None,
        }
    }

    #[test]
    fn step_lines_distinguish_skip_from_apply() {
        assert_eq!(
            step_line(&step(StepKind::Column, "file_path", StepAction::Skip)),
            "-- Skip: column file_path already exists"
        );
        assert_eq!(
            step_line(&step(StepKind::Column, "gcs_path", StepAction::Apply)),
            "-- Add column: gcs_path"
        );
        assert_eq!(
            step_line(&step(StepKind::Index, "idx_gcs_path", StepAction::Skip)),
            "-- Skip: index idx_gcs_path already exists"
        );
        assert_eq!(
            step_line(&step(StepKind::Index, "idx_gcs_path", StepAction::Plan)),
            "-- Would create index: idx_gcs_path"
        );
    }

    #[test]
    fn column_line_shows_type_null_and_default() {
        let column = ColumnInfo {
            name: "gcs_path".into(),
            column_type: "varchar(500)".into(),
            nullable: true,
            default: None,
            comment: Some("Path".into()),
        };
        assert_eq!(
            column_line(&column),
            "  ✅ gcs_path varchar(500) NULL=YES DEFAULT=NULL"
        );
    }

    #[test]
    fn plural_handles_indexes() {
        assert_eq!(plural(5, "column"), "5 columns");
        assert_eq!(plural(1, "index"), "1 index");
        assert_eq!(plural(2, "index"), "2 indexes");
    }
}
