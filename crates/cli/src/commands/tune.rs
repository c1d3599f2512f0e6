//! Profile-driven tuning commands: recommend, apply, restore

use crate::config::TunerConfig;
use crate::output::{print_info, print_success, print_warning, OutputFormat};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use tabled::Tabled;
use tuner_lib::profile::{self, DiffEntry};
use tuner_lib::store::{export_backup, restore_backup, Backup};
use tuner_lib::{capture, Reading, Snapshot};

/// Row for the recommendation diff table
#[derive(Tabled)]
struct DiffRow {
    #[tabled(rename = "Parameter")]
    parameter: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Recommended")]
    recommended: String,
    #[tabled(rename = "Match")]
    matches: String,
}

impl DiffRow {
    fn from(entry: &DiffEntry) -> Self {
        let current = match &entry.current {
            Reading::Value(v) => v.to_string(),
            Reading::Unavailable { reason } => format!("(unavailable: {reason})"),
            Reading::Malformed { raw } => format!("(malformed: {raw})"),
        };
        let matches = if entry.matches {
            "✓".green().to_string()
        } else {
            "✗".red().to_string()
        };
        Self {
            parameter: entry.name.clone(),
            current,
            recommended: entry.recommended.to_string(),
            matches,
        }
    }
}

async fn snapshot_for(proc_root: &Path, config: &TunerConfig) -> Snapshot {
    let store = super::store_for(proc_root);
    let telemetry = super::telemetry_for(proc_root);
    capture(&store, &telemetry, &config.capture_config()).await
}

fn render_diff(diff: &[DiffEntry], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(diff)?);
        }
        OutputFormat::Table => {
            let rows: Vec<DiffRow> = diff.iter().map(DiffRow::from).collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }
    Ok(())
}

/// Diff the current configuration against a profile
pub async fn recommend(
    proc_root: &Path,
    config: &TunerConfig,
    profile_id: &str,
    format: OutputFormat,
) -> Result<()> {
    let profile = profile::find(profile_id)?;
    let snapshot = snapshot_for(proc_root, config).await;
    let diff = profile::diff(&snapshot, profile);
    render_diff(&diff, format)?;

    let mismatches = diff.iter().filter(|e| !e.matches).count();
    if mismatches == 0 {
        print_success(&format!("configuration already matches {profile_id}"));
    } else {
        print_info(&format!(
            "{mismatches} parameter(s) differ; apply with `nbt apply --profile {profile_id}`"
        ));
    }
    Ok(())
}

/// Apply a profile, writing the pre-change backup to disk before any
/// parameter is mutated
pub async fn apply(
    proc_root: &Path,
    config: &TunerConfig,
    profile_id: &str,
    dry_run: bool,
    backup_file: &Path,
    format: OutputFormat,
) -> Result<()> {
    let profile = profile::find(profile_id)?;
    let snapshot = snapshot_for(proc_root, config).await;
    let diff = profile::diff(&snapshot, profile);
    let plan = profile::plan(profile, &diff);

    if plan.is_empty() {
        print_success(&format!("configuration already matches {profile_id}"));
        return Ok(());
    }

    render_diff(&diff, format)?;

    if dry_run {
        print_info(&format!(
            "dry run: {} parameter(s) would be written, nothing changed",
            plan.actions.len()
        ));
        return Ok(());
    }

    let store = super::store_for(proc_root);
    let backup = export_backup(&store).await;
    tokio::fs::write(backup_file, backup.to_blob())
        .await
        .with_context(|| format!("failed to write backup to {}", backup_file.display()))?;
    print_info(&format!("backup written to {}", backup_file.display()));

    match profile::apply(&plan, &store, backup).await {
        Ok(outcome) => {
            print_success(&format!(
                "applied {} parameter(s) from {profile_id}",
                outcome.applied.len()
            ));
            Ok(())
        }
        Err(err) => {
            print_warning(&format!(
                "apply stopped: {err}; roll back with `nbt restore --backup-file {}`",
                backup_file.display()
            ));
            Err(err.into())
        }
    }
}

/// Restore parameters from a backup file
pub async fn restore(proc_root: &Path, backup_file: &Path) -> Result<()> {
    let blob = tokio::fs::read_to_string(backup_file)
        .await
        .with_context(|| format!("failed to read {}", backup_file.display()))?;
    let backup = Backup::from_blob(&blob)?;

    let store = super::store_for(proc_root);
    restore_backup(&store, &backup).await?;
    print_success(&format!(
        "restored {} parameter(s) from backup taken at {}",
        backup.values.len(),
        backup.taken_at.to_rfc3339()
    ));
    Ok(())
}
