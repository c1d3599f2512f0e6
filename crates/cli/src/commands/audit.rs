//! Audit command: capture a snapshot, run the check battery, render the
//! findings

use crate::config::TunerConfig;
use crate::output::{color_severity, print_success, OutputFormat};
use anyhow::Result;
use std::path::Path;
use std::process::ExitCode;
use tabled::Tabled;
use tuner_lib::{capture, evaluate, Finding, Severity};

/// Row for the findings table
#[derive(Tabled)]
struct FindingRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Check")]
    check: String,
    #[tabled(rename = "Parameter")]
    parameter: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl FindingRow {
    fn from(finding: &Finding) -> Self {
        let mut detail = finding.message.clone();
        for remediation in &finding.remediation {
            detail.push_str(&format!(
                "\nsuggest: {} = {}",
                remediation.name, remediation.value
            ));
        }
        Self {
            severity: color_severity(finding.severity),
            check: finding.check_id.clone(),
            parameter: finding.parameter.clone().unwrap_or_default(),
            detail,
        }
    }
}

pub async fn run(
    proc_root: &Path,
    config: &TunerConfig,
    format: OutputFormat,
) -> Result<ExitCode> {
    let store = super::store_for(proc_root);
    let telemetry = super::telemetry_for(proc_root);
    let snapshot = capture(&store, &telemetry, &config.capture_config()).await;
    let findings = evaluate(&snapshot, &config.thresholds());

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&findings)?);
        }
        OutputFormat::Table => {
            let rows: Vec<FindingRow> = findings.iter().map(FindingRow::from).collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);

            let criticals = count(&findings, Severity::Critical);
            let warnings = count(&findings, Severity::Warning);
            if criticals == 0 && warnings == 0 {
                print_success("No warnings or critical findings");
            } else {
                println!(
                    "\n{} critical, {} warning ({} checks evaluated at {})",
                    criticals,
                    warnings,
                    findings.len(),
                    snapshot.captured_at.to_rfc3339()
                );
            }
        }
    }

    Ok(ExitCode::from(exit_code(&findings)))
}

fn count(findings: &[Finding], severity: Severity) -> usize {
    findings.iter().filter(|f| f.severity == severity).count()
}

/// 2 if anything critical, 1 if anything warned, otherwise 0
fn exit_code(findings: &[Finding]) -> u8 {
    if count(findings, Severity::Critical) > 0 {
        2
    } else if count(findings, Severity::Warning) > 0 {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuner_lib::Finding;

    #[test]
    fn test_exit_code_reflects_worst_severity() {
        let pass = Finding::new(Severity::Pass, "triple-order", "ok");
        let warning = Finding::new(Severity::Warning, "min-floor", "low");
        let critical = Finding::new(Severity::Critical, "ceiling-consistency", "capped");

        assert_eq!(exit_code(&[pass.clone()]), 0);
        assert_eq!(exit_code(&[pass.clone(), warning.clone()]), 1);
        assert_eq!(exit_code(&[pass, warning, critical]), 2);
    }
}
