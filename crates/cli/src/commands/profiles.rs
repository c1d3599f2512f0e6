//! Profiles command: list the static tuning profile catalog

use crate::output::OutputFormat;
use anyhow::Result;
use tabled::Tabled;
use tuner_lib::profile;

/// Row for the profile catalog table
#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Workload")]
    workload: String,
    #[tabled(rename = "Topology")]
    topology: String,
    #[tabled(rename = "Description")]
    description: String,
}

pub fn run(format: OutputFormat) -> Result<()> {
    let catalog = profile::catalog();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(catalog)?);
        }
        OutputFormat::Table => {
            let rows: Vec<ProfileRow> = catalog
                .iter()
                .map(|p| ProfileRow {
                    id: p.id.to_string(),
                    workload: p.workload.to_string(),
                    topology: p.topology.to_string(),
                    description: p.description.to_string(),
                })
                .collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}
