use super::{parse_dataset, print_rows};
use clap::Args;
use pfxsync::{DatasetId, OutputFormat, PfxsyncConfig, PfxsyncDatabase};
use serde::Serialize;
use tabled::Tabled;

/// Arguments for the Status command
#[derive(Args)]
pub struct StatusArgs {
    /// Only show this ASN. By default every stored ASN is shown
    #[clap(short, long)]
    pub asn: Option<String>,
}

#[derive(Debug, Serialize, Tabled)]
struct StatusRow {
    asn: String,
    total: u64,
    active: u64,
    inactive: u64,
    last_run: String,
    last_count: String,
}

fn status_row(db: &PfxsyncDatabase, dataset: &DatasetId) -> anyhow::Result<StatusRow> {
    let repo = db.prefixes();
    let counts = repo.counts(dataset)?;
    let last_run = repo.last_run(dataset)?;

    Ok(StatusRow {
        asn: dataset.to_string(),
        total: counts.total,
        active: counts.active,
        inactive: counts.inactive,
        last_run: last_run
            .as_ref()
            .map(|r| r.seen_at.clone())
            .unwrap_or_else(|| "never".to_string()),
        last_count: last_run
            .map(|r| r.count.to_string())
            .unwrap_or_default(),
    })
}

pub fn run(config: &PfxsyncConfig, args: StatusArgs, output_format: OutputFormat) {
    let db = match PfxsyncDatabase::open_in_dir(&config.data_dir) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("ERROR: Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let datasets = match args.asn {
        Some(asn) => vec![parse_dataset(&asn)],
        None => match db.datasets() {
            Ok(d) => d,
            Err(e) => {
                eprintln!("ERROR: {}", e);
                std::process::exit(1);
            }
        },
    };

    if datasets.is_empty() && !output_format.is_json() {
        eprintln!("No ASNs stored yet, run `pfxsync sync` first");
        return;
    }

    let mut rows = Vec::with_capacity(datasets.len());
    for dataset in &datasets {
        match status_row(&db, dataset) {
            Ok(row) => rows.push(row),
            Err(e) => eprintln!("ERROR: {}: {}", dataset, e),
        }
    }

    print_rows(&rows, output_format);
}
