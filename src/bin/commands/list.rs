use super::{parse_dataset, print_rows};
use clap::Args;
use pfxsync::{OutputFormat, PfxsyncConfig, PfxsyncDatabase, PrefixRecord};
use serde::Serialize;
use tabled::Tabled;

/// Arguments for the List command
#[derive(Args)]
pub struct ListArgs {
    /// ASN whose prefixes to list. Defaults to the configured `asn`
    #[clap(short, long)]
    pub asn: Option<String>,

    /// Only show prefixes present in the last run
    #[clap(long)]
    pub active: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct PrefixRow {
    prefix: String,
    active: bool,
    last_seen_at: String,
}

impl From<PrefixRecord> for PrefixRow {
    fn from(record: PrefixRecord) -> Self {
        PrefixRow {
            prefix: record.prefix,
            active: record.active,
            last_seen_at: record.last_seen_at.unwrap_or_default(),
        }
    }
}

pub fn run(config: &PfxsyncConfig, args: ListArgs, output_format: OutputFormat) {
    let ListArgs { asn, active } = args;

    let dataset = match asn {
        Some(asn) => parse_dataset(&asn),
        None => config.asn.clone(),
    };

    let db = match PfxsyncDatabase::open_in_dir(&config.data_dir) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("ERROR: Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let records = match db.prefixes().list(&dataset, active) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    if records.is_empty() && !output_format.is_json() {
        eprintln!("No prefixes stored for {}", dataset);
        return;
    }

    let rows: Vec<PrefixRow> = records.into_iter().map(PrefixRow::from).collect();
    print_rows(&rows, output_format);
}
