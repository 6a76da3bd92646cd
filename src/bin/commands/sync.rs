use super::print_rows;
use clap::Args;
use pfxsync::{JsonFileSource, OutputFormat, PfxsyncConfig, RipeStatSource, SyncRunner};
use std::sync::Arc;

/// Arguments for the Sync command
#[derive(Args)]
pub struct SyncArgs {
    /// ASN to reconcile, e.g. AS14593. Defaults to the configured `asn`
    #[clap(short, long)]
    pub asn: Option<String>,

    /// Read the announced-prefixes JSON from a local file instead of RIPEstat
    #[clap(long, conflicts_with = "url")]
    pub file: Option<String>,

    /// Source URL template overriding `source_url`; `{resource}` is replaced by the ASN
    #[clap(long)]
    pub url: Option<String>,
}

pub fn run(config: &PfxsyncConfig, args: SyncArgs, output_format: OutputFormat) {
    let SyncArgs { asn, file, url } = args;

    let asn = asn.unwrap_or_else(|| config.asn.to_string());

    let runner = match (file, url) {
        (Some(path), _) => {
            SyncRunner::with_source(config.clone(), Arc::new(JsonFileSource::new(path)))
        }
        (None, Some(url)) => {
            if !url.contains("{resource}") {
                eprintln!("ERROR: --url must contain a {{resource}} placeholder");
                std::process::exit(1);
            }
            SyncRunner::with_source(config.clone(), Arc::new(RipeStatSource::new(url)))
        }
        (None, None) => SyncRunner::new(config.clone()),
    };

    let result = match runner.run(&asn) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    match output_format {
        OutputFormat::Json | OutputFormat::JsonLine => match serde_json::to_string(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing result: {}", e),
        },
        OutputFormat::JsonPretty => match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing result: {}", e),
        },
        _ => print_rows(&[result], output_format),
    }
}
