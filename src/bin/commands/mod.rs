pub mod config;
pub mod list;
pub mod serve;
pub mod status;
pub mod sync;

use pfxsync::{DatasetId, OutputFormat};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Parse an identifier argument, exiting on invalid input
pub(crate) fn parse_dataset(asn: &str) -> DatasetId {
    match DatasetId::parse(asn) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print rows in the requested format
pub(crate) fn print_rows<T: Serialize + Tabled>(rows: &[T], output_format: OutputFormat) {
    if let Some(rendered) = output_format.render_json(rows) {
        match rendered {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("Error serializing output: {}", e),
        }
        return;
    }

    match output_format {
        OutputFormat::Markdown => println!("{}", Table::new(rows).with(Style::markdown())),
        OutputFormat::Psv => {
            println!("{}", T::headers().join("|"));
            for row in rows {
                println!("{}", row.fields().join("|"));
            }
        }
        _ => println!("{}", Table::new(rows).with(Style::rounded())),
    }
}
