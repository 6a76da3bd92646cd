use clap::Args;
use pfxsync::database::{PfxsyncDatabase, SchemaManager, SchemaStatus, SCHEMA_VERSION};
use pfxsync::{OutputFormat, PfxsyncConfig};
use serde::Serialize;
use std::path::Path;

/// Arguments for the Config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Also list the ASNs stored in the database
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Serialize)]
struct ConfigInfo {
    config_file: String,
    settings: PfxsyncConfig,
    database: DatabaseInfo,
}

#[derive(Debug, Serialize)]
struct DatabaseInfo {
    path: String,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    schema_initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    datasets: Option<Vec<String>>,
}

fn database_info(config: &PfxsyncConfig, verbose: bool) -> DatabaseInfo {
    let sqlite_path = config.sqlite_path();
    let exists = Path::new(&sqlite_path).exists();

    let mut info = DatabaseInfo {
        path: sqlite_path.clone(),
        exists,
        size_bytes: None,
        schema_initialized: false,
        schema_version: None,
        datasets: None,
    };

    if !exists {
        return info;
    }

    info.size_bytes = std::fs::metadata(&sqlite_path).ok().map(|m| m.len());

    if let Ok(db) = PfxsyncDatabase::open(&sqlite_path) {
        let manager = SchemaManager::new(db.connection());
        let (initialized, version) = match manager.check_status() {
            Ok(SchemaStatus::Current) => (true, Some(SCHEMA_VERSION)),
            Ok(SchemaStatus::NeedsMigration { from, .. }) => (true, Some(from)),
            Ok(SchemaStatus::Incompatible {
                database_version, ..
            }) => (true, Some(database_version)),
            Ok(SchemaStatus::NotInitialized) | Ok(SchemaStatus::Corrupted) | Err(_) => {
                (false, None)
            }
        };
        info.schema_initialized = initialized;
        info.schema_version = version;

        if verbose {
            info.datasets = db
                .datasets()
                .ok()
                .map(|ids| ids.iter().map(|id| id.to_string()).collect());
        }
    }

    info
}

pub fn run(config: &PfxsyncConfig, args: ConfigArgs, output_format: OutputFormat) {
    let ConfigArgs { verbose } = args;

    let config_info = ConfigInfo {
        config_file: PfxsyncConfig::config_file_path(),
        settings: config.clone(),
        database: database_info(config, verbose),
    };

    match output_format {
        OutputFormat::Json | OutputFormat::JsonLine => match serde_json::to_string(&config_info) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing config info: {}", e),
        },
        OutputFormat::JsonPretty => match serde_json::to_string_pretty(&config_info) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing config info: {}", e),
        },
        _ => print_config_table(&config_info),
    }
}

fn print_config_table(info: &ConfigInfo) {
    println!("Pfxsync Configuration");
    println!("=====================\n");

    println!("Config file:        {}", info.config_file);
    println!("{}", info.settings.summary());
    println!();

    println!("SQLite Database:");
    println!(
        "  Status:           {}",
        if info.database.exists {
            "exists"
        } else {
            "not created"
        }
    );
    if let Some(size) = info.database.size_bytes {
        println!("  Size:             {} bytes", size);
    }
    match info.database.schema_version {
        Some(v) if info.database.schema_initialized => {
            println!("  Schema:           v{}", v)
        }
        _ => println!("  Schema:           not initialized"),
    }
    if let Some(datasets) = &info.database.datasets {
        println!("  ASNs:             {}", datasets.join(", "));
    }
}
