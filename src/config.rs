use crate::dataset::DatasetId;
use crate::fetcher::RIPESTAT_ANNOUNCED_PREFIXES_URL;
use crate::reconcile::{BatchPlan, DEFAULT_SAFE_LIMIT};
use anyhow::{anyhow, Result};
use config::Config;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct PfxsyncConfig {
    /// Path to the directory holding the SQLite database
    pub data_dir: String,

    /// Dataset reconciled by the scheduled trigger
    pub asn: DatasetId,

    /// Remote source URL template; `{resource}` is replaced by the identifier
    pub source_url: String,

    /// Maximum bound parameters per statement
    pub safe_limit: usize,

    /// Seconds between scheduled runs, 0 disables the schedule
    pub schedule_interval_secs: u64,

    /// HTTP bind address
    pub listen_address: String,

    /// HTTP bind port
    pub listen_port: u16,

    /// Run all write phases in a single transaction
    pub atomic_runs: bool,
}

const EMPTY_CONFIG: &str = r#"### pfxsync configuration file

### directory for the prefix database
# data_dir = "~/.pfxsync"

### dataset reconciled on schedule
# asn = "AS14593"

### remote source, {resource} is replaced by the ASN
# source_url = "https://stat.ripe.net/data/announced-prefixes/data.json?resource={resource}"

### max bound parameters per statement
# safe_limit = 100

### scheduler and HTTP trigger
# schedule_interval_secs = 3600     # 1 hour, 0 disables
# listen_address = "127.0.0.1"
# listen_port = 8787

### roll back all phases when a run fails
# atomic_runs = true
"#;

const DEFAULT_SCHEDULE_INTERVAL_SECS: u64 = 3600;
const DEFAULT_LISTEN_PORT: u16 = 8787;

impl Default for PfxsyncConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());

        Self {
            data_dir: format!("{}/.pfxsync", home_dir),
            asn: DatasetId::default(),
            source_url: RIPESTAT_ANNOUNCED_PREFIXES_URL.to_string(),
            safe_limit: DEFAULT_SAFE_LIMIT,
            schedule_interval_secs: DEFAULT_SCHEDULE_INTERVAL_SECS,
            listen_address: "127.0.0.1".to_string(),
            listen_port: DEFAULT_LISTEN_PORT,
            atomic_runs: true,
        }
    }
}

impl PfxsyncConfig {
    /// Function to create and initialize a new configuration
    ///
    /// Reads `$HOME/.pfxsync/pfxsync.toml` (or the given path, created with
    /// commented defaults when missing), then `PFXSYNC_*` environment
    /// variables, including those from a `.env` file.
    pub fn new(path: &Option<String>) -> Result<PfxsyncConfig> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| anyhow!("Could not find home directory"))?
            .to_str()
            .ok_or_else(|| anyhow!("Could not convert home directory path to string"))?
            .to_owned();

        let pfxsync_dir = format!("{}/.pfxsync", home_dir.as_str());

        let config_path = match path {
            Some(p) => p.clone(),
            None => {
                std::fs::create_dir_all(pfxsync_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create pfxsync directory: {}", e))?;
                format!("{}/pfxsync.toml", pfxsync_dir.as_str())
            }
        };

        if !Path::new(config_path.as_str()).exists() {
            std::fs::write(config_path.as_str(), EMPTY_CONFIG).map_err(|e| {
                anyhow!("Unable to create config file {}: {}", config_path.as_str(), e)
            })?;
        }

        dotenvy::dotenv().ok();

        let config = Self::load(Path::new(&config_path), "PFXSYNC")?;
        crate::database::ensure_data_dir(&config.data_dir)?;
        Ok(config)
    }

    /// Build a configuration from a TOML file and prefixed environment variables
    pub fn load(path: &Path, env_prefix: &str) -> Result<PfxsyncConfig> {
        let mut builder = Config::builder();

        if path.exists() {
            let path_str = path
                .to_str()
                .ok_or_else(|| anyhow!("Could not convert path to string"))?;
            builder = builder.add_source(config::File::with_name(path_str));
        }

        // E.g., `PFXSYNC_ASN=AS3333 pfxsync serve` changes the scheduled dataset
        builder = builder.add_source(config::Environment::with_prefix(env_prefix));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Self::from_map(&config)
    }

    fn from_map(config: &HashMap<String, String>) -> Result<PfxsyncConfig> {
        let defaults = PfxsyncConfig::default();

        let data_dir = match config.get("data_dir") {
            Some(p) => expand_home(p),
            None => defaults.data_dir,
        };

        let asn = match config.get("asn") {
            Some(v) => DatasetId::parse(v).map_err(|e| anyhow!("Invalid asn setting: {}", e))?,
            None => defaults.asn,
        };

        let source_url = config
            .get("source_url")
            .cloned()
            .unwrap_or(defaults.source_url);
        if !source_url.contains("{resource}") {
            return Err(anyhow!(
                "source_url must contain a {{resource}} placeholder: {}",
                source_url
            ));
        }

        let safe_limit = parse_or(config, "safe_limit", defaults.safe_limit)?;
        BatchPlan::new(safe_limit)?;

        Ok(PfxsyncConfig {
            data_dir,
            asn,
            source_url,
            safe_limit,
            schedule_interval_secs: parse_or(
                config,
                "schedule_interval_secs",
                defaults.schedule_interval_secs,
            )?,
            listen_address: config
                .get("listen_address")
                .cloned()
                .unwrap_or(defaults.listen_address),
            listen_port: parse_or(config, "listen_port", defaults.listen_port)?,
            atomic_runs: parse_or(config, "atomic_runs", defaults.atomic_runs)?,
        })
    }

    /// Get the path to the SQLite database file
    pub fn sqlite_path(&self) -> String {
        let data_dir = self.data_dir.trim_end_matches('/');
        format!("{}/{}", data_dir, crate::database::DATABASE_FILE_NAME)
    }

    /// Batch sizing derived from `safe_limit`
    pub fn batch_plan(&self) -> Result<BatchPlan> {
        BatchPlan::new(self.safe_limit)
    }

    /// Interval of the scheduled trigger, `None` when disabled
    pub fn schedule_interval(&self) -> Option<std::time::Duration> {
        match self.schedule_interval_secs {
            0 => None,
            secs => Some(std::time::Duration::from_secs(secs)),
        }
    }

    /// Get the full bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen_address, self.listen_port)
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let lines = [
            format!("Data Directory:     {}", self.data_dir),
            format!("SQLite Path:        {}", self.sqlite_path()),
            format!("Scheduled ASN:      {}", self.asn),
            format!("Source URL:         {}", self.source_url),
            format!("Safe Limit:         {}", self.safe_limit),
            format!(
                "Schedule Interval:  {}",
                match self.schedule_interval_secs {
                    0 => "disabled".to_string(),
                    s => format!("{} seconds", s),
                }
            ),
            format!("Listen Address:     {}", self.bind_address()),
            format!("Atomic Runs:        {}", self.atomic_runs),
        ];
        lines.join("\n")
    }

    /// Get the config file path
    pub fn config_file_path() -> String {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| "~".to_string());
        format!("{}/.pfxsync/pfxsync.toml", home_dir)
    }
}

fn parse_or<T: std::str::FromStr>(
    config: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match config.get(key) {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid value for {}: '{}' ({})", key, v, e)),
        None => Ok(default),
    }
}

fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => format!("{}/{}", home.to_string_lossy(), rest),
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = PfxsyncConfig::default();
        assert_eq!(config.asn.as_str(), "AS14593");
        assert_eq!(config.safe_limit, 100);
        assert_eq!(config.schedule_interval_secs, 3600);
        assert!(config.atomic_runs);
        assert!(config.source_url.contains("{resource}"));
        assert!(config.sqlite_path().ends_with("/pfxsync-data.sqlite3"));
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
data_dir = "/tmp/pfxsync-test"
asn = "AS3333"
safe_limit = 998
schedule_interval_secs = 0
listen_port = 9000
atomic_runs = false
"#,
        );

        let config = PfxsyncConfig::load(file.path(), "PFXSYNC_TEST_LOAD").unwrap();
        assert_eq!(config.data_dir, "/tmp/pfxsync-test");
        assert_eq!(config.asn.as_str(), "AS3333");
        assert_eq!(config.safe_limit, 998);
        assert_eq!(config.batch_plan().unwrap().upsert_batch_size(), 499);
        assert_eq!(config.schedule_interval(), None);
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert!(!config.atomic_runs);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = PfxsyncConfig::load(
            Path::new("/nonexistent/pfxsync.toml"),
            "PFXSYNC_TEST_MISSING",
        )
        .unwrap();
        assert_eq!(config.asn.as_str(), "AS14593");
        assert_eq!(
            config.schedule_interval(),
            Some(std::time::Duration::from_secs(3600))
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for contents in [
            r#"asn = "as3333""#,
            r#"safe_limit = 1"#,
            r#"safe_limit = "lots""#,
            r#"source_url = "https://example.com/static.json""#,
            r#"atomic_runs = "maybe""#,
        ] {
            let file = write_config(contents);
            assert!(
                PfxsyncConfig::load(file.path(), "PFXSYNC_TEST_INVALID").is_err(),
                "expected error for {contents}"
            );
        }
    }

    #[test]
    fn test_summary_mentions_settings() {
        let summary = PfxsyncConfig::default().summary();
        assert!(summary.contains("AS14593"));
        assert!(summary.contains("3600 seconds"));
    }
}
