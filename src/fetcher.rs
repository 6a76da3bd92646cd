//! Announced-prefix fetcher
//!
//! Retrieves the list of prefixes currently announced by an ASN. The default
//! source is the RIPEstat `announced-prefixes` data call, whose body looks like:
//!
//! ```json
//! {"data": {"prefixes": [{"prefix": "192.0.2.0/24", "timelines": [...]}, ...]}}
//! ```
//!
//! Prefix strings are returned in upstream order, without validation or
//! deduplication.

use crate::dataset::DatasetId;
use crate::reconcile::ReconcileError;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

/// RIPEstat announced-prefixes endpoint; `{resource}` is replaced by the identifier
pub const RIPESTAT_ANNOUNCED_PREFIXES_URL: &str =
    "https://stat.ripe.net/data/announced-prefixes/data.json?resource={resource}";

/// Source of the current prefix list for a dataset
pub trait PrefixSource: Send + Sync {
    fn fetch_current_prefixes(&self, dataset: &DatasetId) -> Result<Vec<String>, ReconcileError>;
}

#[derive(Debug, Deserialize)]
struct AnnouncedPrefixesResponse {
    data: AnnouncedPrefixesData,
}

#[derive(Debug, Deserialize)]
struct AnnouncedPrefixesData {
    prefixes: Vec<AnnouncedPrefix>,
}

#[derive(Debug, Deserialize)]
struct AnnouncedPrefix {
    prefix: String,
}

/// Extract prefix strings from an announced-prefixes response body
pub fn parse_announced_prefixes(
    dataset: &DatasetId,
    body: &str,
) -> Result<Vec<String>, ReconcileError> {
    let resp: AnnouncedPrefixesResponse =
        serde_json::from_str(body).map_err(|e| ReconcileError::MalformedResponse {
            identifier: dataset.to_string(),
            reason: e.to_string(),
        })?;
    Ok(resp.data.prefixes.into_iter().map(|p| p.prefix).collect())
}

/// HTTP source backed by RIPEstat (or any endpoint with the same body shape)
#[derive(Debug, Clone)]
pub struct RipeStatSource {
    url_template: String,
}

impl RipeStatSource {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
        }
    }

    pub fn url_for(&self, dataset: &DatasetId) -> String {
        self.url_template.replace("{resource}", dataset.as_str())
    }
}

impl Default for RipeStatSource {
    fn default() -> Self {
        Self::new(RIPESTAT_ANNOUNCED_PREFIXES_URL)
    }
}

impl PrefixSource for RipeStatSource {
    fn fetch_current_prefixes(&self, dataset: &DatasetId) -> Result<Vec<String>, ReconcileError> {
        let url = self.url_for(dataset);
        debug!("[{}] GET {}", dataset, url);

        let fetch_failed = |status: String| ReconcileError::FetchFailed {
            identifier: dataset.to_string(),
            status,
        };

        let mut response = ureq::get(&url)
            .config()
            .http_status_as_error(false)
            .build()
            .call()
            .map_err(|e| fetch_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_failed(status.to_string()));
        }

        let body = response.body_mut().read_to_string().map_err(|e| {
            ReconcileError::MalformedResponse {
                identifier: dataset.to_string(),
                reason: e.to_string(),
            }
        })?;

        parse_announced_prefixes(dataset, &body)
    }
}

/// Local JSON file with the announced-prefixes body shape
///
/// Useful for offline runs and for replaying a saved response.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PrefixSource for JsonFileSource {
    fn fetch_current_prefixes(&self, dataset: &DatasetId) -> Result<Vec<String>, ReconcileError> {
        let body =
            std::fs::read_to_string(&self.path).map_err(|e| ReconcileError::FetchFailed {
                identifier: dataset.to_string(),
                status: format!("{}: {}", self.path.display(), e),
            })?;
        parse_announced_prefixes(dataset, &body)
    }
}

/// Fixed prefix list, the same for every dataset
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    prefixes: Vec<String>,
}

impl StaticSource {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }
}

impl PrefixSource for StaticSource {
    fn fetch_current_prefixes(&self, _dataset: &DatasetId) -> Result<Vec<String>, ReconcileError> {
        Ok(self.prefixes.clone())
    }
}
