//! Output formats for command results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output format shared by all pfxsync commands
///
/// Commands that don't support a particular format should return an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Pretty table with borders (default)
    #[default]
    Table,
    /// Markdown table format
    Markdown,
    /// Compact JSON (single line)
    Json,
    /// Pretty-printed JSON with indentation
    JsonPretty,
    /// JSON Lines format (one JSON object per line)
    JsonLine,
    /// Pipe-separated values with header
    Psv,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty | Self::JsonLine)
    }

    /// Get a list of all format names for help text
    pub fn all_names() -> &'static [&'static str] {
        &[
            "table",
            "markdown",
            "json",
            "json-pretty",
            "json-line",
            "psv",
        ]
    }

    /// Serialize a list of rows in one of the JSON variants
    ///
    /// Returns `None` for non-JSON formats.
    pub fn render_json<T: Serialize>(&self, rows: &[T]) -> Option<serde_json::Result<String>> {
        match self {
            Self::Json => Some(serde_json::to_string(rows)),
            Self::JsonPretty => Some(serde_json::to_string_pretty(rows)),
            Self::JsonLine => Some(
                rows.iter()
                    .map(serde_json::to_string)
                    .collect::<serde_json::Result<Vec<_>>>()
                    .map(|lines| lines.join("\n")),
            ),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Markdown => write!(f, "markdown"),
            Self::Json => write!(f, "json"),
            Self::JsonPretty => write!(f, "json-pretty"),
            Self::JsonLine => write!(f, "json-line"),
            Self::Psv => write!(f, "psv"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "pretty" => Ok(Self::Table),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "json-pretty" | "jsonpretty" => Ok(Self::JsonPretty),
            "json-line" | "jsonline" | "jsonl" | "ndjson" => Ok(Self::JsonLine),
            "psv" | "pipe" => Ok(Self::Psv),
            _ => Err(format!(
                "Unknown output format '{}'. Valid formats: {}",
                s,
                Self::all_names().join(", ")
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        prefix: &'static str,
        active: bool,
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("table").unwrap(), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str("md").unwrap(), OutputFormat::Markdown);
        assert_eq!(
            OutputFormat::from_str("JSON-PRETTY").unwrap(),
            OutputFormat::JsonPretty
        );
        assert_eq!(
            OutputFormat::from_str("ndjson").unwrap(),
            OutputFormat::JsonLine
        );
        assert_eq!(OutputFormat::from_str("pipe").unwrap(), OutputFormat::Psv);
        assert!(OutputFormat::from_str("yaml").is_err());
    }

    #[test]
    fn test_display_round_trips_names() {
        for name in OutputFormat::all_names() {
            assert_eq!(OutputFormat::from_str(name).unwrap().to_string(), *name);
        }
    }

    #[test]
    fn test_render_json() {
        let rows = [
            Row {
                prefix: "192.0.2.0/24",
                active: true,
            },
            Row {
                prefix: "2001:db8::/32",
                active: false,
            },
        ];

        let compact = OutputFormat::Json.render_json(&rows).unwrap().unwrap();
        assert!(compact.starts_with("[{\"prefix\":\"192.0.2.0/24\""));

        let lines = OutputFormat::JsonLine.render_json(&rows).unwrap().unwrap();
        assert_eq!(lines.lines().count(), 2);

        assert!(OutputFormat::Table.render_json(&rows).is_none());
    }
}
