use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};
use tracing::warn;

pub const DEFAULT_BASE_URL: &str =
    "https://open.canada.ca/data/en/dataset/1eb9eba7-71d1-4b30-9fb1-30cbdab7e63a";

const DEFAULT_PROVINCES: &[&str] = &[
    "ON", "QC", "BC", "AB", "MB", "SK", "NS", "NB", "NL", "PE", "NT", "YT", "NU",
];

/// Inclusive year interval.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

/// Top-level config file shape: everything lives under an `ncdb:` key.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub ncdb: NcdbConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NcdbConfig {
    /// Dataset page on the Open Canada portal; the CKAN package id is its
    /// last path segment.
    pub base_url: String,
    /// Years of interest for the dataset as a whole.
    pub years: YearRange,
    /// Declared scope; not consumed by the correction logic.
    pub provinces: Vec<String>,
    /// Reference interval for the baseline fatal:injury ratio.
    pub reference: YearRange,
    /// First year treated as suspect for underreporting.
    pub target_start: i32,
    /// Ratio used when the reference interval has no fatal records.
    pub fallback_ratio: f64,
    /// Request timeout for catalog and resource downloads. No retries.
    pub timeout_secs: u64,
    pub bronze_dir: String,
    pub silver_dir: String,
}

impl Default for NcdbConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            years: YearRange {
                start: 1999,
                end: 2024,
            },
            provinces: DEFAULT_PROVINCES.iter().map(|s| s.to_string()).collect(),
            reference: YearRange {
                start: 2010,
                end: 2018,
            },
            target_start: 2020,
            fallback_ratio: 5.0,
            timeout_secs: 30,
            bronze_dir: "data/bronze/ncdb".to_string(),
            silver_dir: "data/silver/ncdb".to_string(),
        }
    }
}

impl Config {
    /// Load `manifest.yaml`-style config. A missing file is not an error:
    /// the documented defaults apply and a warning is logged. Malformed YAML
    /// is fatal.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => serde_yaml::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "config file not found; using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("reading config {}", path.display())),
        }
    }
}
