// src/process/mod.rs

use crate::config::NcdbConfig;
use crate::error::CorrectError;
use anyhow::{Context, Result};
use chrono::Local;
use csv::ReaderBuilder;
use std::{
    fs::{self, File},
    io::{Cursor, Read},
    path::{Path, PathBuf},
};
use tracing::{info, instrument};
use zip::ZipArchive;

pub mod correct;
pub mod write;

pub const YEAR_COLUMN: &str = "C_YEAR";
pub const SEVERITY_COLUMN: &str = "C_SEV";

/// Collision severity, decoded from the `C_SEV` column. The file encodes
/// fatal as 1 and serious injury as 2; anything else (including blank or
/// non-numeric codes) is `Other` and counts toward neither tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    SeriousInjury,
    Other,
}

impl Severity {
    pub fn from_code(raw: &str) -> Self {
        match raw.trim() {
            "1" => Severity::Fatal,
            "2" => Severity::SeriousInjury,
            _ => Severity::Other,
        }
    }
}

/// One loaded raw artifact: column names plus each data row as strings,
/// in file order. Immutable after load; the correction never rewrites rows.
#[derive(Debug)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    year_idx: usize,
    severity_idx: usize,
}

impl Dataset {
    /// Build a dataset, validating that the year and severity columns exist.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, CorrectError> {
        let index_of = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| CorrectError::Schema(name.to_string()))
        };
        let year_idx = index_of(YEAR_COLUMN)?;
        let severity_idx = index_of(SEVERITY_COLUMN)?;
        Ok(Self {
            headers,
            rows,
            year_idx,
            severity_idx,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Year of a row, or `None` when the field is absent or non-numeric.
    /// Rows without a parseable year are excluded from year-filtered counts.
    pub fn year(&self, row: &[String]) -> Option<i32> {
        row.get(self.year_idx)?.trim().parse().ok()
    }

    pub fn severity(&self, row: &[String]) -> Severity {
        row.get(self.severity_idx)
            .map(|s| Severity::from_code(s))
            .unwrap_or(Severity::Other)
    }
}

fn parse_csv<R: Read>(reader: R) -> Result<Dataset, CorrectError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }
    Dataset::new(headers, rows)
}

fn load_zip(path: &Path) -> Result<Dataset, CorrectError> {
    let file = File::open(path).map_err(|source| CorrectError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_file() && entry.name().to_lowercase().ends_with(".csv") {
            let mut buf = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut buf)
                .map_err(|source| CorrectError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            return parse_csv(Cursor::new(buf));
        }
    }
    Err(CorrectError::NoCsvInArchive)
}

/// Load a raw artifact: a plain CSV, or the first CSV entry of a ZIP.
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_raw(path: impl AsRef<Path>) -> Result<Dataset, CorrectError> {
    let path = path.as_ref();
    let is_zip = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("zip"))
        .unwrap_or(false);

    if is_zip {
        load_zip(path)
    } else {
        let file = File::open(path).map_err(|source| CorrectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse_csv(file)
    }
}

/// Full correction run for one raw artifact: load, compute the baseline
/// ratio, report per-year estimates, then persist the augmented snapshot.
/// Estimates are logged only; they are not merged into the output rows.
#[instrument(level = "info", skip(raw_file, cfg), fields(raw = %raw_file.as_ref().display()))]
pub fn run(raw_file: impl AsRef<Path>, cfg: &NcdbConfig) -> Result<PathBuf> {
    let raw_file = raw_file.as_ref();
    let data = load_raw(raw_file)?;
    info!(
        rows = data.len(),
        columns = data.headers().len(),
        "loaded raw dataset"
    );

    let baseline = correct::compute_baseline(
        &data,
        cfg.reference.start,
        cfg.reference.end,
        cfg.fallback_ratio,
    )?;
    info!(
        ref_start = cfg.reference.start,
        ref_end = cfg.reference.end,
        ratio = format!("{:.2}", baseline).as_str(),
        "baseline fatal:injury ratio"
    );

    let target_start = cfg.target_start;
    let fatals = correct::fatal_counts_by_year(&data, |y| y >= target_start);
    let estimates = correct::estimate_underreported(&data, baseline, |y| y >= target_start);
    for (year, estimate) in &estimates {
        info!(
            year,
            fatals = fatals.get(year).copied().unwrap_or(0),
            estimated_injuries = estimate,
            "underreporting estimate"
        );
    }

    let augmented = write::augment(
        &data,
        &Local::now().to_rfc3339(),
        &raw_file.display().to_string(),
    );

    fs::create_dir_all(&cfg.silver_dir)
        .with_context(|| format!("creating {}", cfg.silver_dir))?;
    let out_path = Path::new(&cfg.silver_dir).join(format!(
        "ncdb_processed_{}.parquet",
        Local::now().format("%Y%m%d")
    ));
    write::write_parquet(&augmented, &out_path)?;
    info!(out = %out_path.display(), "processed data saved");

    Ok(out_path)
}
