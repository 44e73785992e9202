// src/fetch/local.rs

use crate::error::FetchError;
use glob::glob;
use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};
use tracing::{info, warn};

/// Scan `bronze_dir` for previously downloaded artifacts and return the most
/// recently modified one, or `None` if the directory holds nothing usable.
///
/// This is the manual-fallback path: when the catalog is unreachable or
/// yields nothing, an operator-placed file still gets processed.
pub fn latest_local_artifact(bronze_dir: impl AsRef<Path>) -> Result<Option<PathBuf>, FetchError> {
    let bronze_dir = bronze_dir.as_ref();
    let mut candidates: Vec<(SystemTime, PathBuf)> = Vec::new();

    for pattern in ["*.csv", "*.zip"] {
        let full = format!("{}/{}", bronze_dir.display(), pattern);
        let paths = match glob(&full) {
            Ok(paths) => paths,
            Err(e) => {
                warn!(pattern = %full, error = %e, "unusable glob pattern");
                continue;
            }
        };
        for entry in paths {
            let path = match entry {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            let modified = path
                .metadata()
                .and_then(|m| m.modified())
                .map_err(|source| FetchError::Io {
                    path: path.clone(),
                    source,
                })?;
            candidates.push((modified, path));
        }
    }

    candidates.sort_by(|a, b| a.0.cmp(&b.0));
    let latest = candidates.pop().map(|(_, p)| p);
    if let Some(ref p) = latest {
        info!(path = %p.display(), found = candidates.len() + 1, "selected most recent local artifact");
    }
    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::{fs, thread, time::Duration};
    use tempfile::TempDir;

    #[test]
    fn empty_directory_yields_none() -> Result<()> {
        let dir = TempDir::new()?;
        assert!(latest_local_artifact(dir.path())?.is_none());
        Ok(())
    }

    #[test]
    fn picks_most_recently_modified_csv() -> Result<()> {
        let dir = TempDir::new()?;
        let older = dir.path().join("ncdb_20240101_000000.csv");
        let newer = dir.path().join("ncdb_20240601_000000.csv");

        fs::write(&older, "C_YEAR,C_SEV\n2012,1\n")?;
        // filesystem mtime resolution can be coarse
        thread::sleep(Duration::from_millis(20));
        fs::write(&newer, "C_YEAR,C_SEV\n2021,1\n")?;

        assert_eq!(latest_local_artifact(dir.path())?, Some(newer));
        Ok(())
    }

    #[test]
    fn fallback_processes_the_newer_of_two_local_files() -> Result<()> {
        use crate::config::NcdbConfig;
        use crate::process;

        let bronze = TempDir::new()?;
        let silver = TempDir::new()?;

        fs::write(
            bronze.path().join("ncdb_20240101_000000.csv"),
            "C_YEAR,C_SEV\n2012,1\n2012,2\n",
        )?;
        thread::sleep(Duration::from_millis(20));
        let newer = bronze.path().join("ncdb_20240601_000000.csv");
        fs::write(&newer, "C_YEAR,C_SEV\n2012,1\n2012,2\n2021,1\n")?;

        let picked = latest_local_artifact(bronze.path())?.expect("a local artifact");
        assert_eq!(picked, newer);

        let cfg = NcdbConfig {
            silver_dir: silver.path().display().to_string(),
            ..NcdbConfig::default()
        };
        let out = process::run(&picked, &cfg)?;
        assert!(out.exists());
        Ok(())
    }

    #[test]
    fn ignores_sidecars_and_unrelated_files() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("ncdb_20240101_000000.json"), "{}")?;
        fs::write(dir.path().join("notes.txt"), "n/a")?;
        assert!(latest_local_artifact(dir.path())?.is_none());

        let zip = dir.path().join("ncdb_20240101_000000.zip");
        fs::write(&zip, "PK")?;
        assert_eq!(latest_local_artifact(dir.path())?, Some(zip));
        Ok(())
    }
}
