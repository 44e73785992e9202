// src/fetch/download.rs

use crate::error::FetchError;
use crate::fetch::catalog::Resource;
use chrono::Local;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Sidecar record written next to every downloaded artifact. Written once,
/// never updated.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub download_timestamp: String,
    pub source_url: String,
    pub resource_name: String,
    pub format: String,
    pub last_modified: Option<String>,
    pub file_path: String,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> FetchError + '_ {
    move |source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Download `resource` into `bronze_dir` under a capture-timestamped name,
/// write the JSON sidecar, and return the artifact path.
///
/// The payload lands in a `.tmp` file first and is renamed into place, so a
/// partial download is never visible under the final name.
#[instrument(level = "info", skip(client, resource, bronze_dir), fields(name = %resource.name))]
pub async fn download_resource(
    client: &Client,
    resource: &Resource,
    bronze_dir: impl AsRef<Path>,
) -> Result<PathBuf, FetchError> {
    let bronze_dir = bronze_dir.as_ref();
    fs::create_dir_all(bronze_dir)
        .await
        .map_err(io_err(bronze_dir))?;

    let ext = if resource.format.to_uppercase().contains("CSV") {
        "csv"
    } else {
        "zip"
    };
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let dest = bronze_dir.join(format!("ncdb_{}.{}", timestamp, ext));

    info!(url = %resource.url, dest = %dest.display(), "downloading resource");
    let bytes = client
        .get(&resource.url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    let tmp = dest.with_extension(format!("{}.tmp", ext));
    fs::write(&tmp, &bytes).await.map_err(io_err(&tmp))?;
    fs::rename(&tmp, &dest).await.map_err(io_err(&dest))?;
    info!(bytes = bytes.len(), "saved artifact");

    write_metadata(&dest, resource).await?;
    Ok(dest)
}

async fn write_metadata(artifact: &Path, resource: &Resource) -> Result<(), FetchError> {
    let metadata = ResourceMetadata {
        download_timestamp: Local::now().to_rfc3339(),
        source_url: resource.url.clone(),
        resource_name: resource.name.clone(),
        format: resource.format.clone(),
        last_modified: resource.last_modified.clone(),
        file_path: artifact.display().to_string(),
    };

    let sidecar = artifact.with_extension("json");
    let body = serde_json::to_string_pretty(&metadata).expect("metadata serializes");
    fs::write(&sidecar, body).await.map_err(io_err(&sidecar))?;
    info!(sidecar = %sidecar.display(), "wrote metadata sidecar");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_round_trips_with_expected_field_names() {
        let metadata = ResourceMetadata {
            download_timestamp: "2025-01-15T10:00:00-05:00".to_string(),
            source_url: "https://example.org/ncdb.csv".to_string(),
            resource_name: "NCDB 1999-2022".to_string(),
            format: "CSV".to_string(),
            last_modified: None,
            file_path: "data/bronze/ncdb/ncdb_20250115_100000.csv".to_string(),
        };

        let json = serde_json::to_string_pretty(&metadata).unwrap();
        for key in [
            "download_timestamp",
            "source_url",
            "resource_name",
            "format",
            "last_modified",
            "file_path",
        ] {
            assert!(json.contains(key), "missing key {} in {}", key, json);
        }

        let back: ResourceMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back.resource_name, metadata.resource_name);
        assert!(back.last_modified.is_none());
    }
}
