// src/fetch/catalog.rs

use crate::error::FetchError;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};

/// One downloadable resource as described by the CKAN `package_show` action.
/// Unknown fields in the response are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    pub name: String,
    pub url: String,
    pub format: String,
    #[serde(default)]
    pub last_modified: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PackageShow {
    result: PackageResult,
}

#[derive(Debug, Deserialize)]
struct PackageResult {
    resources: Vec<Resource>,
}

/// Formats we can ingest. The portal labels these inconsistently
/// ("csv", "CSV", "Zip"), so compare case-insensitively.
pub fn is_data_format(format: &str) -> bool {
    matches!(format.to_uppercase().as_str(), "CSV" | "ZIP")
}

/// Build the `package_show` endpoint from a dataset page URL like
/// `https://open.canada.ca/data/en/dataset/<package-id>`.
pub fn package_show_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let package_id = base.rsplit('/').next().unwrap_or(base);
    let root = base
        .split("/en/dataset/")
        .next()
        .unwrap_or(base)
        .trim_end_matches('/');
    format!("{}/api/3/action/package_show?id={}", root, package_id)
}

/// Query the catalog for the dataset's resource list.
#[instrument(level = "info", skip(client))]
pub async fn fetch_resources(client: &Client, base_url: &str) -> Result<Vec<Resource>, FetchError> {
    let api_url = package_show_url(base_url);
    debug!(%api_url, "fetching package metadata");

    let pkg: PackageShow = client
        .get(&api_url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    info!(
        total = pkg.result.resources.len(),
        "catalog returned resources"
    );
    Ok(pkg.result.resources)
}

/// Select the first CSV/ZIP resource, in catalog order.
pub fn first_data_resource(resources: &[Resource]) -> Result<&Resource, FetchError> {
    resources
        .iter()
        .find(|r| is_data_format(&r.format))
        .ok_or(FetchError::NoResourceFound)
}
