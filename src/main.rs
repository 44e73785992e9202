use anyhow::{bail, Context, Result};
use ncdbscraper::{
    config::Config,
    error::FetchError,
    fetch::{self, catalog},
    process,
};
use reqwest::Client;
use std::{fs, path::PathBuf, time::Duration};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) config + dirs ────────────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "manifest.yaml".to_string());
    let cfg = Config::load(&config_path)?;
    fs::create_dir_all(&cfg.ncdb.bronze_dir)
        .with_context(|| format!("creating {}", cfg.ncdb.bronze_dir))?;

    let client = Client::builder()
        .timeout(Duration::from_secs(cfg.ncdb.timeout_secs))
        .build()
        .context("building http client")?;

    // ─── 3) retrieve: remote first, then local fallback ──────────────
    let raw_file = match retrieve(&client, &cfg).await {
        Ok(path) => path,
        Err(e) => {
            warn!(error = %e, "automated retrieval failed; scanning bronze directory");
            match fetch::latest_local_artifact(&cfg.ncdb.bronze_dir)? {
                Some(path) => {
                    info!(path = %path.display(), "processing most recent local artifact");
                    path
                }
                None => {
                    error!("no raw NCDB files available");
                    print_manual_instructions(&cfg);
                    bail!("no data file available; download manually and re-run");
                }
            }
        }
    };

    // ─── 4) correct + persist ────────────────────────────────────────
    let out = process::run(&raw_file, &cfg.ncdb)?;
    info!(out = %out.display(), "NCDB extraction complete");
    Ok(())
}

/// Resolve the dataset's resources from the catalog and download the first
/// CSV/ZIP one. Single attempt; recovery is the caller's local scan.
async fn retrieve(client: &Client, cfg: &Config) -> Result<PathBuf, FetchError> {
    let resources = catalog::fetch_resources(client, &cfg.ncdb.base_url).await?;
    let usable = resources
        .iter()
        .filter(|r| catalog::is_data_format(&r.format))
        .count();
    info!(usable, "found data resources");

    let resource = catalog::first_data_resource(&resources)?;
    fetch::download_resource(client, resource, &cfg.ncdb.bronze_dir).await
}

fn print_manual_instructions(cfg: &Config) {
    info!("manual download instructions:");
    info!("1. visit: https://wwwapps2.tc.gc.ca/saf-sec-sur/7/ncdb-bndc/p.aspx?l=en");
    info!(
        "2. use the NCDB Online wizard: years {}-{}, variables C_YEAR, C_MNTH, C_WDAY, C_SEV, C_VEHS, P_SEX, P_AGE, download as CSV",
        cfg.ncdb.years.start, cfg.ncdb.years.end
    );
    info!(
        "3. save the file to: {}/ncdb_manual_download.csv",
        cfg.ncdb.bronze_dir
    );
}
