// src/process/write.rs

use crate::process::Dataset;
use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, StringBuilder},
    datatypes::{DataType, Field, Schema as ArrowSchema},
    record_batch::RecordBatch,
};
use parquet::arrow::ArrowWriter;
use parquet::basic::{BrotliLevel, Compression};
use parquet::file::properties::WriterProperties;
use std::{fs, fs::File, path::Path, sync::Arc};
use tracing::{debug, instrument};

pub const INGESTION_COLUMN: &str = "ingestion_date";
pub const SOURCE_COLUMN: &str = "source_file";

/// A dataset ready for the silver layer: every original column verbatim,
/// plus run-constant `ingestion_date` and `source_file` columns.
#[derive(Debug, PartialEq, Eq)]
pub struct ProcessedDataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Append the two provenance columns to every row. Nothing is removed or
/// renamed; identical arguments on identical input give identical output.
pub fn augment(data: &Dataset, ingestion_date: &str, source_file: &str) -> ProcessedDataset {
    let mut headers = data.headers().to_vec();
    headers.push(INGESTION_COLUMN.to_string());
    headers.push(SOURCE_COLUMN.to_string());

    let rows = data
        .rows()
        .iter()
        .map(|row| {
            let mut out = row.clone();
            out.push(ingestion_date.to_string());
            out.push(source_file.to_string());
            out
        })
        .collect();

    ProcessedDataset { headers, rows }
}

/// Persist as a single Parquet snapshot, all columns Utf8. The batch is
/// written to a `.tmp` path and renamed, so readers never see a partial file.
#[instrument(level = "info", skip(data, out_path), fields(out = %out_path.as_ref().display()))]
pub fn write_parquet(data: &ProcessedDataset, out_path: impl AsRef<Path>) -> Result<()> {
    let out_path = out_path.as_ref();

    let fields: Vec<Field> = data
        .headers
        .iter()
        .map(|h| Field::new(h.as_str(), DataType::Utf8, true))
        .collect();
    let schema = Arc::new(ArrowSchema::new(fields));

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(data.headers.len());
    for col in 0..data.headers.len() {
        let mut builder = StringBuilder::new();
        for row in &data.rows {
            // flexible CSV input can leave short rows; missing cells are null
            builder.append_option(row.get(col).map(String::as_str));
        }
        columns.push(Arc::new(builder.finish()) as ArrayRef);
    }

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    debug!(rows = batch.num_rows(), cols = batch.num_columns(), "writing batch");

    let props = WriterProperties::builder()
        .set_compression(Compression::BROTLI(
            BrotliLevel::try_new(5).expect("valid brotli level"),
        ))
        .set_dictionary_enabled(true)
        .build();

    let temp_path = out_path.with_extension("tmp");
    let file = File::create(&temp_path)
        .with_context(|| format!("creating {}", temp_path.display()))?;
    let mut writer =
        ArrowWriter::try_new(file, schema, Some(props)).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;

    fs::rename(&temp_path, out_path)
        .with_context(|| format!("renaming {} into place", temp_path.display()))?;
    Ok(())
}
