use crate::config::OutputOptions;
use crate::error::{OutputError, Result, RunError};
use chrono::Local;
use sifter_scanner::UniformRecord;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Run timestamp used in output file names
pub fn run_timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Files produced by one write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrittenFiles {
    pub csv: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

impl WrittenFiles {
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.csv.iter().chain(self.json.iter())
    }
}

/// Writes reconciled records as CSV and/or JSON files
pub struct OutputSink {
    options: OutputOptions,
}

impl OutputSink {
    pub fn new(options: OutputOptions) -> Self {
        Self { options }
    }

    pub fn file_path(&self, timestamp: &str, extension: &str) -> PathBuf {
        self.options
            .dir
            .join(format!("{}_{}.{}", self.options.base_name, timestamp, extension))
    }

    pub fn write(&self, columns: &[String], records: &[UniformRecord]) -> Result<WrittenFiles> {
        self.write_at(&run_timestamp(), columns, records)
    }

    /// Write every configured format, stamping file names with `timestamp`
    pub fn write_at(
        &self,
        timestamp: &str,
        columns: &[String],
        records: &[UniformRecord],
    ) -> Result<WrittenFiles> {
        fs::create_dir_all(&self.options.dir).map_err(|e| RunError::Output {
            path: self.options.dir.clone(),
            source: e.into(),
        })?;

        let mut written = WrittenFiles::default();
        let format = self.options.format;

        if format.writes_csv() {
            let path = self.file_path(timestamp, "csv");
            write_csv(&path, columns, records).map_err(|source| RunError::Output {
                path: path.clone(),
                source,
            })?;
            info!("Wrote {} record(s) to {}", records.len(), path.display());
            written.csv = Some(path);
        }

        if format.writes_json() {
            let path = self.file_path(timestamp, "json");
            write_json(&path, records).map_err(|source| RunError::Output {
                path: path.clone(),
                source,
            })?;
            info!("Wrote {} record(s) to {}", records.len(), path.display());
            written.json = Some(path);
        }

        Ok(written)
    }
}

/// Header row is `columns`; unavailable values are written as the marker
pub fn write_csv(
    path: &Path,
    columns: &[String],
    records: &[UniformRecord],
) -> std::result::Result<(), OutputError> {
    debug!("Writing CSV to {}", path.display());
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(columns)?;
    for record in records {
        writer.write_record(record.values().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Pretty-printed array of objects in column order, unavailable as `null`
pub fn write_json(path: &Path, records: &[UniformRecord]) -> std::result::Result<(), OutputError> {
    debug!("Writing JSON to {}", path.display());
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
