// # CSV Report Sink
//
// Writes the mismatch list as a two-column CSV file.
//
// ## File Format
//
// ```text
// Device Name,IP Address
// SEP001122334455,10.0.0.1
// SEP00AABBCCDDEE,10.0.0.7
// ```
//
// ## Atomicity
//
// The file is written to `<path>.tmp` and renamed into place, so a crash
// mid-write never leaves a truncated report behind.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::config::ReportConfig;
use crate::evaluator::Mismatch;
use crate::traits::{ReportSink, ReportSinkFactory};

/// Column headers of the report
const CSV_HEADER: [&str; 2] = ["Device Name", "IP Address"];

/// CSV file report sink
#[derive(Debug, Clone)]
pub struct CsvReportSink {
    path: PathBuf,
}

impl CsvReportSink {
    /// Create a sink writing to `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Output path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encode the mismatch list
    fn encode(mismatches: &[Mismatch]) -> Result<Vec<u8>, Error> {
        let mut writer = ::csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;
        for mismatch in mismatches {
            writer.write_record([mismatch.name.as_str(), mismatch.ip_address.as_str()])?;
        }
        writer
            .into_inner()
            .map_err(|e| Error::report(format!("Failed to finish CSV encoding: {}", e)))
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        PathBuf::from(temp)
    }
}

/// Create `temp_path` and write `bytes` to it
async fn write_temp(temp_path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let mut file = fs::File::create(temp_path).await.map_err(|e| {
        Error::report(format!(
            "Failed to create temp file {}: {}",
            temp_path.display(),
            e
        ))
    })?;

    file.write_all(bytes).await.map_err(|e| {
        Error::report(format!(
            "Failed to write to temp file {}: {}",
            temp_path.display(),
            e
        ))
    })?;

    file.flush().await.map_err(|e| {
        Error::report(format!(
            "Failed to flush temp file {}: {}",
            temp_path.display(),
            e
        ))
    })
}

#[async_trait]
impl ReportSink for CsvReportSink {
    async fn write(&self, mismatches: &[Mismatch]) -> Result<(), Error> {
        let bytes = Self::encode(mismatches)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::report(format!(
                    "Failed to create report directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp_path = self.temp_path();
        let written = async {
            write_temp(&temp_path, &bytes).await?;
            fs::rename(&temp_path, &self.path).await.map_err(|e| {
                Error::report(format!(
                    "Failed to rename {} to {}: {}",
                    temp_path.display(),
                    self.path.display(),
                    e
                ))
            })
        }
        .await;

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&temp_path).await
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!(
                    "Failed to remove temp file {}: {}",
                    temp_path.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        tracing::info!(
            "Wrote {} mismatch(es) to {}",
            mismatches.len(),
            self.path.display()
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Factory for CSV report sinks
pub struct CsvReportFactory;

impl ReportSinkFactory for CsvReportFactory {
    fn create(&self, config: &ReportConfig) -> Result<Box<dyn ReportSink>, Error> {
        match config {
            ReportConfig::Csv { path } => Ok(Box::new(CsvReportSink::new(path))),
            _ => Err(Error::config("Invalid config for CSV report sink")),
        }
    }
}
