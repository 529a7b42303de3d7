// # Report Sink Trait
//
// Defines where detected mismatches end up.
//
// ## Implementations
//
// - CSV file (default): `report::CsvReportSink`
// - In-memory: `report::MemoryReportSink`

use async_trait::async_trait;

use crate::evaluator::Mismatch;

/// Trait for report sink implementations
///
/// The workflow calls `write` at most once per run, and only when there is
/// at least one mismatch.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Persist the mismatch list
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Written completely
    /// - `Err(Error)`: Nothing usable was written
    async fn write(&self, mismatches: &[Mismatch]) -> Result<(), crate::Error>;

    /// Human-readable destination (file path, "memory", ...)
    fn location(&self) -> String;
}

/// Helper trait for constructing report sinks from configuration
pub trait ReportSinkFactory: Send + Sync {
    /// Create a ReportSink instance from configuration
    fn create(
        &self,
        config: &crate::config::ReportConfig,
    ) -> Result<Box<dyn ReportSink>, crate::Error>;
}
