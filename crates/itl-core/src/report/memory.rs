// # Memory Report Sink
//
// Keeps written mismatches in memory instead of on disk.
//
// ## When to Use
//
// - Dry runs where the operator only wants the console summary
// - Tests that inspect what the workflow reported

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::ReportConfig;
use crate::evaluator::Mismatch;
use crate::traits::{ReportSink, ReportSinkFactory};

/// In-memory report sink
///
/// Clones share the same storage, so a test can keep one handle and pass
/// another to the workflow.
#[derive(Debug, Clone, Default)]
pub struct MemoryReportSink {
    inner: Arc<RwLock<Vec<Mismatch>>>,
}

impl MemoryReportSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Mismatches from the most recent write
    pub async fn mismatches(&self) -> Vec<Mismatch> {
        self.inner.read().await.clone()
    }
}

#[async_trait]
impl ReportSink for MemoryReportSink {
    async fn write(&self, mismatches: &[Mismatch]) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        *guard = mismatches.to_vec();
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// Factory for memory report sinks
pub struct MemoryReportFactory;

impl ReportSinkFactory for MemoryReportFactory {
    fn create(&self, config: &ReportConfig) -> Result<Box<dyn ReportSink>, Error> {
        match config {
            ReportConfig::Memory => Ok(Box::new(MemoryReportSink::new())),
            _ => Err(Error::config("Invalid config for memory report sink")),
        }
    }
}
