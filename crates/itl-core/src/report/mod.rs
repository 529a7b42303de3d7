//! Report sink implementations

pub mod csv;
pub mod memory;

pub use self::csv::{CsvReportFactory, CsvReportSink};
pub use self::memory::{MemoryReportFactory, MemoryReportSink};
