//! Core traits for the ITL mismatch detector
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`Prober`]: One reachability check against one phone
//! - [`DirectoryResolver`]: List registered phones from the cluster
//! - [`ReportSink`]: Persist detected mismatches
//! - [`OperatorGate`]: Wait for the operator's manual step

pub mod prober;
pub mod directory;
pub mod report_sink;
pub mod operator_gate;

pub use prober::{Prober, ProberFactory};
pub use directory::{DirectoryResolver, DirectoryFactory};
pub use report_sink::{ReportSink, ReportSinkFactory};
pub use operator_gate::{OperatorGate, AssumeYes};
