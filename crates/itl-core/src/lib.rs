// # itl-core
//
// Core library for the ITL mismatch detector.
//
// A phone whose Identity Trust List does not match the cluster keeps
// serving (or refusing) its web page regardless of what the cluster tells
// it. Flipping web access centrally and probing every phone twice exposes
// exactly those phones.
//
// ## Architecture Overview
//
// - **DirectoryResolver**: Trait for listing the registered phones
// - **Prober**: Trait for a single reachability check against one phone
// - **ProbeEngine**: Probes a device list with bounded concurrency
// - **MismatchEvaluator**: Compares runs against the expected verdicts
// - **ReportSink**: Trait for persisting the mismatches
// - **DetectionWorkflow**: Connectivity, resolve, phases, evaluate, report
// - **ComponentRegistry**: Plugin-based registry for the trait implementations
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Failure Transparency**: A broken phone is a verdict, never an error
// 3. **Plugin-Based**: Backends are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library

pub mod device;
pub mod traits;
pub mod engine;
pub mod evaluator;
pub mod workflow;
pub mod registry;
pub mod config;
pub mod error;
pub mod report;

// Re-export core types for convenience
pub use device::{Device, ProbeOutcome, Verdict};
pub use traits::{DirectoryResolver, OperatorGate, Prober, ReportSink};
pub use engine::{ProbeEngine, ProbeEvent};
pub use evaluator::{Mismatch, MismatchEvaluator};
pub use workflow::{DetectionWorkflow, ManualAction, Phase, WorkflowOutcome};
pub use registry::ComponentRegistry;
pub use config::{
    DetectorConfig, DirectoryConfig, EngineConfig, ProberConfig, ReportConfig, WorkflowMode,
};
pub use error::{Error, Result};
pub use report::{CsvReportSink, MemoryReportSink};
