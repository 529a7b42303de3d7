//! Plugin-based component registry
//!
//! The registry lets directory resolvers, probers and report sinks be
//! registered at runtime, so the binary never hardcodes which backend
//! backs which config variant.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use itl_core::registry::ComponentRegistry;
//!
//! let registry = ComponentRegistry::with_builtin_sinks();
//! itl_directory_cucm::register(&registry);
//! itl_probe_http::register(&registry);
//!
//! let directory = registry.create_directory(&config.directory)?;
//! let prober_factory = registry.prober_factory(&config.prober)?;
//! let sink = registry.create_report_sink(&config.report)?;
//! ```
//!
//! ## Registration
//!
//! Implementation crates expose a `register` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &ComponentRegistry) {
//!     registry.register_prober("http", Arc::new(HttpProberFactory));
//! }
//! ```

use crate::config::{DirectoryConfig, ProberConfig, ReportConfig};
use crate::error::{Error, Result};
use crate::report::{CsvReportFactory, MemoryReportFactory};
use crate::traits::{DirectoryFactory, DirectoryResolver, ProberFactory, ReportSink, ReportSinkFactory};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Component registry for plugin-based construction
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes. A poisoned lock still holds a consistent map
/// (inserts are single operations), so it is read through.
#[derive(Default)]
pub struct ComponentRegistry {
    /// Registered directory factories
    directories: RwLock<HashMap<String, Box<dyn DirectoryFactory>>>,

    /// Registered prober factories
    ///
    /// Shared rather than boxed: the engine keeps its factory for the whole
    /// workflow and calls it once per probe run.
    probers: RwLock<HashMap<String, Arc<dyn ProberFactory>>>,

    /// Registered report sink factories
    report_sinks: RwLock<HashMap<String, Box<dyn ReportSinkFactory>>>,
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the `csv` and `memory` report sinks registered
    pub fn with_builtin_sinks() -> Self {
        let registry = Self::new();
        registry.register_report_sink("csv", Box::new(CsvReportFactory));
        registry.register_report_sink("memory", Box::new(MemoryReportFactory));
        registry
    }

    /// Register a directory factory
    ///
    /// # Parameters
    ///
    /// - `name`: Directory type name (e.g., "cucm")
    /// - `factory`: Factory object for creating resolver instances
    pub fn register_directory(&self, name: impl Into<String>, factory: Box<dyn DirectoryFactory>) {
        let mut directories = self
            .directories
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        directories.insert(name.into(), factory);
    }

    /// Register a prober factory
    ///
    /// # Parameters
    ///
    /// - `name`: Prober type name (e.g., "http")
    /// - `factory`: Factory object, called once per probe run
    pub fn register_prober(&self, name: impl Into<String>, factory: Arc<dyn ProberFactory>) {
        let mut probers = self.probers.write().unwrap_or_else(PoisonError::into_inner);
        probers.insert(name.into(), factory);
    }

    /// Register a report sink factory
    pub fn register_report_sink(
        &self,
        name: impl Into<String>,
        factory: Box<dyn ReportSinkFactory>,
    ) {
        let mut sinks = self
            .report_sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        sinks.insert(name.into(), factory);
    }

    /// Create a directory resolver from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DirectoryResolver>)`: Created resolver instance
    /// - `Err(Error)`: If the type is not registered or creation fails
    pub fn create_directory(&self, config: &DirectoryConfig) -> Result<Box<dyn DirectoryResolver>> {
        let directory_type = config.type_name();
        let directories = self
            .directories
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = directories
            .get(directory_type)
            .ok_or_else(|| Error::config(format!("Unknown directory type: {}", directory_type)))?;

        factory.create(config)
    }

    /// Look up the prober factory for a configuration
    ///
    /// Unlike the other lookups this does not build anything yet: the
    /// factory goes to the [`crate::ProbeEngine`], which opens one prober
    /// session per run.
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn ProberFactory>)`: The registered factory
    /// - `Err(Error)`: If the prober type is not registered
    pub fn prober_factory(&self, config: &ProberConfig) -> Result<Arc<dyn ProberFactory>> {
        let prober_type = config.type_name();
        let probers = self.probers.read().unwrap_or_else(PoisonError::into_inner);

        probers
            .get(prober_type)
            .cloned()
            .ok_or_else(|| Error::config(format!("Unknown prober type: {}", prober_type)))
    }

    /// Create a report sink from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn ReportSink>)`: Created sink instance
    /// - `Err(Error)`: If the sink type is not registered or creation fails
    pub fn create_report_sink(&self, config: &ReportConfig) -> Result<Box<dyn ReportSink>> {
        let sink_type = config.type_name();
        let sinks = self
            .report_sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = sinks
            .get(sink_type)
            .ok_or_else(|| Error::config(format!("Unknown report sink type: {}", sink_type)))?;

        factory.create(config)
    }

    /// List all registered directory types
    pub fn list_directories(&self) -> Vec<String> {
        let directories = self
            .directories
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        directories.keys().cloned().collect()
    }

    /// List all registered prober types
    pub fn list_probers(&self) -> Vec<String> {
        let probers = self.probers.read().unwrap_or_else(PoisonError::into_inner);
        probers.keys().cloned().collect()
    }

    /// List all registered report sink types
    pub fn list_report_sinks(&self) -> Vec<String> {
        let sinks = self
            .report_sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        sinks.keys().cloned().collect()
    }

    /// Check if a directory type is registered
    pub fn has_directory(&self, name: &str) -> bool {
        let directories = self
            .directories
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        directories.contains_key(name)
    }

    /// Check if a prober type is registered
    pub fn has_prober(&self, name: &str) -> bool {
        let probers = self.probers.read().unwrap_or_else(PoisonError::into_inner);
        probers.contains_key(name)
    }

    /// Check if a report sink type is registered
    pub fn has_report_sink(&self, name: &str) -> bool {
        let sinks = self
            .report_sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        sinks.contains_key(name)
    }
}
