// # Directory Resolver Trait
//
// Defines the interface for obtaining the list of currently registered
// phones from the cluster.
//
// ## Implementations
//
// - CUCM AXL + RIS: `itl-directory-cucm` crate
//
// ## Usage
//
// ```rust,ignore
// use itl_core::DirectoryResolver;
//
// let directory = registry.create_directory(&config.directory)?;
// directory.check_connectivity().await?;
// let names = directory.device_names().await?;
// let devices = directory.registered_devices(&names).await?;
// ```

use async_trait::async_trait;

use crate::device::Device;

/// Trait for directory resolver implementations
///
/// Every failure here (authentication, timeout, malformed response) is an
/// error that halts the workflow before any phone is probed.
#[async_trait]
pub trait DirectoryResolver: Send + Sync {
    /// Verify that the cluster APIs are reachable with the given credentials
    ///
    /// # Returns
    ///
    /// - `Ok(())`: All APIs answered successfully
    /// - `Err(Error)`: Unreachable, or credentials rejected
    async fn check_connectivity(&self) -> Result<(), crate::Error>;

    /// List the names of every device known to the cluster
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<String>)`: Device names, possibly empty
    /// - `Err(Error)`: The query failed or the answer was malformed
    async fn device_names(&self) -> Result<Vec<String>, crate::Error>;

    /// Look up which of `names` are currently registered, with their IPs
    ///
    /// Devices come back with [`crate::Verdict::Unknown`] and a non-empty IP
    /// address, each name at most once. An empty vector means none of them
    /// is registered.
    async fn registered_devices(&self, names: &[String]) -> Result<Vec<Device>, crate::Error>;

    /// Get the directory name (for logging/debugging)
    fn directory_name(&self) -> &'static str;
}

/// Helper trait for constructing directory resolvers from configuration
pub trait DirectoryFactory: Send + Sync {
    /// Create a DirectoryResolver instance from configuration
    fn create(
        &self,
        config: &crate::config::DirectoryConfig,
    ) -> Result<Box<dyn DirectoryResolver>, crate::Error>;
}
