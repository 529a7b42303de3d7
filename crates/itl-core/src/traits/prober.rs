// # Prober Trait
//
// Defines the interface for a single reachability check against one phone.
//
// ## Implementations
//
// - Plain HTTP GET: `itl-probe-http` crate
//
// ## Session Scope
//
// A `Prober` instance is one probe session: it owns whatever connection
// pool it needs. The engine obtains a fresh prober from a `ProberFactory`
// at the start of every `probe_all` run and drops it before returning, so
// no connections outlive the run that opened them.
//
// ## Usage
//
// ```rust,ignore
// use itl_core::traits::{Prober, ProberFactory};
//
// let prober = factory.create(&config.prober)?;
// let outcome = prober.probe("10.0.0.1").await;
// println!("10.0.0.1: {}", outcome);
// ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::device::ProbeOutcome;

/// Trait for prober implementations
///
/// # Contract
///
/// - Exactly one attempt per call. Retries are not part of the contract.
/// - Never fails the caller: every failure mode is folded into a
///   [`ProbeOutcome`].
/// - Must be safe to call concurrently from many tasks; the engine shares
///   one instance across the whole in-flight window.
/// - Should honour its own timeout, but the engine also wraps every call in
///   a deadline and treats expiry as [`ProbeOutcome::TimedOut`].
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe a single target
    ///
    /// # Parameters
    ///
    /// - `ip_address`: Device IP address or hostname as reported by the
    ///   directory (no scheme, no path)
    async fn probe(&self, ip_address: &str) -> ProbeOutcome;

    /// Get the prober name (for logging/debugging)
    fn prober_name(&self) -> &'static str;
}

/// Helper trait for constructing probers from configuration
///
/// Called once per probe run. Implementations should build a fresh
/// connection pool on every call.
pub trait ProberFactory: Send + Sync {
    /// Create a Prober instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Prober configuration
    ///
    /// # Returns
    ///
    /// A shared Prober trait object
    fn create(
        &self,
        config: &crate::config::ProberConfig,
    ) -> Result<Arc<dyn Prober>, crate::Error>;
}
