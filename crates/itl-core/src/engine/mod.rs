//! Bounded probe engine
//!
//! The ProbeEngine is responsible for:
//! - Opening one probe session per run (via `ProberFactory`)
//! - Probing every device exactly once, at most N at a time
//! - Mapping each probe outcome to a verdict
//! - Absorbing every per-device failure into that verdict
//!
//! ## Architecture
//!
//! ```text
//!  Vec<Device> ──► pending iterator ──┐
//!                                     │ refill while in_flight < limit
//!                                     ▼
//!                            ┌──────────────────┐
//!                            │ JoinSet (window) │──► probe_device ──► Prober
//!                            └──────────────────┘        (deadline)
//!                                     │ join_next
//!                                     ▼
//!                           results (completion order)
//! ```
//!
//! ## Window Flow
//!
//! 1. Fill the window with the first `limit` devices, in input order
//! 2. Wait for any probe to finish and record its device
//! 3. Pull the next pending device into the freed slot
//! 4. Stop when the iterator is exhausted and the window is empty

use crate::config::{EngineConfig, ProberConfig};
use crate::device::{Device, ProbeOutcome, Verdict};
use crate::error::{Error, Result};
use crate::traits::{Prober, ProberFactory};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::{Id, JoinSet};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Events emitted by the ProbeEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    /// A probe run started
    RunStarted {
        device_count: usize,
        concurrency_limit: usize,
    },

    /// A device entered the in-flight window
    ProbeStarted {
        name: String,
        ip_address: String,
    },

    /// A device left the in-flight window with a verdict
    ProbeCompleted {
        name: String,
        ip_address: String,
        outcome: ProbeOutcome,
        verdict: Verdict,
    },

    /// Every device of the run has a verdict
    RunFinished {
        reachable: usize,
        unreachable: usize,
        elapsed: Duration,
    },
}

/// Bounded-concurrency probe engine
///
/// ## Lifecycle
///
/// 1. Create with [`ProbeEngine::new()`]
/// 2. Call [`ProbeEngine::probe_all()`] (or [`ProbeEngine::run()`]) once per phase
/// 3. Drop to cleanup
///
/// Runs are independent: each one creates its own prober (and with it its
/// own connection pool) and releases it before returning.
///
/// ## Failure Transparency
///
/// A probe that times out, is refused, gets a non-200 answer or even panics
/// yields an `Unreachable` device. Nothing a single phone does can abort or
/// stall the rest of the batch beyond that probe's own deadline.
pub struct ProbeEngine {
    /// Creates one prober per run
    factory: Arc<dyn ProberFactory>,

    /// Configuration handed to the factory
    prober_config: ProberConfig,

    /// Default window size for [`ProbeEngine::run()`]
    concurrency_limit: NonZeroUsize,

    /// Deadline applied around every probe
    probe_timeout: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ProbeEvent>,
}

impl ProbeEngine {
    /// Create a new probe engine
    ///
    /// # Parameters
    ///
    /// - `factory`: Prober factory, called at the start of every run
    /// - `prober_config`: Configuration passed to the factory
    /// - `config`: Engine settings
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields probe events
    pub fn new(
        factory: Arc<dyn ProberFactory>,
        prober_config: ProberConfig,
        config: EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<ProbeEvent>)> {
        config.validate()?;
        prober_config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            factory,
            prober_config,
            concurrency_limit: config.concurrency_limit()?,
            probe_timeout: config.probe_timeout(),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Configured window size
    pub fn concurrency_limit(&self) -> NonZeroUsize {
        self.concurrency_limit
    }

    /// Probe all devices with the configured concurrency limit
    pub async fn run(&self, devices: Vec<Device>) -> Result<Vec<Device>> {
        self.probe_all(devices, self.concurrency_limit).await
    }

    /// Probe every device once, at most `concurrency_limit` at a time
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Device>)`: One entry per input device, in completion order,
    ///   each with its verdict set
    /// - `Err(Error::InvalidInput)`: A device has no IP address (checked
    ///   before anything is sent)
    /// - `Err(Error)`: The prober session could not be opened
    ///
    /// Probe failures never surface as `Err`.
    pub async fn probe_all(
        &self,
        devices: Vec<Device>,
        concurrency_limit: NonZeroUsize,
    ) -> Result<Vec<Device>> {
        if devices.is_empty() {
            debug!("No devices to probe");
            return Ok(Vec::new());
        }

        if let Some(device) = devices.iter().find(|d| d.ip_address().trim().is_empty()) {
            return Err(Error::invalid_input(format!(
                "Device {} has no IP address",
                device.name()
            )));
        }

        let prober = self.factory.create(&self.prober_config)?;
        let total = devices.len();
        let limit = concurrency_limit.get();
        let started = Instant::now();
        let mut dropped_events = 0usize;

        info!(
            "Probing {} device(s) with {} (concurrency limit {}, timeout {:?})",
            total,
            prober.prober_name(),
            limit,
            self.probe_timeout
        );
        self.emit_event(
            ProbeEvent::RunStarted {
                device_count: total,
                concurrency_limit: limit,
            },
            &mut dropped_events,
        );

        let mut pending = devices.into_iter();
        let mut in_flight: JoinSet<(Device, ProbeOutcome)> = JoinSet::new();
        // Identity of every in-flight device, so a panicked task still
        // produces a result for the device it owned
        let mut owners: HashMap<Id, (String, String)> = HashMap::with_capacity(limit);
        let mut results = Vec::with_capacity(total);

        loop {
            while in_flight.len() < limit {
                let Some(device) = pending.next() else {
                    break;
                };

                self.emit_event(
                    ProbeEvent::ProbeStarted {
                        name: device.name().to_string(),
                        ip_address: device.ip_address().to_string(),
                    },
                    &mut dropped_events,
                );

                let identity = (device.name().to_string(), device.ip_address().to_string());
                let handle = in_flight.spawn(probe_device(
                    Arc::clone(&prober),
                    device,
                    self.probe_timeout,
                ));
                owners.insert(handle.id(), identity);
            }

            let Some(joined) = in_flight.join_next_with_id().await else {
                break;
            };

            let (device, outcome) = match joined {
                Ok((id, finished)) => {
                    owners.remove(&id);
                    finished
                }
                Err(join_error) => {
                    let Some((name, ip_address)) = owners.remove(&join_error.id()) else {
                        error!("Probe task failed for an untracked device: {}", join_error);
                        continue;
                    };
                    error!("Probe task for {} ({}) failed: {}", name, ip_address, join_error);
                    let outcome = ProbeOutcome::Transport(format!("probe task failed: {}", join_error));
                    let device =
                        Device::new(name, ip_address).with_verdict(Verdict::from_outcome(&outcome));
                    (device, outcome)
                }
            };

            self.emit_event(
                ProbeEvent::ProbeCompleted {
                    name: device.name().to_string(),
                    ip_address: device.ip_address().to_string(),
                    outcome,
                    verdict: device.web_access(),
                },
                &mut dropped_events,
            );
            results.push(device);
        }

        // Release the session's connection pool before handing results back
        drop(prober);

        let reachable = results.iter().filter(|d| d.web_access().is_reachable()).count();
        let unreachable = results.len() - reachable;
        let elapsed = started.elapsed();

        info!(
            "Probe run finished in {:?}: {} reachable, {} unreachable",
            elapsed, reachable, unreachable
        );
        self.emit_event(
            ProbeEvent::RunFinished {
                reachable,
                unreachable,
                elapsed,
            },
            &mut dropped_events,
        );

        if dropped_events > 0 {
            warn!(
                "Event channel full, dropped {} event(s). Consider increasing event_channel_capacity.",
                dropped_events
            );
        }

        Ok(results)
    }

    /// Probe a single device in its own session
    ///
    /// # Returns
    ///
    /// - `Ok(Device)`: The device with its verdict set
    /// - `Err(Error::InvalidInput)`: The device has no IP address
    pub async fn probe_one(&self, device: Device) -> Result<Device> {
        if device.ip_address().trim().is_empty() {
            return Err(Error::invalid_input(format!(
                "Device {} has no IP address",
                device.name()
            )));
        }

        let prober = self.factory.create(&self.prober_config)?;
        let (device, _) = probe_device(prober, device, self.probe_timeout).await;
        Ok(device)
    }

    /// Emit a probe event
    ///
    /// Never blocks; a full channel drops the event and bumps `dropped`.
    fn emit_event(&self, event: ProbeEvent, dropped: &mut usize) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => *dropped += 1,
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Probe one device and return it with its verdict
///
/// The deadline is enforced here regardless of the prober's own timeout.
async fn probe_device(
    prober: Arc<dyn Prober>,
    device: Device,
    deadline: Duration,
) -> (Device, ProbeOutcome) {
    info!("Testing device: {} {}", device.name(), device.ip_address());

    let outcome = match tokio::time::timeout(deadline, prober.probe(device.ip_address())).await {
        Ok(outcome) => outcome,
        Err(_) => ProbeOutcome::TimedOut,
    };
    let verdict = Verdict::from_outcome(&outcome);

    debug!(
        "Device {} ({}): {} -> {}",
        device.name(),
        device.ip_address(),
        outcome,
        verdict
    );

    (device.with_verdict(verdict), outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StatusProber(u16);

    #[async_trait]
    impl Prober for StatusProber {
        async fn probe(&self, _ip_address: &str) -> ProbeOutcome {
            ProbeOutcome::Status(self.0)
        }

        fn prober_name(&self) -> &'static str {
            "status"
        }
    }

    struct StatusFactory(u16);

    impl ProberFactory for StatusFactory {
        fn create(&self, _config: &ProberConfig) -> Result<Arc<dyn Prober>> {
            Ok(Arc::new(StatusProber(self.0)))
        }
    }

    fn engine(status: u16) -> (ProbeEngine, mpsc::Receiver<ProbeEvent>) {
        ProbeEngine::new(
            Arc::new(StatusFactory(status)),
            ProberConfig::default(),
            EngineConfig::default(),
        )
        .expect("engine construction succeeds")
    }

    #[tokio::test]
    async fn test_events_cover_the_run() {
        let (engine, mut rx) = engine(200);

        let devices = vec![Device::new("SEP001", "10.0.0.1"), Device::new("SEP002", "10.0.0.2")];
        let results = engine.run(devices).await.unwrap();
        assert_eq!(results.len(), 2);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        assert_eq!(
            events.first(),
            Some(&ProbeEvent::RunStarted {
                device_count: 2,
                concurrency_limit: 30
            })
        );
        let started = events
            .iter()
            .filter(|e| matches!(e, ProbeEvent::ProbeStarted { .. }))
            .count();
        let completed = events
            .iter()
            .filter(|e| matches!(e, ProbeEvent::ProbeCompleted { verdict: Verdict::Reachable, .. }))
            .count();
        assert_eq!(started, 2);
        assert_eq!(completed, 2);
        assert!(matches!(
            events.last(),
            Some(ProbeEvent::RunFinished {
                reachable: 2,
                unreachable: 0,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_probe_one_maps_status() {
        let (engine, _rx) = engine(404);
        let device = engine.probe_one(Device::new("SEP001", "10.0.0.1")).await.unwrap();
        assert_eq!(device.web_access(), Verdict::Unreachable);
    }

    #[tokio::test]
    async fn test_missing_ip_is_rejected() {
        let (engine, _rx) = engine(200);
        let devices = vec![Device::new("SEP001", "10.0.0.1"), Device::new("SEP002", "")];
        let result = engine.run(devices).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let result = engine.probe_one(Device::new("SEP003", "  ")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_zero_concurrency_rejected_at_construction() {
        let config = EngineConfig {
            concurrency_limit: 0,
            ..EngineConfig::default()
        };
        let result = ProbeEngine::new(Arc::new(StatusFactory(200)), ProberConfig::default(), config);
        assert!(result.is_err());
    }
}
