//! Test doubles and common utilities for engine and workflow contract tests
//!
//! The doubles never touch the network. Every prober records how many probes
//! are in flight so the tests can check the concurrency ceiling.

#![allow(dead_code)]

use async_trait::async_trait;
use itl_core::config::{EngineConfig, ProberConfig};
use itl_core::error::{Error, Result};
use itl_core::traits::{DirectoryResolver, OperatorGate, Prober, ProberFactory};
use itl_core::workflow::Phase;
use itl_core::{Device, ProbeEngine, ProbeEvent, ProbeOutcome};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// What a scripted prober does for one IP address
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Answer immediately with this status
    Respond(u16),
    /// Answer with this status after a delay
    RespondAfter(Duration, u16),
    /// Fail as if the connection was refused
    Refuse,
    /// Never answer (only the engine deadline ends the probe)
    Hang,
    /// Panic inside the probe task
    Panic,
}

/// Counters shared by every prober a factory creates
#[derive(Debug, Default)]
pub struct ProbeStats {
    active: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    calls_per_ip: Mutex<HashMap<String, usize>>,
}

impl ProbeStats {
    /// Largest number of probes observed in flight at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Probes currently in flight
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Total number of probe calls
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of probe calls for one IP address
    pub fn calls_for(&self, ip_address: &str) -> usize {
        self.calls_per_ip
            .lock()
            .unwrap()
            .get(ip_address)
            .copied()
            .unwrap_or(0)
    }

    fn enter(self: &Arc<Self>, ip_address: &str) -> ActiveGuard {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls_per_ip
            .lock()
            .unwrap()
            .entry(ip_address.to_string())
            .or_insert(0) += 1;

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        ActiveGuard {
            stats: Arc::clone(self),
        }
    }
}

/// Decrements the active count when a probe ends, cancelled or not
struct ActiveGuard {
    stats: Arc<ProbeStats>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.stats.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Prober that follows a per-IP script
pub struct ScriptedProber {
    script: HashMap<String, Behavior>,
    fallback: Behavior,
    stats: Arc<ProbeStats>,
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, ip_address: &str) -> ProbeOutcome {
        let behavior = self
            .script
            .get(ip_address)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());

        let _guard = self.stats.enter(ip_address);
        // Let other tasks run so overlapping probes are actually observed
        tokio::task::yield_now().await;

        match behavior {
            Behavior::Respond(status) => ProbeOutcome::Status(status),
            Behavior::RespondAfter(delay, status) => {
                tokio::time::sleep(delay).await;
                ProbeOutcome::Status(status)
            }
            Behavior::Refuse => ProbeOutcome::Transport("connection refused".to_string()),
            Behavior::Hang => std::future::pending::<ProbeOutcome>().await,
            Behavior::Panic => panic!("scripted probe panic for {}", ip_address),
        }
    }

    fn prober_name(&self) -> &'static str {
        "scripted"
    }
}

/// Factory handing out scripted probers
///
/// Each `create` call is one probe session. Session `n` uses script `n`
/// (the last script repeats once they run out), so a workflow test can make
/// the phones behave differently in each phase.
pub struct ScriptedProberFactory {
    sessions: Vec<HashMap<String, Behavior>>,
    fallback: Behavior,
    stats: Arc<ProbeStats>,
    created: AtomicUsize,
}

impl ScriptedProberFactory {
    /// Every probe behaves the same
    pub fn uniform(behavior: Behavior) -> Self {
        Self::sessions(Vec::new(), behavior)
    }

    /// One script for every session
    pub fn scripted(script: HashMap<String, Behavior>, fallback: Behavior) -> Self {
        Self::sessions(vec![script], fallback)
    }

    /// One script per session
    pub fn sessions(sessions: Vec<HashMap<String, Behavior>>, fallback: Behavior) -> Self {
        Self {
            sessions,
            fallback,
            stats: Arc::new(ProbeStats::default()),
            created: AtomicUsize::new(0),
        }
    }

    /// Shared probe counters
    pub fn stats(&self) -> Arc<ProbeStats> {
        Arc::clone(&self.stats)
    }

    /// Number of sessions opened so far
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ProberFactory for ScriptedProberFactory {
    fn create(&self, _config: &ProberConfig) -> Result<Arc<dyn Prober>> {
        let session = self.created.fetch_add(1, Ordering::SeqCst);
        let script = self
            .sessions
            .get(session)
            .or_else(|| self.sessions.last())
            .cloned()
            .unwrap_or_default();

        Ok(Arc::new(ScriptedProber {
            script,
            fallback: self.fallback.clone(),
            stats: Arc::clone(&self.stats),
        }))
    }
}

/// Factory that refuses to open a session
pub struct FailingProberFactory;

impl ProberFactory for FailingProberFactory {
    fn create(&self, _config: &ProberConfig) -> Result<Arc<dyn Prober>> {
        Err(Error::prober("session could not be opened"))
    }
}

/// Directory returning a fixed device list
pub struct StaticDirectory {
    names: Vec<String>,
    registered: Vec<Device>,
    check_failure: Option<fn() -> Error>,
    lookups: Arc<AtomicUsize>,
}

impl StaticDirectory {
    /// Every device is known and registered
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            names: devices.iter().map(|d| d.name().to_string()).collect(),
            registered: devices,
            check_failure: None,
            lookups: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Devices are known but none is registered
    pub fn unregistered(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            ..Self::new(Vec::new())
        }
    }

    /// Directory whose connectivity check rejects the credentials
    pub fn unreachable() -> Self {
        Self {
            check_failure: Some(|| Error::auth("401 Unauthorized")),
            ..Self::new(Vec::new())
        }
    }

    /// Directory whose connectivity check times out
    pub fn timing_out() -> Self {
        Self {
            check_failure: Some(|| {
                Error::directory("The connection to https://cucm:8443/axl/ timed out.")
            }),
            ..Self::new(Vec::new())
        }
    }

    /// Number of `device_names` and `registered_devices` calls
    pub fn lookup_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.lookups)
    }
}

#[async_trait]
impl DirectoryResolver for StaticDirectory {
    async fn check_connectivity(&self) -> Result<()> {
        match self.check_failure {
            None => Ok(()),
            Some(failure) => Err(failure()),
        }
    }

    async fn device_names(&self) -> Result<Vec<String>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.names.clone())
    }

    async fn registered_devices(&self, names: &[String]) -> Result<Vec<Device>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .registered
            .iter()
            .filter(|d| names.iter().any(|n| n == d.name()))
            .cloned()
            .collect())
    }

    fn directory_name(&self) -> &'static str {
        "static"
    }
}

/// Gate answering from a fixed list, recording every phase it was asked about
pub struct ScriptedGate {
    answers: Mutex<Vec<bool>>,
    asked: Arc<Mutex<Vec<Phase>>>,
}

impl ScriptedGate {
    pub fn new(answers: Vec<bool>) -> Self {
        Self {
            answers: Mutex::new(answers),
            asked: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn asked(&self) -> Arc<Mutex<Vec<Phase>>> {
        Arc::clone(&self.asked)
    }
}

#[async_trait]
impl OperatorGate for ScriptedGate {
    async fn confirm(&self, phase: &Phase) -> bool {
        self.asked.lock().unwrap().push(*phase);
        let mut answers = self.answers.lock().unwrap();
        if answers.is_empty() {
            false
        } else {
            answers.remove(0)
        }
    }
}

/// `count` devices named SEP000000000000.. with addresses in 10.0.0.0/8
pub fn devices(count: usize) -> Vec<Device> {
    (0..count)
        .map(|i| {
            Device::new(
                format!("SEP{:012X}", i),
                format!("10.{}.{}.{}", (i >> 16) & 0xff, (i >> 8) & 0xff, i & 0xff),
            )
        })
        .collect()
}

/// Engine over `factory` with the given limit and probe deadline
pub fn engine(
    factory: Arc<dyn ProberFactory>,
    concurrency_limit: usize,
    probe_timeout_secs: u64,
) -> (ProbeEngine, mpsc::Receiver<ProbeEvent>) {
    let config = EngineConfig {
        concurrency_limit,
        probe_timeout_secs,
        ..EngineConfig::default()
    };
    ProbeEngine::new(factory, ProberConfig::default(), config)
        .expect("engine construction succeeds")
}
