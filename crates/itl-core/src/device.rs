// # Device Model
//
// A registered phone as seen by the detector: identity from directory
// resolution plus the web-access verdict written by one probe run.
//
// ## Ownership
//
// Each probe run takes the device list by value. Every `Device` is moved
// into exactly one probe task and moved back out with its verdict set, so
// no device is ever shared between concurrent tasks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Web-access verdict for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Not probed in this run
    #[default]
    Unknown,
    /// The phone answered `GET /` with HTTP 200
    Reachable,
    /// Timeout, transport failure or any status other than 200
    Unreachable,
}

impl Verdict {
    /// Map a probe outcome to a verdict
    ///
    /// Only HTTP 200 counts as reachable. Timeouts, transport failures and
    /// every other status collapse into `Unreachable`.
    pub fn from_outcome(outcome: &ProbeOutcome) -> Self {
        match outcome {
            ProbeOutcome::Status(200) => Verdict::Reachable,
            ProbeOutcome::Status(_) | ProbeOutcome::TimedOut | ProbeOutcome::Transport(_) => {
                Verdict::Unreachable
            }
        }
    }

    /// `true` only for [`Verdict::Reachable`]
    pub fn is_reachable(&self) -> bool {
        matches!(self, Verdict::Reachable)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Unknown => write!(f, "unknown"),
            Verdict::Reachable => write!(f, "reachable"),
            Verdict::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// Raw classification of a single probe attempt
///
/// Kept alongside the verdict for diagnostics. Comparisons between runs only
/// ever look at the [`Verdict`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A response arrived with this status code
    Status(u16),
    /// The request exceeded its deadline
    TimedOut,
    /// Connection refused, reset, DNS failure, disconnect, ...
    Transport(String),
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Status(code) => write!(f, "HTTP {}", code),
            ProbeOutcome::TimedOut => write!(f, "timed out"),
            ProbeOutcome::Transport(reason) => write!(f, "transport error: {}", reason),
        }
    }
}

/// A registered phone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    name: String,
    ip_address: String,
    web_access: Verdict,
}

impl Device {
    /// Create a device with an unknown verdict
    pub fn new(name: impl Into<String>, ip_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip_address: ip_address.into(),
            web_access: Verdict::Unknown,
        }
    }

    /// Device name (`SEP<MAC>`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// IP address or hostname as reported by RIS
    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }

    /// Verdict from the most recent probe of this instance
    pub fn web_access(&self) -> Verdict {
        self.web_access
    }

    /// Return the device with its verdict overwritten
    ///
    /// Name and IP address are carried over untouched.
    pub fn with_verdict(mut self, verdict: Verdict) -> Self {
        self.web_access = verdict;
        self
    }

    /// URL probed for this device
    pub fn probe_url(&self) -> String {
        format!("http://{}", self.ip_address)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, web access: {})",
            self.name, self.ip_address, self.web_access
        )
    }
}
