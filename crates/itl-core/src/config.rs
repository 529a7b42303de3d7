//! Configuration types for the ITL mismatch detector
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

/// Default file name of the mismatch report
pub const DEFAULT_REPORT_PATH: &str = "devices_with_itl_mismatches.csv";

/// Main detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Directory resolution (where the device list comes from)
    pub directory: DirectoryConfig,

    /// Prober used by the engine
    #[serde(default)]
    pub prober: ProberConfig,

    /// Where mismatches are persisted
    #[serde(default)]
    pub report: ReportConfig,

    /// Probe engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Which manual phases the operator walks through
    #[serde(default)]
    pub workflow: WorkflowMode,
}

impl DetectorConfig {
    /// Create a configuration for a CUCM cluster with defaults elsewhere
    pub fn new(directory: DirectoryConfig) -> Self {
        Self {
            directory,
            prober: ProberConfig::default(),
            report: ReportConfig::default(),
            engine: EngineConfig::default(),
            workflow: WorkflowMode::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.directory.validate()?;
        self.prober.validate()?;
        self.report.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// Directory resolution configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DirectoryConfig {
    /// CUCM publisher reached through AXL and RIS
    Cucm {
        /// Publisher IP address or hostname
        host: String,
        /// API username
        username: String,
        /// API password, never serialized
        #[serde(skip_serializing, default)]
        password: String,
        /// HTTPS port of the management APIs
        #[serde(default = "default_cucm_port")]
        port: u16,
        /// AXL schema version used in the namespace and SOAPAction
        #[serde(default = "default_axl_version")]
        axl_version: String,
        /// Skip TLS certificate verification (self-signed cluster certs)
        #[serde(default = "default_accept_invalid_certs")]
        accept_invalid_certs: bool,
        /// Timeout for AXL/RIS queries (seconds)
        #[serde(default = "default_api_timeout_secs")]
        request_timeout_secs: u64,
        /// Timeout for the connectivity check (seconds)
        #[serde(default = "default_connect_check_timeout_secs")]
        connect_check_timeout_secs: u64,
    },

    /// Custom directory resolver
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl DirectoryConfig {
    /// CUCM directory with default port, AXL version and timeouts
    pub fn cucm(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        DirectoryConfig::Cucm {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            port: default_cucm_port(),
            axl_version: default_axl_version(),
            accept_invalid_certs: default_accept_invalid_certs(),
            request_timeout_secs: default_api_timeout_secs(),
            connect_check_timeout_secs: default_connect_check_timeout_secs(),
        }
    }

    /// Validate the directory configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            DirectoryConfig::Cucm {
                host,
                username,
                password,
                port,
                axl_version,
                request_timeout_secs,
                connect_check_timeout_secs,
                ..
            } => {
                if host.trim().is_empty() {
                    return Err(crate::Error::config("CUCM publisher address cannot be empty"));
                }
                if host.contains('/') || host.contains(char::is_whitespace) {
                    return Err(crate::Error::config(format!(
                        "CUCM publisher address must be a bare host, got: {}",
                        host
                    )));
                }
                if username.is_empty() {
                    return Err(crate::Error::config("API username cannot be empty"));
                }
                if password.is_empty() {
                    return Err(crate::Error::config("API password cannot be empty"));
                }
                if *port == 0 {
                    return Err(crate::Error::config("CUCM port must be > 0"));
                }
                if axl_version.is_empty() {
                    return Err(crate::Error::config("AXL version cannot be empty"));
                }
                if *request_timeout_secs == 0 || *connect_check_timeout_secs == 0 {
                    return Err(crate::Error::config("CUCM API timeouts must be > 0"));
                }
                Ok(())
            }
            DirectoryConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom directory factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom directory config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the directory type name
    pub fn type_name(&self) -> &str {
        match self {
            DirectoryConfig::Cucm { .. } => "cucm",
            DirectoryConfig::Custom { factory, .. } => factory,
        }
    }
}

// The password must never reach logs
impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectoryConfig::Cucm {
                host,
                username,
                port,
                axl_version,
                accept_invalid_certs,
                request_timeout_secs,
                connect_check_timeout_secs,
                ..
            } => f
                .debug_struct("Cucm")
                .field("host", host)
                .field("username", username)
                .field("password", &"<REDACTED>")
                .field("port", port)
                .field("axl_version", axl_version)
                .field("accept_invalid_certs", accept_invalid_certs)
                .field("request_timeout_secs", request_timeout_secs)
                .field("connect_check_timeout_secs", connect_check_timeout_secs)
                .finish(),
            DirectoryConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .finish_non_exhaustive(),
        }
    }
}

/// Prober configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProberConfig {
    /// Plain HTTP GET against the phone's web server
    Http {
        /// Per-request timeout (seconds)
        #[serde(default = "default_probe_timeout_secs")]
        timeout_secs: u64,
        /// TCP port of the phone's web server
        #[serde(default = "default_http_port")]
        port: u16,
    },

    /// Custom prober
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProberConfig {
    /// Validate the prober configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProberConfig::Http { timeout_secs, port } => {
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("HTTP probe timeout must be > 0"));
                }
                if *port == 0 {
                    return Err(crate::Error::config("HTTP probe port must be > 0"));
                }
                Ok(())
            }
            ProberConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom prober factory cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the prober type name
    pub fn type_name(&self) -> &str {
        match self {
            ProberConfig::Http { .. } => "http",
            ProberConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for ProberConfig {
    fn default() -> Self {
        ProberConfig::Http {
            timeout_secs: default_probe_timeout_secs(),
            port: default_http_port(),
        }
    }
}

/// Report sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportConfig {
    /// Two-column CSV file
    Csv {
        /// Output path
        path: PathBuf,
    },

    /// Keep results in memory (dry runs, tests)
    Memory,

    /// Custom report sink
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ReportConfig {
    /// Validate the report configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ReportConfig::Csv { path } => {
                if path.as_os_str().is_empty() {
                    return Err(crate::Error::config("Report path cannot be empty"));
                }
                Ok(())
            }
            ReportConfig::Memory => Ok(()),
            ReportConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom report factory cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the report sink type name
    pub fn type_name(&self) -> &str {
        match self {
            ReportConfig::Csv { .. } => "csv",
            ReportConfig::Memory => "memory",
            ReportConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig::Csv {
            path: PathBuf::from(DEFAULT_REPORT_PATH),
        }
    }
}

/// Probe engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of probes in flight at once
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Deadline for a single probe (seconds)
    ///
    /// Enforced by the engine around every probe, independently of any
    /// timeout the prober applies itself.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Capacity of the engine event channel
    ///
    /// When full, events are dropped with a warning. Probing is never
    /// slowed down by a slow event consumer.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.concurrency_limit == 0 {
            return Err(crate::Error::config("Concurrency limit must be > 0"));
        }
        if self.probe_timeout_secs == 0 {
            return Err(crate::Error::config("Probe timeout must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Concurrency limit as a non-zero value
    pub fn concurrency_limit(&self) -> Result<NonZeroUsize, crate::Error> {
        NonZeroUsize::new(self.concurrency_limit)
            .ok_or_else(|| crate::Error::config("Concurrency limit must be > 0"))
    }

    /// Per-probe deadline
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            probe_timeout_secs: default_probe_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Which manual phases the workflow walks through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowMode {
    /// Enable web access, probe, disable web access, probe
    #[default]
    EnableDisable,
    /// Enable web access, probe
    Enable,
    /// Disable web access, probe
    Disable,
}

impl std::str::FromStr for WorkflowMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enable-disable" => Ok(WorkflowMode::EnableDisable),
            "enable" => Ok(WorkflowMode::Enable),
            "disable" => Ok(WorkflowMode::Disable),
            other => Err(crate::Error::config(format!(
                "Unknown workflow '{}'. Valid: enable-disable, enable, disable",
                other
            ))),
        }
    }
}

fn default_cucm_port() -> u16 {
    8443
}

fn default_axl_version() -> String {
    "10.0".to_string()
}

fn default_accept_invalid_certs() -> bool {
    true
}

fn default_api_timeout_secs() -> u64 {
    180
}

fn default_connect_check_timeout_secs() -> u64 {
    30
}

fn default_probe_timeout_secs() -> u64 {
    30
}

fn default_http_port() -> u16 {
    80
}

fn default_concurrency_limit() -> usize {
    30
}

fn default_event_channel_capacity() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DetectorConfig::new(DirectoryConfig::cucm("10.1.1.1", "axl", "secret"));
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.concurrency_limit, 30);
        assert_eq!(config.engine.probe_timeout(), Duration::from_secs(30));
        assert_eq!(config.workflow, WorkflowMode::EnableDisable);
        assert_eq!(config.report.type_name(), "csv");
        assert_eq!(config.prober.type_name(), "http");
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = DetectorConfig::new(DirectoryConfig::cucm("10.1.1.1", "axl", "secret"));
        config.engine.concurrency_limit = 0;
        assert!(config.validate().is_err());
        assert!(config.engine.concurrency_limit().is_err());
    }

    #[test]
    fn test_empty_credentials_rejected() {
        assert!(DirectoryConfig::cucm("", "axl", "secret").validate().is_err());
        assert!(DirectoryConfig::cucm("10.1.1.1", "", "secret").validate().is_err());
        assert!(DirectoryConfig::cucm("10.1.1.1", "axl", "").validate().is_err());
        assert!(
            DirectoryConfig::cucm("https://10.1.1.1", "axl", "secret")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_password_not_in_debug() {
        let config = DirectoryConfig::cucm("10.1.1.1", "axl", "hunter2-secret");
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("hunter2-secret"));
        assert!(debug_str.contains("<REDACTED>"));
    }

    #[test]
    fn test_password_not_serialized() {
        let config = DirectoryConfig::cucm("10.1.1.1", "axl", "hunter2-secret");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2-secret"));
    }

    #[test]
    fn test_workflow_mode_parse() {
        assert_eq!("enable-disable".parse::<WorkflowMode>().unwrap(), WorkflowMode::EnableDisable);
        assert_eq!("Enable".parse::<WorkflowMode>().unwrap(), WorkflowMode::Enable);
        assert_eq!(" disable ".parse::<WorkflowMode>().unwrap(), WorkflowMode::Disable);
        assert!("both".parse::<WorkflowMode>().is_err());
    }

    #[test]
    fn test_engine_config_deserialize_defaults() {
        let engine: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(engine.concurrency_limit, 30);
        assert_eq!(engine.probe_timeout_secs, 30);
        assert_eq!(engine.event_channel_capacity, 1000);
    }
}
