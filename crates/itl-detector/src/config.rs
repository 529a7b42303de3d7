// Environment configuration of the detector binary
//
// Every variable is optional. Missing credentials are asked for
// interactively by `main` before validation.

use anyhow::{Context, Result};
use itl_core::config::{
    DetectorConfig, DirectoryConfig, EngineConfig, ProberConfig, ReportConfig, WorkflowMode,
    DEFAULT_REPORT_PATH,
};
use std::path::PathBuf;

/// Port the phones serve their web page on
const PHONE_HTTP_PORT: u16 = 80;

/// Largest accepted window; the phones' web servers are not the bottleneck,
/// the cluster's network usually is
const MAX_CONCURRENCY: usize = 1000;

/// Application configuration
pub struct Config {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub port: u16,
    pub axl_version: String,
    pub verify_tls: bool,
    pub concurrency: usize,
    pub probe_timeout_secs: u64,
    pub output: PathBuf,
    pub report_type: String,
    pub workflow: String,
    pub assume_yes: bool,
    pub log_level: String,
}

// Keeps the password out of logs
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("port", &self.port)
            .field("axl_version", &self.axl_version)
            .field("verify_tls", &self.verify_tls)
            .field("concurrency", &self.concurrency)
            .field("probe_timeout_secs", &self.probe_timeout_secs)
            .field("output", &self.output)
            .field("report_type", &self.report_type)
            .field("workflow", &self.workflow)
            .field("assume_yes", &self.assume_yes)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup` (environment or a test map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            host: non_empty("ITL_CUCM_HOST").map(|v| v.trim().to_string()),
            username: non_empty("ITL_USERNAME"),
            password: lookup("ITL_PASSWORD").filter(|v| !v.is_empty()),
            port: parse_or(&lookup, "ITL_CUCM_PORT", 8443)?,
            axl_version: non_empty("ITL_AXL_VERSION").unwrap_or_else(|| "10.0".to_string()),
            verify_tls: parse_flag(&lookup, "ITL_VERIFY_TLS")?,
            concurrency: parse_or(&lookup, "ITL_CONCURRENCY", 30)?,
            probe_timeout_secs: parse_or(&lookup, "ITL_PROBE_TIMEOUT_SECS", 30)?,
            output: non_empty("ITL_OUTPUT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_PATH)),
            report_type: non_empty("ITL_REPORT_TYPE").unwrap_or_else(|| "csv".to_string()),
            workflow: non_empty("ITL_WORKFLOW").unwrap_or_else(|| "enable-disable".to_string()),
            assume_yes: parse_flag(&lookup, "ITL_ASSUME_YES")?,
            log_level: non_empty("ITL_LOG_LEVEL").unwrap_or_else(|| "warn".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.as_deref().is_none_or(str::is_empty) {
            anyhow::bail!(
                "ITL_CUCM_HOST is required. \
                Set it via: export ITL_CUCM_HOST=10.1.1.1"
            );
        }
        if self.username.as_deref().is_none_or(str::is_empty) {
            anyhow::bail!("ITL_USERNAME is required");
        }
        if self.password.as_deref().is_none_or(str::is_empty) {
            anyhow::bail!("ITL_PASSWORD is required");
        }

        if self.port == 0 {
            anyhow::bail!("ITL_CUCM_PORT must be > 0");
        }

        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            anyhow::bail!(
                "ITL_CONCURRENCY must be between 1 and {}. Got: {}",
                MAX_CONCURRENCY,
                self.concurrency
            );
        }

        if !(1..=600).contains(&self.probe_timeout_secs) {
            anyhow::bail!(
                "ITL_PROBE_TIMEOUT_SECS must be between 1 and 600 seconds. Got: {}",
                self.probe_timeout_secs
            );
        }

        match self.report_type.as_str() {
            "csv" => {
                if let Some(parent) = self.output.parent()
                    && !parent.as_os_str().is_empty()
                    && !parent.exists()
                {
                    anyhow::bail!(
                        "ITL_OUTPUT parent directory does not exist: {}",
                        parent.display()
                    );
                }
            }
            "memory" => {}
            other => anyhow::bail!(
                "ITL_REPORT_TYPE '{}' is not supported. Supported types: csv, memory",
                other
            ),
        }

        self.workflow_mode()?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "ITL_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Workflow mode named by `ITL_WORKFLOW`
    pub fn workflow_mode(&self) -> Result<WorkflowMode> {
        self.workflow
            .parse::<WorkflowMode>()
            .context("ITL_WORKFLOW is not valid")
    }

    /// Build the library configuration
    pub fn to_detector_config(&self) -> Result<DetectorConfig> {
        let directory = DirectoryConfig::Cucm {
            host: self.host.clone().unwrap_or_default(),
            username: self.username.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
            port: self.port,
            axl_version: self.axl_version.clone(),
            accept_invalid_certs: !self.verify_tls,
            request_timeout_secs: 180,
            connect_check_timeout_secs: 30,
        };

        let report = match self.report_type.as_str() {
            "memory" => ReportConfig::Memory,
            _ => ReportConfig::Csv {
                path: self.output.clone(),
            },
        };

        let config = DetectorConfig {
            directory,
            prober: ProberConfig::Http {
                timeout_secs: self.probe_timeout_secs,
                port: PHONE_HTTP_PORT,
            },
            report,
            engine: EngineConfig {
                concurrency_limit: self.concurrency,
                probe_timeout_secs: self.probe_timeout_secs,
                ..EngineConfig::default()
            },
            workflow: self.workflow_mode()?,
        };

        config.validate()?;
        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} '{}' is not valid: {}", key, value, e)),
        None => Ok(default),
    }
}

fn parse_flag<F>(lookup: &F, key: &str) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("0") | Some("false") | Some("no") => Ok(false),
        Some("1") | Some("true") | Some("yes") | Some("y") => Ok(true),
        Some(other) => anyhow::bail!("{} '{}' is not a boolean", key, other),
    }
}
