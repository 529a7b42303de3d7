// # HTTP Prober
//
// This crate provides the plain-HTTP reachability check for the ITL
// mismatch detector.
//
// ## Purpose
//
// A phone with web access enabled answers `GET /` on its built-in web
// server. Whether it does, after the cluster told it to enable or disable
// web access, is the signal the detector compares.
//
// ## Session Scope
//
// Every `HttpProberFactory::create` call builds a new `reqwest::Client`,
// and with it a new connection pool. The engine calls the factory once
// per probe run and drops the prober at the end of the run, so no pooled
// connection outlives the run that opened it.
//
// ## Outcome Mapping
//
// - A response of any status → `ProbeOutcome::Status(code)`
// - Request deadline exceeded → `ProbeOutcome::TimedOut`
// - Anything else (refused, reset, DNS, disconnect) → `ProbeOutcome::Transport`
//
// Redirects are not followed: a 3xx is an answer, just not a 200.
// Proxy environment variables are ignored, the connection always goes to
// the phone.

use itl_core::config::ProberConfig;
use itl_core::registry::ComponentRegistry;
use itl_core::traits::{Prober, ProberFactory};
use itl_core::{Error, ProbeOutcome, Result};

use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Duration;

/// Port the phones' web server listens on
const DEFAULT_HTTP_PORT: u16 = 80;

/// HTTP reachability prober
#[derive(Debug, Clone)]
pub struct HttpProber {
    /// HTTP client (one connection pool per prober)
    client: reqwest::Client,

    /// Target port
    port: u16,
}

impl HttpProber {
    /// Create a new HTTP prober
    ///
    /// # Parameters
    ///
    /// - `timeout`: Deadline for connect plus response headers
    /// - `port`: TCP port of the phones' web server
    pub fn new(timeout: Duration, port: u16) -> Result<Self> {
        // The GET must reach the phone itself, never an HTTP(S)_PROXY
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::prober(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, port })
    }

    /// URL probed for a device
    ///
    /// Port 80 is left implicit; IPv6 literals are bracketed.
    pub fn url_for(&self, ip_address: &str) -> String {
        let host = if ip_address.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]", ip_address)
        } else {
            ip_address.to_string()
        };

        if self.port == DEFAULT_HTTP_PORT {
            format!("http://{}", host)
        } else {
            format!("http://{}:{}", host, self.port)
        }
    }
}

/// Fold a request error into a probe outcome
fn classify(error: &reqwest::Error) -> ProbeOutcome {
    if error.is_timeout() {
        return ProbeOutcome::TimedOut;
    }

    // reqwest's own message is generic, the cause is in the source chain
    let mut reason = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }

    ProbeOutcome::Transport(reason)
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, ip_address: &str) -> ProbeOutcome {
        let url = self.url_for(ip_address);

        match self.client.get(&url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                tracing::trace!("GET {} -> {}", url, status);
                ProbeOutcome::Status(status)
            }
            Err(e) => {
                let outcome = classify(&e);
                tracing::trace!("GET {} failed: {}", url, outcome);
                outcome
            }
        }
    }

    fn prober_name(&self) -> &'static str {
        "http"
    }
}

/// Factory for creating HTTP probers
pub struct HttpProberFactory;

impl ProberFactory for HttpProberFactory {
    fn create(&self, config: &ProberConfig) -> Result<Arc<dyn Prober>> {
        match config {
            ProberConfig::Http { timeout_secs, port } => Ok(Arc::new(HttpProber::new(
                Duration::from_secs(*timeout_secs),
                *port,
            )?)),
            _ => Err(Error::config("Invalid config for HTTP prober")),
        }
    }
}

/// Register the HTTP prober with a registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_prober("http", Arc::new(HttpProberFactory));
}
