// # CUCM Directory Resolver
//
// This crate resolves the registered phones of a Cisco Unified
// Communications Manager cluster for the ITL mismatch detector.
//
// ## Flow
//
// 1. Connectivity check: GET the RIS WSDL and the AXL root with basic auth
// 2. AXL `listPhone`: names of every `SEP%` phone in the database
// 3. RIS `selectCmDeviceExt`: which of those are registered, and their IPs,
//    in chunks of at most 1000 names per request
//
// ## Error Policy
//
// Every failure is returned as an error, never as an empty list: an empty
// list means "no phones", and the workflow acts on that.
//
// - 401/403 → `Error::Authentication`
// - Timeouts and other non-200 answers → `Error::Directory`
// - Transport failures → `Error::Http`
// - Unparseable responses → `Error::Xml`
//
// ## Security Requirements
//
// - The password NEVER appears in logs or Debug output
// - Clusters usually run self-signed certificates, so verification is off
//   unless `accept_invalid_certs` is set to false

pub mod soap;

use async_trait::async_trait;
use itl_core::config::DirectoryConfig;
use itl_core::registry::ComponentRegistry;
use itl_core::traits::{DirectoryFactory, DirectoryResolver};
use itl_core::{Device, Error, Result};
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use std::collections::HashSet;
use std::time::Duration;

/// Content type of every SOAP request
const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// CUCM AXL/RIS directory resolver
pub struct CucmDirectory {
    /// `https://{host}:{port}/`, always with a trailing slash
    base_url: String,

    /// API username
    username: String,

    /// API password
    /// ⚠️ NEVER log this value
    password: String,

    /// AXL schema version (namespace and SOAPAction)
    axl_version: String,

    /// Deadline for the connectivity check requests
    connect_check_timeout: Duration,

    /// HTTP client (request timeout and TLS policy applied)
    client: reqwest::Client,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for CucmDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CucmDirectory")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("axl_version", &self.axl_version)
            .field("connect_check_timeout", &self.connect_check_timeout)
            .finish()
    }
}

impl CucmDirectory {
    /// Create a resolver from a `DirectoryConfig::Cucm`
    ///
    /// # Returns
    ///
    /// - `Ok(CucmDirectory)`: Ready to query
    /// - `Err(Error::Config)`: Not a CUCM config, or the config is invalid
    /// - `Err(Error::Http)`: The HTTP client could not be built
    pub fn from_config(config: &DirectoryConfig) -> Result<Self> {
        config.validate()?;

        let DirectoryConfig::Cucm {
            host,
            username,
            password,
            port,
            axl_version,
            accept_invalid_certs,
            request_timeout_secs,
            connect_check_timeout_secs,
        } = config
        else {
            return Err(Error::config("Invalid config for CUCM directory"));
        };

        if *accept_invalid_certs {
            tracing::debug!("TLS certificate verification disabled for {}", host);
        }

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(*accept_invalid_certs)
            .timeout(Duration::from_secs(*request_timeout_secs))
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: format!("https://{}:{}/", host, port),
            username: username.clone(),
            password: password.clone(),
            axl_version: axl_version.clone(),
            connect_check_timeout: Duration::from_secs(*connect_check_timeout_secs),
            client,
        })
    }

    /// Point the resolver at a different base URL (e.g. a local mock)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    /// Base URL all API paths are joined onto
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path` with basic auth and expect 200
    async fn check_endpoint(&self, path: &str) -> Result<()> {
        let url = self.url(path);
        tracing::info!("Running connectivity tests to {}", url);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .timeout(self.connect_check_timeout)
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(&url, status, &body));
        }

        Ok(())
    }

    /// POST a SOAP envelope and return the response body of a 200 answer
    async fn post_soap(&self, path: &str, body: String, action: Option<&str>) -> Result<String> {
        let url = self.url(path);

        let mut request = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .body(body);
        if let Some(action) = action {
            request = request.header("SOAPAction", action);
        }

        let response = request.send().await.map_err(|e| request_error(&url, e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response from {}: {}", url, e)))?;

        if status != StatusCode::OK {
            tracing::error!("Raw response from {}: {}", url, text);
            return Err(status_error(&url, status, &text));
        }

        tracing::trace!("Raw response from {}: {}", url, text);
        Ok(text)
    }
}

/// Map a failed request to an error
fn request_error(url: &str, error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::directory(format!("The connection to {} timed out.", url))
    } else {
        Error::http(format!("Request to {} failed: {}", url, error))
    }
}

/// Map a non-200 answer to an error
fn status_error(url: &str, status: StatusCode, body: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!("{} rejected the credentials ({})", url, status)),
        code => {
            let detail = soap::parse_fault(body).unwrap_or_else(|| status.to_string());
            Error::directory(format!(
                "The query to {} failed with HTTP response {}: {}",
                url, code, detail
            ))
        }
    }
}

#[async_trait]
impl DirectoryResolver for CucmDirectory {
    async fn check_connectivity(&self) -> Result<()> {
        self.check_endpoint(soap::RIS_WSDL_PATH).await?;
        self.check_endpoint(soap::AXL_PATH).await?;
        Ok(())
    }

    async fn device_names(&self) -> Result<Vec<String>> {
        let body = soap::list_phone_request(&self.axl_version);
        let action = soap::list_phone_action(&self.axl_version);

        let xml = self.post_soap(soap::AXL_PATH, body, Some(&action)).await?;
        let names = soap::parse_list_phone(&xml)?;

        tracing::info!("AXL listPhone returned {} device name(s)", names.len());
        Ok(names)
    }

    async fn registered_devices(&self, names: &[String]) -> Result<Vec<Device>> {
        let mut devices = Vec::new();
        let mut seen = HashSet::new();

        for (index, chunk) in names.chunks(soap::RIS_MAX_DEVICES).enumerate() {
            tracing::debug!(
                "RIS selectCmDeviceExt chunk {} ({} name(s))",
                index + 1,
                chunk.len()
            );

            let body = soap::select_cm_device_request(chunk);
            let xml = self.post_soap(soap::RIS_PATH, body, None).await?;

            for device in soap::parse_select_cm_device(&xml)? {
                if seen.insert(device.name().to_string()) {
                    devices.push(device);
                } else {
                    tracing::debug!("Ignoring duplicate RIS entry for {}", device.name());
                }
            }
        }

        tracing::info!(
            "RIS reports {} of {} device(s) registered",
            devices.len(),
            names.len()
        );
        Ok(devices)
    }

    fn directory_name(&self) -> &'static str {
        "cucm"
    }
}

/// Factory for creating CUCM directory resolvers
pub struct CucmFactory;

impl DirectoryFactory for CucmFactory {
    fn create(&self, config: &DirectoryConfig) -> Result<Box<dyn DirectoryResolver>> {
        match config {
            DirectoryConfig::Cucm { .. } => Ok(Box::new(CucmDirectory::from_config(config)?)),
            _ => Err(Error::config("Invalid config for CUCM directory")),
        }
    }
}

/// Register the CUCM directory with a registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_directory("cucm", Box::new(CucmFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DirectoryConfig {
        DirectoryConfig::cucm("10.1.1.1", "axladmin", "s3cret!")
    }

    #[test]
    fn test_base_url_from_config() {
        let directory = CucmDirectory::from_config(&config()).unwrap();
        assert_eq!(directory.base_url(), "https://10.1.1.1:8443/");
    }

    #[test]
    fn test_with_base_url_adds_trailing_slash() {
        let directory = CucmDirectory::from_config(&config())
            .unwrap()
            .with_base_url("http://127.0.0.1:9000");
        assert_eq!(directory.base_url(), "http://127.0.0.1:9000/");
        assert_eq!(
            directory.url(soap::RIS_WSDL_PATH),
            "http://127.0.0.1:9000/realtimeservice2/services/RISService70?wsdl"
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let directory = CucmDirectory::from_config(&config()).unwrap();
        let debug = format!("{:?}", directory);
        assert!(!debug.contains("s3cret!"));
        assert!(debug.contains("<REDACTED>"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DirectoryConfig::cucm("", "axladmin", "s3cret!");
        assert!(matches!(
            CucmDirectory::from_config(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_status_mapping() {
        let url = "https://cucm:8443/axl/";
        assert!(matches!(
            status_error(url, StatusCode::UNAUTHORIZED, ""),
            Error::Authentication(_)
        ));
        assert!(matches!(
            status_error(url, StatusCode::FORBIDDEN, ""),
            Error::Authentication(_)
        ));
        assert!(matches!(
            status_error(url, StatusCode::INTERNAL_SERVER_ERROR, "oops"),
            Error::Directory(_)
        ));
    }

    #[test]
    fn test_register() {
        let registry = ComponentRegistry::new();
        register(&registry);
        assert!(registry.has_directory("cucm"));
        assert!(registry.create_directory(&config()).is_ok());
    }
}
