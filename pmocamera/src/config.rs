//! Camera client configuration
//!
//! All values have documented defaults, so an empty document is a valid
//! configuration. Values can come from YAML and be overridden by
//! environment variables named `PMOCAMERA__<KEY>` (upper case key). Unknown
//! keys are rejected in both places:
//!
//! ```yaml
//! ssdp_address: "239.255.255.250:1900"
//! search_target: "urn:schemas-sony-com:service:ScalarWebAPI:1"
//! mx: 1
//! discovery_timeout_ms: 5000
//! http_timeout_ms: 10000
//! settling_delay_ms: 3000
//! max_precondition_depth: 4
//! api_version: "1.0"
//! ```
//!
//! ```bash
//! PMOCAMERA__SETTLING_DELAY_MS=5000 cargo run -p pmocamera --example take_picture
//! ```

use crate::error::{CameraError, Result};
use pmossdp::{SCALAR_WEB_API_ST, SSDP_MULTICAST_ADDR, SSDP_PORT, SearchOptions};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use std::{env, fs};
use tracing::debug;

const ENV_PREFIX: &str = "PMOCAMERA__";

// Default values for configuration
const DEFAULT_MX: u32 = 1;
const DEFAULT_DISCOVERY_TIMEOUT_MS: u64 = 5000;
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;
/// Mode switches are asynchronous on the camera: its available API list lags
/// the actual transition by a couple of seconds.
const DEFAULT_SETTLING_DELAY_MS: u64 = 3000;
const DEFAULT_MAX_PRECONDITION_DEPTH: usize = 4;
const DEFAULT_API_VERSION: &str = "1.0";
const DEFAULT_USER_AGENT: &str = concat!("PMOCamera/", env!("CARGO_PKG_VERSION"));

/// Configuration of a [`Camera`](crate::Camera) session
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    /// Destination of the M-SEARCH
    pub ssdp_address: SocketAddr,
    /// ST header of the M-SEARCH
    pub search_target: String,
    /// Advertisement window requested from the camera (seconds)
    pub mx: u32,
    /// Wait for the first advertisement (milliseconds)
    pub discovery_timeout_ms: u64,
    /// Timeout of each HTTP request (milliseconds)
    pub http_timeout_ms: u64,
    /// Wait after a precondition call before checking availability again
    pub settling_delay_ms: u64,
    /// Longest precondition chain followed before giving up
    pub max_precondition_depth: usize,
    /// `version` field of every request and argument of `getMethodTypes`
    pub api_version: String,
    /// User-Agent of HTTP requests and M-SEARCH
    pub user_agent: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            ssdp_address: SocketAddr::from(([239, 255, 255, 250], SSDP_PORT)),
            search_target: SCALAR_WEB_API_ST.to_string(),
            mx: DEFAULT_MX,
            discovery_timeout_ms: DEFAULT_DISCOVERY_TIMEOUT_MS,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            settling_delay_ms: DEFAULT_SETTLING_DELAY_MS,
            max_precondition_depth: DEFAULT_MAX_PRECONDITION_DEPTH,
            api_version: DEFAULT_API_VERSION.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CameraConfig {
    /// Parse a YAML document; missing keys keep their default
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| CameraError::Config(e.to_string()))
    }

    /// Load a YAML file, then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading camera configuration from {}", path.display());

        let text = fs::read_to_string(path)
            .map_err(|e| CameraError::Config(format!("{}: {}", path.display(), e)))?;

        let mut config = Self::from_yaml_str(&text)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override values from `PMOCAMERA__<KEY>` variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(env::vars().filter_map(|(name, value)| {
            name.strip_prefix(ENV_PREFIX)
                .map(|key| (key.to_ascii_lowercase(), value))
        }))
    }

    fn apply_overrides<I>(&mut self, overrides: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in overrides {
            debug!("Configuration override {} = {}", key, value);
            match key.as_str() {
                "ssdp_address" => self.ssdp_address = parse_value(&key, &value)?,
                "search_target" => self.search_target = value,
                "mx" => self.mx = parse_value(&key, &value)?,
                "discovery_timeout_ms" => self.discovery_timeout_ms = parse_value(&key, &value)?,
                "http_timeout_ms" => self.http_timeout_ms = parse_value(&key, &value)?,
                "settling_delay_ms" => self.settling_delay_ms = parse_value(&key, &value)?,
                "max_precondition_depth" => {
                    self.max_precondition_depth = parse_value(&key, &value)?
                }
                "api_version" => self.api_version = value,
                "user_agent" => self.user_agent = value,
                _ => return Err(CameraError::Config(format!("unknown key '{}'", key))),
            }
        }
        Ok(())
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn settling_delay(&self) -> Duration {
        Duration::from_millis(self.settling_delay_ms)
    }

    /// SSDP search parameters derived from this configuration
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            target: self.ssdp_address,
            search_target: self.search_target.clone(),
            mx: self.mx,
            timeout: self.discovery_timeout(),
            user_agent: self.user_agent.clone(),
        }
    }

    /// True when discovery goes to the standard SSDP multicast group
    pub fn uses_multicast(&self) -> bool {
        self.ssdp_address.ip().to_string() == SSDP_MULTICAST_ADDR
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| CameraError::Config(format!("invalid value '{}' for {}: {}", value, key, e)))
}
