use serde::{Deserialize, Serialize};
use std::path::Path;

/// The `[http]` section of the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Upper bound on a single `BeginRequest`, in seconds.
    pub request_timeout_secs: u64,
    /// Whether timeouts recorded by guest `*Timeout` commands bound requests.
    pub enforce_timeouts: bool,
    /// Redirects followed before a request fails.
    pub max_redirects: usize,
    /// User agent sent when the guest does not set one.
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            enforce_timeouts: false,
            max_redirects: 10,
            user_agent: None,
        }
    }
}

/// The `[services]` section: which endpoints get registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub http_c: bool,
    pub mic_u: bool,
    pub pxi_dev: bool,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            http_c: true,
            mic_u: true,
            pxi_dev: true,
        }
    }
}

/// Complete HLE configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HleConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub services: ServicesConfig,
}

impl HleConfig {
    /// Parse a configuration from TOML bytes.
    pub fn from_toml(data: &[u8]) -> crate::Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|e| crate::Error::Config(format!("Invalid UTF-8: {}", e)))?;
        toml::from_str(text).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Read and parse a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> crate::Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_toml(&data)
    }
}
