use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_LOGOUT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_NAMESPACE: &str = "carelink";
pub const SESSION_FILE_NAME: &str = "session.json";

/// Fully resolved client configuration.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    /// Path of the TOML file the values came from, if any.
    pub source_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub request_timeout: Duration,
    pub health_timeout: Duration,
    pub logout_timeout: Duration,
}

impl ApiConfig {
    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            base_url,
            ..Self::default()
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            logout_timeout: DEFAULT_LOGOUT_TIMEOUT,
        }
    }
}

pub(crate) fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StorageBackend::Memory),
            "file" | "disk" => Ok(StorageBackend::File),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => f.write_str("memory"),
            StorageBackend::File => f.write_str("file"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Session document location. `None` only when no platform data
    /// directory could be determined and nothing was configured.
    pub path: Option<PathBuf>,
    pub namespace: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_session_path(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

pub(crate) fn default_session_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "carelink", "carelink")
        .map(|dirs| dirs.data_dir().join(SESSION_FILE_NAME))
}
