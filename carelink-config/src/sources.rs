use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub api: FileApiConfig,
    #[serde(default)]
    pub storage: FileStorageConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileApiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Humantime string, e.g. `"30s"` or `"1m 30s"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logout_timeout: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileStorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub api_url: Option<String>,
    pub request_timeout: Option<String>,
    pub health_timeout: Option<String>,
    pub logout_timeout: Option<String>,
    pub storage_backend: Option<String>,
    pub storage_path: Option<PathBuf>,
    pub storage_namespace: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        Self {
            config_path: var("CARELINK_CONFIG").map(PathBuf::from),
            api_url: var("CARELINK_API_URL"),
            request_timeout: var("CARELINK_REQUEST_TIMEOUT"),
            health_timeout: var("CARELINK_HEALTH_TIMEOUT"),
            logout_timeout: var("CARELINK_LOGOUT_TIMEOUT"),
            storage_backend: var("CARELINK_STORAGE"),
            storage_path: var("CARELINK_STORAGE_PATH").map(PathBuf::from),
            storage_namespace: var("CARELINK_STORAGE_NAMESPACE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn blank_variables_are_ignored() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("CARELINK_API_URL", "  "),
            ("CARELINK_STORAGE", "memory"),
        ]);
        let env =
            EnvConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert!(env.api_url.is_none());
        assert_eq!(env.storage_backend.as_deref(), Some("memory"));
    }
}
