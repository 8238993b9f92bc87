use once_cell::sync::Lazy;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use url::Url;

use crate::{
    models::{
        ApiConfig, ClientConfig, DEFAULT_NAMESPACE, StorageBackend,
        StorageConfig, default_base_url, default_session_path,
    },
    sources::{EnvConfig, FileConfig},
    validation::{self, ConfigWarnings},
};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("carelink.toml"),
        PathBuf::from("config/carelink.toml"),
    ]
});

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    /// Skip `.env` handling entirely.
    pub skip_env_file: bool,
    /// Use these values instead of reading the process environment.
    pub env_override: Option<EnvConfig>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn with_env(mut self, env: EnvConfig) -> Self {
        self.options.env_override = Some(env);
        self.options.skip_env_file = true;
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = self.load_env_file()?;

        let env_config = match &self.options.env_override {
            Some(env) => env.clone(),
            None => EnvConfig::gather(),
        };

        let (file_config, config_path) = self.load_file_config(&env_config)?;

        let mut warnings = ConfigWarnings::default();
        if config_path.is_none() {
            warnings.push_with_hint(
                "No carelink.toml detected; using environment variables and defaults",
                "Create carelink.toml or set CARELINK_CONFIG to pin settings",
            );
        }
        if env_file_loaded {
            log::debug!("[Config] Loaded variables from .env file");
        }

        let config = compose(file_config, env_config, config_path)?;
        warnings.extend(validation::check(&config));

        Ok(ConfigLoad { config, warnings })
    }

    fn load_env_file(&self) -> Result<bool, ConfigLoadError> {
        if self.options.skip_env_file {
            return Ok(false);
        }
        let result = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true),
            None => dotenvy::dotenv().map(|_| true),
        };
        match result {
            Ok(loaded) => Ok(loaded),
            Err(dotenvy::Error::Io(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(FileConfig, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env_config.config_path.clone());

        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigLoadError::MissingConfig { path });
                }
                path
            }
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
            {
                Some(found) => found.clone(),
                None => return Ok((FileConfig::default(), None)),
            },
        };

        let file_config = read_file_config(&path)?;
        Ok((file_config, Some(path)))
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn compose(
    file: FileConfig,
    env: EnvConfig,
    source_path: Option<PathBuf>,
) -> Result<ClientConfig, ConfigLoadError> {
    let FileConfig {
        api: file_api,
        storage: file_storage,
    } = file;

    let base_url = match env.api_url.or(file_api.base_url) {
        Some(raw) => parse_base_url(&raw)?,
        None => default_base_url(),
    };

    let defaults = ApiConfig::default();
    let api = ApiConfig {
        base_url,
        request_timeout: duration_or(
            "request_timeout",
            env.request_timeout.or(file_api.request_timeout),
            defaults.request_timeout,
        )?,
        health_timeout: duration_or(
            "health_timeout",
            env.health_timeout.or(file_api.health_timeout),
            defaults.health_timeout,
        )?,
        logout_timeout: duration_or(
            "logout_timeout",
            env.logout_timeout.or(file_api.logout_timeout),
            defaults.logout_timeout,
        )?,
    };

    let backend = match env.storage_backend.or(file_storage.backend) {
        Some(raw) => raw
            .parse::<StorageBackend>()
            .map_err(|value| ConfigLoadError::UnknownStorageBackend { value })?,
        None => StorageBackend::default(),
    };

    let storage = StorageConfig {
        backend,
        path: env
            .storage_path
            .or(file_storage.path)
            .or_else(default_session_path),
        namespace: env
            .storage_namespace
            .or(file_storage.namespace)
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
    };

    Ok(ClientConfig {
        api,
        storage,
        source_path,
    })
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigLoadError> {
    let url = Url::parse(raw).map_err(|source| {
        ConfigLoadError::InvalidBaseUrl {
            value: raw.to_string(),
            source,
        }
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigLoadError::UnsupportedScheme {
            scheme: url.scheme().to_string(),
        });
    }
    Ok(url)
}

fn duration_or(
    field: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigLoadError> {
    match raw {
        Some(raw) => humantime::parse_duration(&raw).map_err(|source| {
            ConfigLoadError::InvalidDuration {
                field,
                value: raw,
                source,
            }
        }),
        None => Ok(default),
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file {path} not found")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid API base URL '{value}'")]
    InvalidBaseUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported API URL scheme '{scheme}' (expected http or https)")]
    UnsupportedScheme { scheme: String },
    #[error("invalid duration '{value}' for {field}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("unknown storage backend '{value}' (expected memory or file)")]
    UnknownStorageBackend { value: String },
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: ClientConfig,
    pub warnings: ConfigWarnings,
}
