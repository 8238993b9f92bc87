//! Configuration for the carelink client.
//!
//! Values are layered: environment variables (optionally seeded from a
//! `.env` file) override a TOML file, which overrides built-in defaults.
//! [`ConfigLoader`] resolves the layers into a [`ClientConfig`] plus any
//! non-fatal [`ConfigWarnings`].

pub mod loader;
pub mod models;
pub mod sources;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions};
pub use models::{ApiConfig, ClientConfig, StorageBackend, StorageConfig};
pub use sources::{EnvConfig, FileConfig};
pub use validation::{ConfigWarning, ConfigWarnings};
