use url::{Host, Url};

use crate::models::ClientConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

/// Non-fatal checks over a resolved configuration.
pub fn check(config: &ClientConfig) -> ConfigWarnings {
    let mut warnings = ConfigWarnings::default();

    if is_cleartext_remote(&config.api.base_url) {
        warnings.push_with_hint(
            format!(
                "API base URL {} sends bearer tokens over plain http",
                config.api.base_url
            ),
            "Use an https:// URL for any backend that is not on this machine",
        );
    }

    if config.storage.path.is_none() {
        warnings.push_with_hint(
            "No session storage path could be determined",
            "Set CARELINK_STORAGE_PATH or [storage] path; sessions will not survive restarts",
        );
    }

    if config.api.request_timeout.is_zero() {
        warnings.push("Request timeout of zero disables request deadlines");
    }

    warnings
}

fn is_cleartext_remote(url: &Url) -> bool {
    if url.scheme() != "http" {
        return false;
    }
    match url.host() {
        Some(Host::Domain(domain)) => domain != "localhost",
        Some(Host::Ipv4(ip)) => !ip.is_loopback(),
        Some(Host::Ipv6(ip)) => !ip.is_loopback(),
        None => false,
    }
}
