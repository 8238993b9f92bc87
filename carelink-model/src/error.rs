use serde::Deserialize;

/// Error body the backend returns alongside non-2xx statuses.
///
/// Endpoints disagree on the field name, so both are accepted. `error` wins
/// over `message` when both are present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Parse a raw response body. Non-JSON bodies yield an empty value.
    pub fn parse(raw: &[u8]) -> Self {
        serde_json::from_slice(raw).unwrap_or_default()
    }

    pub fn into_message(self) -> Option<String> {
        self.error
            .filter(|m| !m.trim().is_empty())
            .or(self.message.filter(|m| !m.trim().is_empty()))
    }

    /// Server message, else `fallback`.
    pub fn message_or(self, fallback: impl Into<String>) -> String {
        self.into_message().unwrap_or_else(|| fallback.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_error_over_message() {
        let body =
            ErrorBody::parse(br#"{"error":"File too large","message":"nope"}"#);
        assert_eq!(body.into_message().as_deref(), Some("File too large"));
    }

    #[test]
    fn falls_back_for_blank_and_non_json() {
        assert_eq!(
            ErrorBody::parse(br#"{"error":"  "}"#).message_or("Bad Request"),
            "Bad Request"
        );
        assert_eq!(
            ErrorBody::parse(b"<html>502</html>").message_or("Bad Gateway"),
            "Bad Gateway"
        );
    }
}
