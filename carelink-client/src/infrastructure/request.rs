//! Replayable request descriptions.
//!
//! A `reqwest::RequestBuilder` is consumed by `send` and cannot be cloned
//! once it carries a streaming body. The client therefore works from an
//! [`ApiRequest`] and builds a fresh transport request for every attempt,
//! which keeps the post-refresh retry byte-identical to the first try.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use super::errors::{ApiError, ApiResult};
use crate::domains::clinical::FileUpload;

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    /// Single-file multipart form
    Multipart {
        field: &'static str,
        file: FileUpload,
    },
}

impl RequestBody {
    pub fn is_multipart(&self) -> bool {
        matches!(self, RequestBody::Multipart { .. })
    }
}

/// Authenticated request against a backend route.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
    /// Overrides the configured request timeout
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> ApiResult<Self> {
        let value = serde_json::to_value(body).map_err(ApiError::Encode)?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    /// Upload `file` as the `file` field of a multipart form.
    pub fn multipart(mut self, file: FileUpload) -> Self {
        self.body = RequestBody::Multipart {
            field: "file",
            file,
        };
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
