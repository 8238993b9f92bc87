//! HTTP plumbing shared by every domain
//!
//! Requests are described as replayable [`ApiRequest`] values and sent
//! through [`ApiClient`], which owns the refresh-and-replay policy.

pub mod api_client;
pub mod errors;
pub mod request;

pub use api_client::ApiClient;
pub use errors::{ApiError, ApiResult, ValidationError};
pub use request::{ApiRequest, RequestBody};
