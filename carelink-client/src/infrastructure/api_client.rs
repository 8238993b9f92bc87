use std::time::Duration;

use carelink_config::ApiConfig;
use carelink_model::{ErrorBody, Payload, routes};
use log::{debug, info, warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::errors::{ApiError, ApiResult};
use super::request::{ApiRequest, RequestBody};
use crate::domains::auth::{SessionManager, SignOutReason};

/// Join a route onto the API base URL.
pub(crate) fn endpoint_url(base: &Url, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// API client with transparent credential refresh
///
/// Every call carries the current bearer token. A 401 triggers one shared
/// refresh through the [`SessionManager`] and one replay of the identical
/// request. Whatever the replay returns is final.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    session: SessionManager,
    request_timeout: Duration,
    health_timeout: Duration,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("request_timeout", &self.request_timeout)
            .field("session", &self.session)
            .finish()
    }
}

impl ApiClient {
    pub fn new(session: SessionManager, api: &ApiConfig) -> Self {
        info!(
            "[ApiClient] Creating API client with base URL: {}",
            api.base_url
        );

        Self {
            http: session.http().clone(),
            base_url: api.base_url.clone(),
            session,
            request_timeout: api.request_timeout,
            health_timeout: api.health_timeout,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn build_url(&self, path: impl AsRef<str>) -> String {
        endpoint_url(&self.base_url, path.as_ref())
    }

    /// Send an authenticated request, refreshing and replaying once on 401.
    ///
    /// Fails with [`ApiError::Unauthenticated`] before any I/O when no
    /// credential is held, and with [`ApiError::SessionExpired`] when the
    /// refresh fails. Any other response, including one from the replay, is
    /// returned untouched.
    pub async fn send(&self, request: &ApiRequest) -> ApiResult<Response> {
        self.send_tracked(request)
            .await
            .map(|(response, _)| response)
    }

    /// [`send`](Self::send), also returning the credential epoch of the
    /// bearer the final response was obtained with.
    async fn send_tracked(&self, request: &ApiRequest) -> ApiResult<(Response, u64)> {
        let Some(bearer) = self.session.bearer_snapshot().await else {
            debug!(
                "[ApiClient] No credential for {} {}",
                request.method, request.path
            );
            return Err(ApiError::Unauthenticated);
        };

        let response = self.dispatch(request, &bearer.header).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok((response, bearer.epoch));
        }

        info!(
            "[ApiClient] {} {} returned 401, refreshing credential",
            request.method, request.path
        );
        if let Err(e) = self.session.refresh_from(bearer.epoch).await {
            warn!("[ApiClient] Token refresh failed: {}", e);
            self.session
                .expire_session(bearer.epoch, SignOutReason::RefreshFailed)
                .await;
            return Err(ApiError::SessionExpired);
        }

        let Some(retry) = self.session.bearer_snapshot().await else {
            // Signed out while the refresh was settling
            return Err(ApiError::SessionExpired);
        };
        debug!("[ApiClient] Replaying {} {}", request.method, request.path);
        let response = self.dispatch(request, &retry.header).await?;
        Ok((response, retry.epoch))
    }

    /// [`send`](Self::send) abandoned as soon as `cancel` fires.
    ///
    /// A cancelled call is never retried. A refresh it started keeps running
    /// for any other waiter.
    pub async fn send_cancellable(
        &self,
        request: &ApiRequest,
        cancel: &CancellationToken,
    ) -> ApiResult<Response> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("[ApiClient] {} {} cancelled", request.method, request.path);
                Err(ApiError::Cancelled)
            }
            result = self.send(request) => result,
        }
    }

    /// Send and decode a JSON payload, bare or wrapped in `{ "data": .. }`.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> ApiResult<T> {
        let (response, epoch) = self.send_tracked(request).await?;
        self.decode(response, epoch).await
    }

    pub async fn execute_json_cancellable<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        cancel: &CancellationToken,
    ) -> ApiResult<T> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            result = self.execute_json(request) => result,
        }
    }

    /// Unauthenticated liveness probe.
    pub async fn health(&self) -> ApiResult<()> {
        let response = self
            .http
            .get(self.build_url(routes::HEALTH))
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(application_error(status, &response.bytes().await.unwrap_or_default()))
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        bearer: &str,
    ) -> ApiResult<Response> {
        self.build(request, bearer)?
            .send()
            .await
            .map_err(ApiError::from_transport)
    }

    /// Fresh transport request for one attempt.
    fn build(&self, request: &ApiRequest, bearer: &str) -> ApiResult<RequestBuilder> {
        let mut headers = request.headers.clone();
        let authorization = HeaderValue::from_str(bearer).map_err(|_| {
            warn!("[ApiClient] Stored access token is not a valid header value");
            ApiError::Unauthenticated
        })?;
        headers.insert(AUTHORIZATION, authorization);
        if request.body.is_multipart() {
            // reqwest supplies the boundary
            headers.remove(CONTENT_TYPE);
        } else {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let builder = self
            .http
            .request(request.method.clone(), self.build_url(&request.path))
            .headers(headers)
            .timeout(request.timeout.unwrap_or(self.request_timeout));

        Ok(match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart { field, file } => {
                let part = Part::bytes(file.bytes.clone())
                    .file_name(file.file_name.clone())
                    .mime_str(&file.content_type)
                    .map_err(|e| {
                        ApiError::InvalidResponse(format!(
                            "invalid upload content type: {e}"
                        ))
                    })?;
                builder.multipart(Form::new().part(*field, part))
            }
        })
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        response: Response,
        epoch: u64,
    ) -> ApiResult<T> {
        let status = response.status();
        let raw = response.bytes().await.map_err(ApiError::from_transport)?;

        if status == StatusCode::UNAUTHORIZED {
            warn!("[ApiClient] Backend rejected refreshed credential");
            self.session
                .expire_session(epoch, SignOutReason::Rejected)
                .await;
            return Err(ApiError::SessionExpired);
        }
        if !status.is_success() {
            return Err(application_error(status, &raw));
        }

        serde_json::from_slice::<Payload<T>>(&raw)
            .map(Payload::into_inner)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

fn application_error(status: StatusCode, raw: &[u8]) -> ApiError {
    let fallback = status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
    ApiError::Application {
        status,
        message: ErrorBody::parse(raw).message_or(fallback),
    }
}
