//! Carelink client library
//!
//! Authenticated access to the carelink clinical API. The
//! [`SessionManager`] owns sign-in state and refreshes credentials, the
//! [`ApiClient`] attaches them to every request and replays a request once
//! across a refresh, and the clinical domain adds typed upload and analysis
//! calls on top.
//!
//! Notes
//! - Only the session manager writes to the [`CredentialStore`].
//! - The `carelink` binary in `src/main.rs` is a thin CLI over this crate.

pub mod bootstrap;
pub mod domains;
pub mod infrastructure;

pub use bootstrap::{build_client, build_client_with_store};
pub use domains::auth::{
    AuthError, CredentialStore, FileCredentialStore, MemoryCredentialStore,
    SessionEvent, SessionManager, SignOutReason,
};
pub use domains::clinical::FileUpload;
pub use infrastructure::{ApiClient, ApiError, ApiRequest, ApiResult, ValidationError};
