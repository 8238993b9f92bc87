//! Authentication domain
//!
//! Credential persistence, the session lifecycle and its notifications.

pub mod errors;
pub mod events;
pub mod manager;
pub mod storage;

pub use errors::*;
pub use events::{SessionEvent, SignOutReason};
pub use manager::SessionManager;
pub use storage::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
