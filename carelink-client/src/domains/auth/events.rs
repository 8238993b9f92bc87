//! Session lifecycle notifications.
//!
//! Events describe transitions after they happened. They are not a second
//! copy of the session: the credential store stays authoritative, and a
//! subscriber that misses events can always ask the manager directly.

use carelink_model::UserProfile;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    /// The user asked to sign out
    Logout,
    /// The refresh token was rejected or the refresh call failed
    RefreshFailed,
    /// The backend rejected a freshly refreshed credential
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(UserProfile),
    Refreshed,
    SignedOut(SignOutReason),
}

#[derive(Debug, Clone)]
pub(crate) struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        // Ignore send errors (no receivers)
        let _ = self.sender.send(event);
    }
}
