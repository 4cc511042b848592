//! Client-side signed-in state.
//!
//! One [`SessionHolder`] per client. Views subscribe to a
//! `tokio::sync::watch` receiver and re-render on change; nothing reads the
//! state through a global.

use std::fmt;

use tokio::sync::watch;
use zeroize::Zeroizing;

use crate::inbound::http::users::UserResponse;

/// Session cookie plus the identity it was issued for.
#[derive(Clone, PartialEq)]
pub struct ClientSession {
    cookie: Zeroizing<String>,
    user: UserResponse,
}

impl ClientSession {
    /// `cookie` is the `name=value` pair to send back in the `Cookie` header.
    pub fn new(cookie: impl Into<String>, user: UserResponse) -> Self {
        Self {
            cookie: Zeroizing::new(cookie.into()),
            user,
        }
    }

    pub fn cookie(&self) -> &str {
        self.cookie.as_str()
    }

    pub fn user(&self) -> &UserResponse {
        &self.user
    }
}

impl fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSession")
            .field("cookie", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Owner of the current [`ClientSession`].
///
/// # Examples
/// ```
/// use parcel_market::client::{ClientSession, SessionHolder};
/// use parcel_market::inbound::http::users::UserResponse;
///
/// let holder = SessionHolder::new();
/// let mut changes = holder.subscribe();
/// holder.set_session(ClientSession::new(
///     "parcel_session=abc",
///     UserResponse {
///         id: "3fa85f64-5717-4562-b3fc-2c963f66afa6".into(),
///         email: Some("ada@example.com".into()),
///         full_name: None,
///         is_landlord: false,
///         account_type: None,
///     },
/// ));
/// assert!(changes.has_changed().unwrap());
/// assert!(changes.borrow_and_update().is_some());
/// ```
#[derive(Debug)]
pub struct SessionHolder {
    tx: watch::Sender<Option<ClientSession>>,
}

impl Default for SessionHolder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHolder {
    /// Holder with nobody signed in.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Snapshot of the current session.
    pub fn current(&self) -> Option<ClientSession> {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every sign-in, refresh and sign-out.
    pub fn subscribe(&self) -> watch::Receiver<Option<ClientSession>> {
        self.tx.subscribe()
    }

    pub fn set_session(&self, session: ClientSession) {
        self.tx.send_replace(Some(session));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// Drop the sender; subscribers observe the channel closing.
    pub fn shutdown(self) {
        drop(self.tx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn session() -> ClientSession {
        ClientSession::new(
            "parcel_session=abc",
            UserResponse {
                id: "3fa85f64-5717-4562-b3fc-2c963f66afa6".into(),
                email: Some("ada@example.com".into()),
                full_name: Some("Ada".into()),
                is_landlord: true,
                account_type: None,
            },
        )
    }

    #[rstest]
    fn debug_output_hides_the_cookie(session: ClientSession) {
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("abc"));
        assert!(rendered.contains("ada@example.com"));
    }

    #[rstest]
    #[tokio::test]
    async fn subscribers_see_sign_in_then_sign_out(session: ClientSession) {
        let holder = SessionHolder::new();
        let mut rx = holder.subscribe();

        holder.set_session(session.clone());
        rx.changed().await.expect("sign-in observed");
        assert_eq!(rx.borrow_and_update().as_ref(), Some(&session));

        holder.clear();
        rx.changed().await.expect("sign-out observed");
        assert!(rx.borrow_and_update().is_none());
        assert!(holder.current().is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn shutdown_closes_subscriptions() {
        let holder = SessionHolder::new();
        let mut rx = holder.subscribe();
        holder.shutdown();
        assert!(rx.changed().await.is_err());
    }
}
