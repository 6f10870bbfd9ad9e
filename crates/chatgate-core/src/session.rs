// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Gateway login session state machine.
//!
//! The session is {Idle, LoggingIn, Ready}. Concurrent `credentials` calls
//! are deduplicated: at most one login attempt is in flight at a time, and
//! only the caller that initiated it observes the terminal outcome. A Ready
//! session with different credentials re-runs the full login (credential
//! rotation).

use std::sync::Arc;

use tokio::sync::{Mutex, oneshot};
use tracing::{info, warn};

use crate::chat::{ChatError, ChatPort};

/// Terminal outcome of a started login attempt.
pub type LoginResult = std::result::Result<(), ChatError>;

/// What a `request_login` call resolved to.
pub enum LoginTicket {
    /// Token or client id missing; nothing was attempted.
    Missing,
    /// Already Ready with the same credentials; no reconnect.
    Already,
    /// A different login is already in flight; this request was not serviced.
    Different,
    /// Login started. The receiver resolves when it settles.
    Started(oneshot::Receiver<LoginResult>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    LoggingIn,
    Ready { token: String, client_id: String },
}

/// Owns the platform login lifecycle.
pub struct SessionManager {
    phase: Mutex<Phase>,
    chat: Arc<dyn ChatPort>,
}

impl SessionManager {
    pub fn new(chat: Arc<dyn ChatPort>) -> Arc<Self> {
        Arc::new(Self {
            phase: Mutex::new(Phase::Idle),
            chat,
        })
    }

    /// Whether the session is Ready.
    pub async fn is_ready(&self) -> bool {
        matches!(*self.phase.lock().await, Phase::Ready { .. })
    }

    /// The client id of the Ready session, if any.
    pub async fn client_id(&self) -> Option<String> {
        match *self.phase.lock().await {
            Phase::Ready { ref client_id, .. } => Some(client_id.clone()),
            _ => None,
        }
    }

    /// Handle a `credentials` request.
    ///
    /// The phase transition happens under the lock, so two concurrent callers
    /// can never both start a login: the second observes LoggingIn and gets
    /// [`LoginTicket::Different`].
    pub async fn request_login(self: &Arc<Self>, token: &str, client_id: &str) -> LoginTicket {
        if token.is_empty() || client_id.is_empty() {
            return LoginTicket::Missing;
        }

        let mut phase = self.phase.lock().await;
        match &*phase {
            Phase::LoggingIn => return LoginTicket::Different,
            Phase::Ready {
                token: current_token,
                client_id: current_client_id,
            } if current_token == token && current_client_id == client_id => {
                return LoginTicket::Already;
            }
            // Idle, or Ready with rotated credentials: fall through to login
            _ => {}
        }

        *phase = Phase::LoggingIn;
        drop(phase);

        let (tx, rx) = oneshot::channel();
        let manager = self.clone();
        let token = token.to_string();
        let client_id = client_id.to_string();
        tokio::spawn(async move {
            manager.run_login(token, client_id, tx).await;
        });

        LoginTicket::Started(rx)
    }

    async fn run_login(
        self: Arc<Self>,
        token: String,
        client_id: String,
        notify: oneshot::Sender<LoginResult>,
    ) {
        let result = self.chat.login(&token, &client_id).await;

        let mut phase = self.phase.lock().await;
        match result {
            Ok(()) => {
                info!(%client_id, "platform login succeeded");
                *phase = Phase::Ready { token, client_id };
                let _ = notify.send(Ok(()));
            }
            Err(e) => {
                warn!(%client_id, error = %e, "platform login failed");
                *phase = Phase::Idle;
                let _ = notify.send(Err(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChat;
    use std::time::Duration;

    fn slow_chat(delay_ms: u64) -> Arc<MockChat> {
        let chat = MockChat::new();
        chat.set_login_delay(Duration::from_millis(delay_ms));
        chat
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_credentials() {
        let session = SessionManager::new(MockChat::new());
        assert!(matches!(
            session.request_login("", "cid").await,
            LoginTicket::Missing
        ));
        assert!(matches!(
            session.request_login("tok", "").await,
            LoginTicket::Missing
        ));
        assert!(!session.is_ready().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_login_success_marks_ready() {
        let session = SessionManager::new(MockChat::new());

        let ticket = session.request_login("tok", "cid").await;
        let LoginTicket::Started(rx) = ticket else {
            panic!("expected Started")
        };
        rx.await.unwrap().unwrap();

        assert!(session.is_ready().await);
        assert_eq!(session.client_id().await.as_deref(), Some("cid"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_login_failure_resets_to_idle() {
        let chat = MockChat::new();
        chat.fail_login();
        let session = SessionManager::new(chat);

        let LoginTicket::Started(rx) = session.request_login("tok", "cid").await else {
            panic!("expected Started")
        };
        assert!(rx.await.unwrap().is_err());
        assert!(!session.is_ready().await);

        // A new attempt is allowed after the failure
        assert!(matches!(
            session.request_login("tok", "cid").await,
            LoginTicket::Started(_)
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_login_deduplicated() {
        let session = SessionManager::new(slow_chat(100));

        let first = session.request_login("tokA", "idA").await;
        let LoginTicket::Started(rx) = first else {
            panic!("expected Started")
        };

        // Second request while the first is pending
        assert!(matches!(
            session.request_login("tokA", "idA").await,
            LoginTicket::Different
        ));

        rx.await.unwrap().unwrap();

        // Third request with the same credentials once Ready
        assert!(matches!(
            session.request_login("tokA", "idA").await,
            LoginTicket::Already
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_credential_rotation_relogs_in() {
        let chat = MockChat::new();
        let session = SessionManager::new(chat.clone());

        let LoginTicket::Started(rx) = session.request_login("tokA", "idA").await else {
            panic!("expected Started")
        };
        rx.await.unwrap().unwrap();

        // Different credentials while Ready re-run the full login
        let LoginTicket::Started(rx) = session.request_login("tokB", "idB").await else {
            panic!("expected Started for rotated credentials")
        };
        rx.await.unwrap().unwrap();

        assert_eq!(session.client_id().await.as_deref(), Some("idB"));
        assert_eq!(chat.login_calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_only_one_login_in_flight() {
        let chat = slow_chat(50);
        let session = SessionManager::new(chat.clone());

        let LoginTicket::Started(rx) = session.request_login("tok", "cid").await else {
            panic!("expected Started")
        };
        for _ in 0..5 {
            assert!(matches!(
                session.request_login("tok", "cid").await,
                LoginTicket::Different
            ));
        }
        rx.await.unwrap().unwrap();

        assert_eq!(chat.login_calls(), 1);
    }
}
