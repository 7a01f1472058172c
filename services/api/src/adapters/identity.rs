//! services/api/src/adapters/identity.rs
//!
//! An in-process implementation of the `IdentityProvider` port. Sessions map
//! an opaque cookie value to a guest user; each session owns a `watch`
//! channel so views can follow sign-in and sign-out.

use async_stream::stream;
use async_trait::async_trait;
use countdown_core::domain::User;
use countdown_core::identity::guest_user;
use countdown_core::ports::{IdentityProvider, PortError, PortResult, Subscription};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InMemoryIdentityProvider {
    sessions: Arc<RwLock<HashMap<String, watch::Sender<Option<User>>>>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> PortError {
        PortError::Unexpected("identity session lock poisoned".to_string())
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn current_user(&self, session: &str) -> PortResult<Option<User>> {
        let sessions = self.sessions.read().map_err(|_| Self::poisoned())?;
        Ok(sessions.get(session).and_then(|tx| tx.borrow().clone()))
    }

    async fn on_auth_change(&self, session: &str) -> PortResult<Subscription<Option<User>>> {
        let rx = {
            let sessions = self.sessions.read().map_err(|_| Self::poisoned())?;
            sessions.get(session).map(watch::Sender::subscribe)
        };
        // An unknown session is signed out and stays that way.
        let Some(mut rx) = rx else {
            return Ok(Subscription::new(futures::stream::once(async { None })));
        };
        let changes = stream! {
            loop {
                let user = rx.borrow_and_update().clone();
                yield user;
                if rx.changed().await.is_err() {
                    break;
                }
            }
        };
        Ok(Subscription::new(changes))
    }

    async fn sign_in_guest(&self, display_name: &str) -> PortResult<(String, User)> {
        let user = guest_user(display_name);
        let session = Uuid::new_v4().to_string();
        {
            let mut sessions = self.sessions.write().map_err(|_| Self::poisoned())?;
            sessions.insert(session.clone(), watch::channel(Some(user.clone())).0);
        }
        info!("Guest {} signed in as {}", user.id, user.display_name);
        Ok((session, user))
    }

    async fn sign_out(&self, session: &str) -> PortResult<()> {
        let mut sessions = self.sessions.write().map_err(|_| Self::poisoned())?;
        match sessions.remove(session) {
            Some(tx) => {
                tx.send_replace(None);
                Ok(())
            }
            None => Err(PortError::NotFound(format!("Session {} not found", session))),
        }
    }
}
