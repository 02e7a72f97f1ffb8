use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub access_expires_at: DateTime<Utc>,
    pub user: UserIdentity,
}

/// Holder for the signed-in user's tokens, passed to whatever needs the
/// current identity.
pub trait SessionStore: Send + Sync {
    fn get(&self) -> Option<AuthSession>;
    fn set(&self, session: AuthSession);
    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: RwLock<Option<AuthSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self) -> Option<AuthSession> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set(&self, session: AuthSession) {
        *self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(session);
    }

    fn clear(&self) {
        *self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rehydration {
    Active(AuthSession),
    NeedsRefresh { refresh_token: String, user: UserIdentity },
    SignedOut,
}

/// Decides what to do with stored credentials on start-up. Exchanging the
/// refresh token is left to the caller.
pub fn rehydrate(store: &dyn SessionStore, now: DateTime<Utc>) -> Rehydration {
    let Some(session) = store.get() else {
        return Rehydration::SignedOut;
    };

    if session.access_expires_at > now {
        return Rehydration::Active(session);
    }

    match session.refresh_token {
        Some(refresh_token) => Rehydration::NeedsRefresh {
            refresh_token,
            user: session.user,
        },
        None => {
            store.clear();
            Rehydration::SignedOut
        }
    }
}
