// Nimbus Drive Session Store
// Auth token + signed-in user persisted under the `user` key of the local store.
// A forced logout (any 401) clears it and notifies every subscriber.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::gateway::{LoginGrant, SessionUser};
use crate::settings::{LocalStore, SettingsError, KEY_USER};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn { user_id: String },
    /// `forced` is true when the backend rejected the token
    LoggedOut { forced: bool },
}

pub struct Session {
    pub token: SecretString,
    pub user: SessionUser,
}

/// On-disk shape of the `user` entry
#[derive(Serialize, Deserialize)]
struct StoredSession {
    token: String,
    user: SessionUser,
}

pub struct SessionStore {
    path: PathBuf,
    current: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl SessionStore {
    /// Load the session persisted in the local store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let store = LocalStore::open(&path);
        let current = store.get(KEY_USER).and_then(|value| {
            match serde_json::from_value::<StoredSession>(value.clone()) {
                Ok(stored) => Some(Session {
                    token: SecretString::from(stored.token),
                    user: stored.user,
                }),
                Err(e) => {
                    warn!("Ignoring malformed stored session: {}", e);
                    None
                }
            }
        });
        let (events, _) = broadcast::channel(16);
        Self {
            path,
            current: RwLock::new(current),
            events,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.current.read().unwrap_or_else(|e| {
            warn!("Session lock was poisoned, recovering");
            e.into_inner()
        })
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.current.write().unwrap_or_else(|e| {
            warn!("Session lock was poisoned, recovering");
            e.into_inner()
        })
    }

    pub fn is_signed_in(&self) -> bool {
        self.read().is_some()
    }

    pub fn token(&self) -> Option<SecretString> {
        self.read()
            .as_ref()
            .map(|s| SecretString::from(s.token.expose_secret().to_string()))
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.read().as_ref().map(|s| s.user.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Persist a fresh login and make it current
    pub fn sign_in(&self, grant: LoginGrant) -> Result<SessionUser, SettingsError> {
        let mut store = LocalStore::open(&self.path);
        let stored = StoredSession {
            token: grant.token,
            user: grant.user,
        };
        store.set(KEY_USER, serde_json::to_value(&stored)?);
        store.save()?;

        let user = stored.user.clone();
        *self.write() = Some(Session {
            token: SecretString::from(stored.token),
            user: stored.user,
        });
        info!("Signed in as {}", user.id);
        let _ = self.events.send(AuthEvent::SignedIn { user_id: user.id.clone() });
        Ok(user)
    }

    /// User-initiated logout
    pub fn logout(&self) -> Result<(), SettingsError> {
        self.clear()?;
        let _ = self.events.send(AuthEvent::LoggedOut { forced: false });
        Ok(())
    }

    /// Drop the session after the backend rejected it. Never fails: a storage
    /// error is logged and the in-memory session is cleared regardless.
    pub fn force_logout(&self) {
        warn!("Session rejected by server, forcing logout");
        if let Err(e) = self.clear() {
            warn!("Failed to clear stored session: {}", e);
        }
        let _ = self.events.send(AuthEvent::LoggedOut { forced: true });
    }

    fn clear(&self) -> Result<(), SettingsError> {
        *self.write() = None;
        let mut store = LocalStore::open(&self.path);
        if store.remove(KEY_USER).is_some() {
            store.save()?;
        }
        Ok(())
    }
}
