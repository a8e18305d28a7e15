//! Authenticated session state shared by the REST and WebSocket clients.

use std::{fmt, sync::Arc};

use tokio::sync::RwLock;

/// Proof of authentication obtained from `QuickAuth` or the OAuth token exchange.
#[derive(Clone, PartialEq, Eq)]
pub enum SessionAuth {
    /// Session token returned by `QuickAuth`, sent as `jKey`.
    Session {
        uid: String,
        actid: String,
        susertoken: String,
    },
    /// OAuth access token, sent as a bearer token.
    OAuth {
        uid: String,
        actid: String,
        access_token: String,
    },
}

impl SessionAuth {
    pub fn uid(&self) -> &str {
        match self {
            SessionAuth::Session { uid, .. } | SessionAuth::OAuth { uid, .. } => uid,
        }
    }

    pub fn actid(&self) -> &str {
        match self {
            SessionAuth::Session { actid, .. } | SessionAuth::OAuth { actid, .. } => actid,
        }
    }

    /// The `jKey` appended to request bodies, only for session logins.
    pub fn jkey(&self) -> Option<&str> {
        match self {
            SessionAuth::Session { susertoken, .. } => Some(susertoken),
            SessionAuth::OAuth { .. } => None,
        }
    }

    /// The `Authorization` header value, only for OAuth sessions.
    pub fn bearer(&self) -> Option<String> {
        match self {
            SessionAuth::Session { .. } => None,
            SessionAuth::OAuth { access_token, .. } => Some(format!("Bearer {access_token}")),
        }
    }
}

impl fmt::Debug for SessionAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionAuth::Session { uid, actid, .. } => f
                .debug_struct("Session")
                .field("uid", uid)
                .field("actid", actid)
                .finish_non_exhaustive(),
            SessionAuth::OAuth { uid, actid, .. } => f
                .debug_struct("OAuth")
                .field("uid", uid)
                .field("actid", actid)
                .finish_non_exhaustive(),
        }
    }
}

/// Clonable handle on the current authentication, if any.
#[derive(Debug, Clone, Default)]
pub struct NorenSession {
    inner: Arc<RwLock<Option<SessionAuth>>>,
}

impl NorenSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_auth(auth: SessionAuth) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(auth))),
        }
    }

    pub async fn get(&self) -> Option<SessionAuth> {
        self.inner.read().await.clone()
    }

    pub async fn set(&self, auth: SessionAuth) {
        *self.inner.write().await = Some(auth);
    }

    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.read().await.is_some()
    }
}
