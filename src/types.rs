use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// User identifier as validated by the CAS server.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Host-defined session identifier (opaque string).
///
/// Issued by [`SessionStore::start`](crate::middleware::SessionStore::start) and
/// replaced by [`SessionStore::regenerate_id`](crate::middleware::SessionStore::regenerate_id)
/// after a successful login.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Where the mail backend lives for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendTarget {
    pub host: String,
    pub port: u16,
    /// Connect over TLS.
    pub secure: bool,
}

impl BackendTarget {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, secure: bool) -> Self {
        Self {
            host: host.into(),
            port,
            secure,
        }
    }
}

/// The part of the host's webmail session the gateway reads and writes.
///
/// # Lifecycle
///
/// A session starts out `temp` while the browser is bounced through the CAS
/// server. A successful backend login fills in `user`, `backend` and
/// `credential`, clears `temp` and moves the session to a fresh id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSession {
    pub id: SessionId,
    pub user: Option<UserId>,
    pub backend: Option<BackendTarget>,
    pub temp: bool,
    /// Delegated credential, sealed with [`CredentialCipher`](crate::credential::CredentialCipher).
    pub credential: Option<String>,
}

impl ApplicationSession {
    /// A fresh session that only carries state through the CAS redirect.
    #[must_use]
    pub fn temp(id: SessionId) -> Self {
        Self {
            id,
            user: None,
            backend: None,
            temp: true,
            credential: None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.temp && self.user.is_some()
    }
}
