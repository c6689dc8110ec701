use std::sync::Arc;

use axum_extra::extract::CookieJar;

use super::config::{GatewayConfig, GatewaySettings};
use super::cookies;
use super::traits::{MailBackend, SessionStore};
use crate::cas::{CasProtocol, ClientSetup};
use crate::credential::CredentialCipher;
use crate::phase::{self, CALLBACK_ACTION, LOGIN_ACTION, Phase, RequestDescriptor};
use crate::service_url::RequestOrigin;
use crate::types::SessionId;

/// The CAS gateway: configuration plus the host's collaborators.
///
/// Cheap to clone; one instance serves every request.
pub struct CasGateway<P, S, B> {
    pub(super) protocol: Arc<P>,
    pub(super) sessions: Arc<S>,
    pub(super) backend: Arc<B>,
    pub(super) settings: Arc<GatewaySettings>,
    pub(super) cipher: CredentialCipher,
}

// Manual Clone: avoid derive adding `P: Clone, S: Clone, B: Clone` bounds.
impl<P, S, B> Clone for CasGateway<P, S, B> {
    fn clone(&self) -> Self {
        Self {
            protocol: self.protocol.clone(),
            sessions: self.sessions.clone(),
            backend: self.backend.clone(),
            settings: self.settings.clone(),
            cipher: self.cipher.clone(),
        }
    }
}

impl<P: CasProtocol, S: SessionStore, B: MailBackend> CasGateway<P, S, B> {
    #[must_use]
    pub fn new(config: GatewayConfig, protocol: P, sessions: S, backend: B) -> Self {
        Self {
            protocol: Arc::new(protocol),
            sessions: Arc::new(sessions),
            backend: Arc::new(backend),
            settings: Arc::new(config.settings),
            cipher: config.cipher,
        }
    }

    #[must_use]
    pub fn classify(&self, request: &RequestDescriptor) -> Phase {
        let phase = phase::classify(request, self.settings.proxy_mode);
        tracing::debug!(?phase, hook = ?request.hook, "Classified request");
        phase
    }

    /// Client setup for this deployment. The service URL is always the login
    /// phase; in proxy mode the PGT callback URL is added.
    pub(super) fn client_setup(&self, origin: &RequestOrigin, proxy: bool) -> ClientSetup {
        let service_url = origin.service_url(&[("action", LOGIN_ACTION)]);
        let setup = if proxy {
            ClientSetup::proxy(
                self.settings.server.clone(),
                service_url,
                origin.service_url(&[("action", CALLBACK_ACTION)]),
            )
        } else {
            ClientSetup::client(self.settings.server.clone(), service_url)
        };

        setup
            .with_cert_validation(self.settings.cert_validation.clone())
            .with_server_login_url(self.settings.login_url.clone())
            .with_server_logout_url(self.settings.logout_url.clone())
    }

    pub(super) fn session_id(&self, jar: &CookieJar) -> Option<SessionId> {
        cookies::session_id(jar, &self.settings.session_cookie_name)
    }
}
