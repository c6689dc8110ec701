//! Recording test doubles for the CAS client, session store and mail backend.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use axum::http::header::{COOKIE, HOST, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::Request;
use axum::response::Response;
use axum_extra::extract::cookie::Cookie;
use secrecy::{ExposeSecret, SecretString};

use crate::cas::{
    Authentication, BoxError, CasClient, CasProtocol, CasRequest, CasServer, ClientSetup,
    ProxyTicketError,
};
use crate::credential::CredentialCipher;
use crate::middleware::{GatewayConfig, MailBackend, SessionStore};
use crate::types::{ApplicationSession, BackendTarget, SessionId, UserId};

pub(crate) const LOGIN_URL: &str = "https://cas.example.org/cas/login";
pub(crate) const LOGOUT_URL: &str = "https://cas.example.org/cas/logout";
pub(crate) const SESSION_COOKIE: &str = "webmail_session";
const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

pub(crate) fn cipher() -> CredentialCipher {
    CredentialCipher::from_hex_key(KEY_HEX).unwrap()
}

/// Static-secret configuration; switch to proxy mode with `with_proxy_mode`.
pub(crate) fn config() -> GatewayConfig {
    GatewayConfig::new(
        CasServer::new("cas.example.org", 443, "/cas"),
        LOGIN_URL.parse().unwrap(),
        LOGOUT_URL.parse().unwrap(),
        cipher(),
    )
    .with_static_backend_secret("s3cret")
    .with_secure_cookies(false)
}

pub(crate) fn proxy_config() -> GatewayConfig {
    config()
        .with_proxy_mode(true)
        .with_backend_service_name("imap://imap.example.org")
}

pub(crate) fn parts(uri: &str, cookie: Option<&str>) -> Parts {
    let mut builder = Request::builder().uri(uri).header(HOST, "mail.example.org");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(()).unwrap().into_parts().0
}

pub(crate) fn set_cookies(response: &Response) -> Vec<Cookie<'static>> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| Cookie::parse_encoded(v.to_str().unwrap().to_string()).unwrap())
        .collect()
}

pub(crate) fn set_cookie(response: &Response, name: &str) -> Option<Cookie<'static>> {
    set_cookies(response).into_iter().find(|c| c.name() == name)
}

/// Session as it looks after a completed login.
pub(crate) fn logged_in_session(id: &str, credential: &str) -> ApplicationSession {
    let mut session = ApplicationSession::temp(SessionId::from(id.to_string()));
    session.temp = false;
    session.user = Some(UserId::from("alice".to_string()));
    session.backend = Some(imap_target());
    session.credential = Some(
        cipher()
            .encrypt(&SecretString::from(credential.to_string()))
            .unwrap(),
    );
    session
}

pub(crate) fn imap_target() -> BackendTarget {
    BackendTarget::new("imap.example.org", 993, true)
}

// ── CAS ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub(crate) struct CasCalls {
    pub(crate) init: usize,
    pub(crate) authenticate: usize,
    pub(crate) proxy_ticket: usize,
    pub(crate) logout: usize,
    pub(crate) setups: Vec<ClientSetup>,
    pub(crate) callbacks: Vec<(String, String)>,
    pub(crate) ticket_services: Vec<String>,
}

#[derive(Default)]
struct FakeCasState {
    user: Option<String>,
    unreachable: bool,
    tickets: VecDeque<Result<String, i32>>,
    calls: CasCalls,
}

/// CAS client whose user and proxy tickets are scripted up front.
#[derive(Clone, Default)]
pub(crate) struct FakeCas {
    state: Arc<Mutex<FakeCasState>>,
}

impl FakeCas {
    /// Every `force_authenticate` redirects to the CAS login page.
    pub(crate) fn anonymous() -> Self {
        Self::default()
    }

    pub(crate) fn authenticated(user: &str) -> Self {
        let cas = Self::default();
        cas.state.lock().unwrap().user = Some(user.to_string());
        cas
    }

    /// Every `force_authenticate` fails with a transport error.
    pub(crate) fn unreachable() -> Self {
        let cas = Self::default();
        cas.state.lock().unwrap().unreachable = true;
        cas
    }

    pub(crate) fn with_tickets(self, tickets: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .tickets
            .extend(tickets.iter().map(|t| Ok(t.to_string())));
        self
    }

    pub(crate) fn with_ticket_failure(self, code: i32) -> Self {
        self.state.lock().unwrap().tickets.push_back(Err(code));
        self
    }

    pub(crate) fn calls(&self) -> CasCalls {
        self.state.lock().unwrap().calls.clone()
    }
}

impl CasProtocol for FakeCas {
    type Client = FakeCasClient;

    fn init_client(&self, setup: ClientSetup) -> FakeCasClient {
        let mut state = self.state.lock().unwrap();
        state.calls.init += 1;
        state.calls.setups.push(setup.clone());
        FakeCasClient {
            setup,
            state: self.state.clone(),
        }
    }
}

pub(crate) struct FakeCasClient {
    setup: ClientSetup,
    state: Arc<Mutex<FakeCasState>>,
}

impl CasClient for FakeCasClient {
    async fn force_authenticate(
        &mut self,
        request: &CasRequest<'_>,
    ) -> Result<Authentication, BoxError> {
        let mut state = self.state.lock().unwrap();
        state.calls.authenticate += 1;
        if let (Some(iou), Some(pgt)) = (request.query.get("pgtIou"), request.query.get("pgtId")) {
            state.calls.callbacks.push((iou.to_string(), pgt.to_string()));
        }
        if state.unreachable {
            return Err("CAS server unreachable".into());
        }

        Ok(match &state.user {
            Some(user) => Authentication::Authenticated(UserId::from(user.clone())),
            None => {
                let login = self.setup.login_url.as_ref().map(|u| u.as_str()).unwrap_or_default();
                Authentication::Redirect(format!(
                    "{login}?service={}",
                    urlencoding::encode(&self.setup.service_url)
                ))
            }
        })
    }

    async fn proxy_ticket(
        &mut self,
        target_service: &str,
    ) -> Result<SecretString, ProxyTicketError> {
        let mut state = self.state.lock().unwrap();
        state.calls.proxy_ticket += 1;
        state.calls.ticket_services.push(target_service.to_string());
        match state.tickets.pop_front() {
            Some(Ok(ticket)) => Ok(SecretString::from(ticket)),
            Some(Err(code)) => Err(ProxyTicketError {
                code,
                output: "<cas:proxyFailure code=\"INVALID_TICKET\"/>".into(),
            }),
            None => Err(ProxyTicketError {
                code: 0,
                output: String::new(),
            }),
        }
    }

    fn server_logout(&mut self) -> String {
        self.state.lock().unwrap().calls.logout += 1;
        self.setup
            .logout_url
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_default()
    }
}

// ── Sessions ───────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub(crate) struct MemorySessions {
    sessions: Arc<Mutex<HashMap<SessionId, ApplicationSession>>>,
}

impl MemorySessions {
    pub(crate) fn insert(&self, session: ApplicationSession) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
    }

    pub(crate) fn get(&self, id: &str) -> Option<ApplicationSession> {
        self.sessions
            .lock()
            .unwrap()
            .get(&SessionId::from(id.to_string()))
            .cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub(crate) fn snapshot(&self) -> HashMap<SessionId, ApplicationSession> {
        self.sessions.lock().unwrap().clone()
    }
}

impl SessionStore for MemorySessions {
    async fn find(&self, session_id: &SessionId) -> Result<Option<ApplicationSession>, BoxError> {
        Ok(self.sessions.lock().unwrap().get(session_id).cloned())
    }

    async fn start(&self) -> Result<ApplicationSession, BoxError> {
        let session = ApplicationSession::temp(SessionId::from(ulid::Ulid::new().to_string()));
        self.insert(session.clone());
        Ok(session)
    }

    async fn save(&self, session: &ApplicationSession) -> Result<(), BoxError> {
        self.insert(session.clone());
        Ok(())
    }

    async fn destroy(&self, session_id: &SessionId) -> Result<(), BoxError> {
        self.sessions.lock().unwrap().remove(session_id);
        Ok(())
    }

    async fn regenerate_id(&self, session_id: &SessionId) -> Result<SessionId, BoxError> {
        let mut sessions = self.sessions.lock().unwrap();
        let mut session = sessions
            .remove(session_id)
            .ok_or_else(|| format!("unknown session {session_id}"))?;
        session.id = SessionId::from(ulid::Ulid::new().to_string());
        sessions.insert(session.id.clone(), session.clone());
        Ok(session.id)
    }
}

// ── Backend ────────────────────────────────────────────────────────

#[derive(Default)]
struct BackendState {
    target: Option<BackendTarget>,
    accepted: Vec<String>,
    logins: Vec<(String, String, String)>,
    connects: Vec<String>,
    logouts: usize,
}

/// Mail backend accepting a fixed set of credentials.
#[derive(Clone, Default)]
pub(crate) struct FakeBackend {
    state: Arc<Mutex<BackendState>>,
}

impl FakeBackend {
    pub(crate) fn accepting(credentials: &[&str]) -> Self {
        let backend = Self::default();
        {
            let mut state = backend.state.lock().unwrap();
            state.target = Some(imap_target());
            state.accepted = credentials.iter().map(|c| c.to_string()).collect();
        }
        backend
    }

    pub(crate) fn without_target(self) -> Self {
        self.state.lock().unwrap().target = None;
        self
    }

    /// `(user, credential, host)` of every login attempt.
    pub(crate) fn logins(&self) -> Vec<(String, String, String)> {
        self.state.lock().unwrap().logins.clone()
    }

    /// Credentials of every connect attempt.
    pub(crate) fn connects(&self) -> Vec<String> {
        self.state.lock().unwrap().connects.clone()
    }

    pub(crate) fn logouts(&self) -> usize {
        self.state.lock().unwrap().logouts
    }
}

impl MailBackend for FakeBackend {
    fn resolve_target(&self) -> Option<BackendTarget> {
        self.state.lock().unwrap().target.clone()
    }

    async fn login(
        &self,
        user: &UserId,
        credential: &SecretString,
        target: &BackendTarget,
    ) -> Result<bool, BoxError> {
        let mut state = self.state.lock().unwrap();
        let credential = credential.expose_secret().to_string();
        let accepted = state.accepted.contains(&credential);
        state
            .logins
            .push((user.to_string(), credential, target.host.clone()));
        Ok(accepted)
    }

    async fn connect(
        &self,
        _target: &BackendTarget,
        _user: &UserId,
        credential: &SecretString,
    ) -> Result<bool, BoxError> {
        let mut state = self.state.lock().unwrap();
        let credential = credential.expose_secret().to_string();
        let accepted = state.accepted.contains(&credential);
        state.connects.push(credential);
        Ok(accepted)
    }

    async fn logout_actions(&self, _session: &ApplicationSession) -> Result<(), BoxError> {
        self.state.lock().unwrap().logouts += 1;
        Ok(())
    }
}
