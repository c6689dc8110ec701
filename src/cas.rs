//! Seam to the CAS client library.
//!
//! The gateway never speaks the CAS protocol itself. It sets up one client per
//! request, the way the library expects to be configured, and asks it to
//! authenticate, to mint proxy tickets and to log out.

use std::future::Future;
use std::path::PathBuf;

use axum::http::HeaderMap;
use secrecy::SecretString;
use url::Url;

use crate::return_url::QueryParams;
use crate::types::UserId;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Location of the CAS server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasServer {
    pub host: String,
    pub port: u16,
    /// Base path of the CAS endpoints, e.g. `/cas`.
    pub uri: String,
}

impl CasServer {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, uri: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            uri: uri.into(),
        }
    }
}

/// How the client checks the CAS server's TLS certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertValidation {
    None,
    /// Verify against the CA certificate at the path.
    Ca(PathBuf),
    /// Pin the server's own (possibly self-signed) certificate.
    Pinned(PathBuf),
}

impl CertValidation {
    /// Builds a validation mode from its configuration name.
    ///
    /// `self` is accepted as an alias of `pinned`.
    ///
    /// # Errors
    ///
    /// Returns a message if the mode is unknown or needs a certificate path
    /// that was not given.
    pub fn from_config(mode: &str, cert_path: Option<PathBuf>) -> Result<Self, String> {
        match mode {
            "" | "none" => Ok(Self::None),
            "ca" => cert_path
                .map(Self::Ca)
                .ok_or_else(|| "validation mode `ca` requires a certificate path".into()),
            "pinned" | "self" => cert_path
                .map(Self::Pinned)
                .ok_or_else(|| "validation mode `pinned` requires a certificate path".into()),
            other => Err(format!("unknown validation mode `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMode {
    /// Plain CAS client: validates service tickets only.
    Client,
    /// CAS proxy: also receives PGTs on `callback_url` and mints proxy tickets.
    Proxy { callback_url: String },
}

/// Everything a CAS client is configured with for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSetup {
    pub mode: ClientMode,
    pub server: CasServer,
    /// Fixed service URL the CAS server redirects back to.
    pub service_url: String,
    pub cert_validation: CertValidation,
    pub login_url: Option<Url>,
    pub logout_url: Option<Url>,
}

impl ClientSetup {
    #[must_use]
    pub fn client(server: CasServer, service_url: impl Into<String>) -> Self {
        Self {
            mode: ClientMode::Client,
            server,
            service_url: service_url.into(),
            cert_validation: CertValidation::None,
            login_url: None,
            logout_url: None,
        }
    }

    #[must_use]
    pub fn proxy(
        server: CasServer,
        service_url: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            mode: ClientMode::Proxy {
                callback_url: callback_url.into(),
            },
            ..Self::client(server, service_url)
        }
    }

    #[must_use]
    pub fn with_cert_validation(mut self, validation: CertValidation) -> Self {
        self.cert_validation = validation;
        self
    }

    #[must_use]
    pub fn with_server_login_url(mut self, url: Url) -> Self {
        self.login_url = Some(url);
        self
    }

    #[must_use]
    pub fn with_server_logout_url(mut self, url: Url) -> Self {
        self.logout_url = Some(url);
        self
    }

    #[must_use]
    pub fn is_proxy(&self) -> bool {
        matches!(self.mode, ClientMode::Proxy { .. })
    }
}

/// The parts of the inbound request a CAS client looks at: the `ticket`
/// parameter on return from the CAS server, `pgtIou`/`pgtId` on callback,
/// and its own cookies.
#[derive(Debug, Clone, Copy)]
pub struct CasRequest<'a> {
    pub query: &'a QueryParams,
    pub headers: &'a HeaderMap,
}

/// Result of [`CasClient::force_authenticate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    Authenticated(UserId),
    /// Not authenticated yet; send the browser to this CAS location.
    Redirect(String),
}

/// Proxy ticket exchange failure as reported by the CAS client.
#[derive(Debug, Clone, thiserror::Error)]
#[error("proxy ticket exchange failed (code {code})")]
pub struct ProxyTicketError {
    pub code: i32,
    /// Raw CAS server response, for diagnostics.
    pub output: String,
}

/// Factory for per-request CAS clients.
///
/// The proxy-granting ticket mapping (PGT IOU to PGT) belongs to the
/// implementation and must be safe to use from concurrent requests: the CAS
/// callback and the browser's return arrive as independent requests.
pub trait CasProtocol: Send + Sync + 'static {
    type Client: CasClient;

    fn init_client(&self, setup: ClientSetup) -> Self::Client;
}

/// One configured CAS client.
pub trait CasClient: Send {
    /// Validates the request's service ticket or the existing CAS session.
    ///
    /// A callback request carrying `pgtIou`/`pgtId` is consumed here as well.
    fn force_authenticate(
        &mut self,
        request: &CasRequest<'_>,
    ) -> impl Future<Output = Result<Authentication, BoxError>> + Send;

    /// Exchanges the user's PGT for a one-time proxy ticket for `target_service`.
    fn proxy_ticket(
        &mut self,
        target_service: &str,
    ) -> impl Future<Output = Result<SecretString, ProxyTicketError>> + Send;

    /// Ends the CAS session. Returns the CAS logout location for the browser.
    fn server_logout(&mut self) -> String;
}
