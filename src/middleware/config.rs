use std::path::PathBuf;

use secrecy::SecretString;
use url::Url;

use super::error::AuthError;
use crate::cas::{CasServer, CertValidation};
use crate::credential::CredentialCipher;

/// Settings shared by the gateway phases at runtime.
pub(crate) struct GatewaySettings {
    pub(crate) server: CasServer,
    pub(crate) login_url: Url,
    pub(crate) logout_url: Url,
    pub(crate) cert_validation: CertValidation,
    pub(crate) proxy_mode: bool,
    pub(crate) backend_service_name: String,
    pub(crate) static_backend_secret: Option<SecretString>,
    pub(crate) credential_caching: bool,
    pub(crate) session_cookie_name: String,
    pub(crate) app_root: String,
    pub(crate) secure_cookies: bool,
}

impl GatewaySettings {
    fn defaults(server: CasServer, login_url: Url, logout_url: Url) -> Self {
        Self {
            server,
            login_url,
            logout_url,
            cert_validation: CertValidation::None,
            proxy_mode: false,
            backend_service_name: "imap".into(),
            static_backend_secret: None,
            credential_caching: false,
            session_cookie_name: "webmail_session".into(),
            app_root: "/".into(),
            secure_cookies: true,
        }
    }
}

/// CAS gateway configuration.
///
/// Required fields are constructor parameters. Use
/// [`from_env()`](GatewayConfig::from_env) for convention-based setup, or
/// [`new()`](GatewayConfig::new) with `with_*` methods for full control.
pub struct GatewayConfig {
    pub(super) settings: GatewaySettings,
    pub(super) cipher: CredentialCipher,
}

impl GatewayConfig {
    /// Create config with the CAS server, its login/logout pages and the
    /// cipher sealing credentials at rest.
    #[must_use]
    pub fn new(
        server: CasServer,
        login_url: Url,
        logout_url: Url,
        cipher: CredentialCipher,
    ) -> Self {
        Self {
            settings: GatewaySettings::defaults(server, login_url, logout_url),
            cipher,
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `CAS_HOSTNAME`: CAS server host
    /// - `CAS_LOGIN_URL`, `CAS_LOGOUT_URL`: CAS login and logout pages
    /// - `CAS_CREDENTIAL_KEY`: hex-encoded 32-byte key for credentials at rest
    ///
    /// # Optional env vars
    /// - `CAS_PORT` (default `443`), `CAS_URI` (default empty)
    /// - `CAS_PROXY`: `"1"`/`"true"` to act as CAS proxy towards the backend
    /// - `CAS_IMAP_NAME`: backend service name proxy tickets are issued for
    /// - `CAS_IMAP_PASSWORD`: static backend secret used outside proxy mode
    /// - `CAS_IMAP_CACHING`: `"1"`/`"true"` if the backend caches proxy tickets
    /// - `CAS_VALIDATION`: `none`, `ca` or `pinned`; `CAS_CERT` for the latter two
    /// - `SESSION_COOKIE_NAME`, `APP_ROOT`, `SECURE_COOKIES`
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if required env vars are missing or values are invalid.
    pub fn from_env() -> Result<Self, AuthError> {
        let host = required("CAS_HOSTNAME")?;
        let login_url = url_var("CAS_LOGIN_URL")?;
        let logout_url = url_var("CAS_LOGOUT_URL")?;
        let cipher = CredentialCipher::from_hex_key(&required("CAS_CREDENTIAL_KEY")?)
            .map_err(|e| AuthError::Config(format!("CAS_CREDENTIAL_KEY: {e}")))?;

        let port = match std::env::var("CAS_PORT") {
            Ok(p) => p
                .parse()
                .map_err(|e| AuthError::Config(format!("CAS_PORT: {e}")))?,
            Err(_) => 443,
        };
        let uri = std::env::var("CAS_URI").unwrap_or_default();

        let cert_validation = CertValidation::from_config(
            &std::env::var("CAS_VALIDATION").unwrap_or_default(),
            std::env::var("CAS_CERT").ok().map(PathBuf::from),
        )
        .map_err(|e| AuthError::Config(format!("CAS_VALIDATION: {e}")))?;

        let mut config = Self::new(CasServer::new(host, port, uri), login_url, logout_url, cipher)
            .with_cert_validation(cert_validation)
            .with_proxy_mode(flag("CAS_PROXY"))
            .with_credential_caching(flag("CAS_IMAP_CACHING"));

        if let Ok(name) = std::env::var("CAS_IMAP_NAME") {
            config = config.with_backend_service_name(name);
        }
        if let Ok(secret) = std::env::var("CAS_IMAP_PASSWORD") {
            config = config.with_static_backend_secret(secret);
        }
        if let Ok(name) = std::env::var("SESSION_COOKIE_NAME") {
            config = config.with_session_cookie_name(name);
        }
        if let Ok(root) = std::env::var("APP_ROOT") {
            config = config.with_app_root(root);
        }
        if let Ok(secure) = std::env::var("SECURE_COOKIES") {
            config = config.with_secure_cookies(!matches!(secure.as_str(), "0" | "false"));
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks that the chosen mode has what it needs.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] when proxy mode has no backend service
    /// name, or non-proxy mode has no static backend secret.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.settings.proxy_mode && self.settings.backend_service_name.is_empty() {
            return Err(AuthError::Config(
                "proxy mode requires a backend service name".into(),
            ));
        }
        if !self.settings.proxy_mode && self.settings.static_backend_secret.is_none() {
            return Err(AuthError::Config(
                "a static backend secret is required outside proxy mode".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_cert_validation(mut self, validation: CertValidation) -> Self {
        self.settings.cert_validation = validation;
        self
    }

    #[must_use]
    pub fn with_proxy_mode(mut self, enabled: bool) -> Self {
        self.settings.proxy_mode = enabled;
        self
    }

    #[must_use]
    pub fn with_backend_service_name(mut self, name: impl Into<String>) -> Self {
        self.settings.backend_service_name = name.into();
        self
    }

    #[must_use]
    pub fn with_static_backend_secret(mut self, secret: impl Into<String>) -> Self {
        let secret: String = secret.into();
        self.settings.static_backend_secret = Some(SecretString::from(secret));
        self
    }

    #[must_use]
    pub fn with_credential_caching(mut self, enabled: bool) -> Self {
        self.settings.credential_caching = enabled;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_app_root(mut self, path: impl Into<String>) -> Self {
        self.settings.app_root = path.into();
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }
}

fn required(name: &str) -> Result<String, AuthError> {
    std::env::var(name).map_err(|_| AuthError::Config(format!("{name} is required")))
}

fn url_var(name: &str) -> Result<Url, AuthError> {
    required(name)?
        .parse()
        .map_err(|e| AuthError::Config(format!("{name}: {e}")))
}

fn flag(name: &str) -> bool {
    matches!(std::env::var(name).as_deref(), Ok("1") | Ok("true"))
}
