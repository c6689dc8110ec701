use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use secrecy::{ExposeSecret, SecretString};

use super::cookies;
use super::error::AuthError;
use super::state::CasGateway;
use super::traits::{MailBackend, SessionStore};
use crate::cas::{Authentication, CasClient, CasProtocol, CasRequest};
use crate::credential::{CachePolicy, CredentialCache};
use crate::phase::{Hook, LOGIN_ACTION, Phase, RequestDescriptor};
use crate::return_url::{self, QueryParams};
use crate::service_url::RequestOrigin;
use crate::types::{ApplicationSession, SessionId, UserId};

const FAILURE_PAGE: &str = r#"<div>
<h3 class="error-title">MAIL LOGIN FAILED</h3>
<p class="error-text">Could not log into your mail service. The service may be interrupted, or you may not be authorized to access it.<br />
Please contact the administrator of your mail service.<br />
Or log out with the button below, then try again with a different user name.<br /></p>
<form name="form" action="./" method="get">
<input type="hidden" name="_task" value="logout" />
<p style="text-align:center;"><input type="submit" class="button mainaction" value="Logout" /></p>
</form>
</div>
"#;

impl<P: CasProtocol, S: SessionStore, B: MailBackend> CasGateway<P, S, B> {
    // ── Callback ───────────────────────────────────────────────────

    /// Lets the CAS client pick up a PGT delivery. Never touches the
    /// application session.
    pub(super) async fn callback(&self, parts: &Parts, query: &QueryParams) -> Response {
        let origin = RequestOrigin::from_parts(parts);
        let mut client = self.protocol.init_client(self.client_setup(&origin, true));
        let request = CasRequest {
            query,
            headers: &parts.headers,
        };

        match client.force_authenticate(&request).await {
            Ok(_) => tracing::debug!("PGT callback processed"),
            Err(e) => tracing::warn!(error = %e, "PGT callback failed"),
        }

        StatusCode::OK.into_response()
    }

    // ── Login ──────────────────────────────────────────────────────

    pub(super) async fn login(
        &self,
        parts: &Parts,
        query: &QueryParams,
        jar: CookieJar,
    ) -> Response {
        if let Some(previous) = self.session_id(&jar) {
            if let Err(e) = self.sessions.destroy(&previous).await {
                tracing::warn!(error = %e, "Session deletion failed before login");
            }
        }

        let session = match self.sessions.start().await {
            Ok(session) => session,
            Err(e) => return AuthError::Store(e.to_string()).into_response(),
        };
        let jar = jar.add(cookies::session_cookie(
            &self.settings.session_cookie_name,
            &session.id,
            &self.settings.app_root,
            self.settings.secure_cookies,
        ));

        let origin = RequestOrigin::from_parts(parts);
        let mut client = self
            .protocol
            .init_client(self.client_setup(&origin, self.settings.proxy_mode));
        let request = CasRequest {
            query,
            headers: &parts.headers,
        };

        let user = match client.force_authenticate(&request).await {
            Ok(Authentication::Authenticated(user)) => user,
            Ok(Authentication::Redirect(location)) => {
                return (jar, Redirect::to(&location)).into_response();
            }
            Err(e) => {
                tracing::error!(error = %e, "CAS authentication failed");
                return self.failure(jar, &session.id).await;
            }
        };

        let credential = match self.delegated_credential(&mut client).await {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(
                    user = %user,
                    error = %e,
                    "No delegated credential for backend login"
                );
                return self.failure(jar, &session.id).await;
            }
        };

        let preserved = cookies::return_url(&jar).unwrap_or_default();
        let session_id = session.id.clone();

        match self.bridge(session, user, credential).await {
            Ok(session) => {
                let mut query = self.backend.login_after(preserved.query);
                query.remove("abort");
                let location = self.app_location(preserved.path.as_deref(), &query);

                let jar = jar
                    .add(cookies::session_cookie(
                        &self.settings.session_cookie_name,
                        &session.id,
                        &self.settings.app_root,
                        self.settings.secure_cookies,
                    ))
                    .remove(cookies::clear_return_url_cookie(&self.settings.app_root));

                tracing::info!(session_id = %session.id, "CAS login successful");
                (jar, Redirect::to(&location)).into_response()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Backend login failed");
                self.failure(jar, &session_id).await
            }
        }
    }

    /// Proxy ticket in proxy mode, the static backend secret otherwise.
    async fn delegated_credential(
        &self,
        client: &mut P::Client,
    ) -> Result<SecretString, AuthError> {
        if self.settings.proxy_mode {
            return client
                .proxy_ticket(&self.settings.backend_service_name)
                .await
                .map_err(|e| {
                    tracing::warn!(code = e.code, "Proxy ticket exchange failed");
                    tracing::debug!(output = %e.output, "Proxy ticket exchange output");
                    AuthError::Protocol(e.to_string())
                });
        }

        self.settings
            .static_backend_secret
            .as_ref()
            .map(|secret| SecretString::from(secret.expose_secret().to_owned()))
            .ok_or_else(|| AuthError::Config("no static backend secret configured".into()))
    }

    /// Logs the CAS user into the backend and promotes the temp session.
    async fn bridge(
        &self,
        mut session: ApplicationSession,
        user: UserId,
        credential: SecretString,
    ) -> Result<ApplicationSession, AuthError> {
        let target = self
            .backend
            .resolve_target()
            .filter(|t| !t.host.is_empty())
            .ok_or_else(|| AuthError::Backend("no backend host".into()))?;

        if !session.temp {
            return Err(AuthError::Store("session was not started for login".into()));
        }
        if user.is_empty() || credential.expose_secret().is_empty() {
            return Err(AuthError::Protocol("empty user or credential".into()));
        }

        let accepted = self
            .backend
            .login(&user, &credential, &target)
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        if !accepted {
            return Err(AuthError::Backend(format!(
                "{} rejected credentials for {user}",
                target.host
            )));
        }

        session.temp = false;
        session.user = Some(user);
        session.backend = Some(target);
        self.credential_cache().store(&mut session, &credential)?;
        self.sessions
            .save(&session)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        session.id = self
            .sessions
            .regenerate_id(&session.id)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        Ok(session)
    }

    fn credential_cache(&self) -> CredentialCache<'_> {
        CredentialCache::new(
            &self.cipher,
            CachePolicy::from_caching(self.settings.credential_caching),
        )
    }

    /// Post-login target. A preserved path outside the application root falls
    /// back to the root.
    fn app_location(&self, path: Option<&str>, query: &QueryParams) -> String {
        let root = self.settings.app_root.as_str();
        let path = match path {
            Some(path) if return_url::is_within(path, root) => path,
            Some(path) => {
                tracing::warn!(path, "Ignoring preserved path outside the application");
                root
            }
            None => root,
        };
        if query.is_empty() {
            path.to_owned()
        } else {
            format!("{path}?{}", query.to_query_string())
        }
    }

    /// Answers a render of the login template: remember what the user asked
    /// for, then send them through the login phase.
    pub(super) fn login_redirect(
        &self,
        origin: &RequestOrigin,
        query: &QueryParams,
        posted_url: Option<&str>,
        jar: CookieJar,
    ) -> Response {
        let value = return_url::capture(&origin.path, posted_url, query);
        let jar = jar.add(cookies::return_url_cookie(
            value,
            &self.settings.app_root,
            self.settings.secure_cookies,
        ));
        let location = origin.service_url(&[("action", LOGIN_ACTION)]);
        (jar, Redirect::to(&location)).into_response()
    }

    // ── Logout ─────────────────────────────────────────────────────

    pub(super) async fn logout(&self, parts: &Parts, jar: CookieJar) -> Response {
        let mut jar = jar;
        if let Some(session_id) = self.session_id(&jar) {
            jar = jar.remove(cookies::clear_session_cookie(
                &self.settings.session_cookie_name,
                &self.settings.app_root,
            ));
            match self.sessions.find(&session_id).await {
                Ok(Some(session)) if session.is_authenticated() => {
                    if let Err(e) = self.backend.logout_actions(&session).await {
                        tracing::warn!(error = %e, "Backend logout routines failed");
                    }
                    if let Err(e) = self.sessions.destroy(&session_id).await {
                        tracing::warn!(error = %e, "Session deletion failed during logout");
                    }
                    tracing::info!(session_id = %session_id, "Logged out");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Session lookup failed during logout"),
            }
        }

        let origin = RequestOrigin::from_parts(parts);
        let mut client = self
            .protocol
            .init_client(self.client_setup(&origin, self.settings.proxy_mode));
        let location = client.server_logout();
        (jar, Redirect::to(&location)).into_response()
    }

    // ── Backend reconnect ──────────────────────────────────────────

    /// Backend-connect extension point.
    ///
    /// Call whenever the host needs a backend connection for the current
    /// request. Returns `connected` unchanged unless the gateway handles the
    /// attempt: in proxy mode a missing connection is retried with the cached
    /// credential, then with a freshly minted proxy ticket that replaces it.
    /// Never redirects. CAS trouble during the refresh is logged and reported
    /// as `Ok(false)`, a plain connection failure for the host.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the session store or the backend fails.
    pub async fn backend_connect(
        &self,
        parts: &Parts,
        connected: bool,
    ) -> Result<bool, AuthError> {
        let query = QueryParams::parse(parts.uri.query().unwrap_or_default());
        let descriptor =
            RequestDescriptor::from_query(&query, Hook::BackendConnect { connected });
        if self.classify(&descriptor) != Phase::BackendReconnect {
            return Ok(connected);
        }

        let jar = CookieJar::from_headers(&parts.headers);
        let Some(session_id) = self.session_id(&jar) else {
            return Ok(false);
        };
        let Some(mut session) = self
            .sessions
            .find(&session_id)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?
        else {
            return Ok(false);
        };
        let (Some(user), Some(target)) = (session.user.clone(), session.backend.clone()) else {
            return Ok(false);
        };
        if !session.is_authenticated() {
            return Ok(false);
        }

        let cache = self.credential_cache();
        if let Some(cached) = cache.cached(&session) {
            let accepted = self
                .backend
                .connect(&target, &user, &cached)
                .await
                .map_err(|e| AuthError::Backend(e.to_string()))?;
            if accepted {
                return Ok(true);
            }
            tracing::debug!(session_id = %session_id, "Cached proxy ticket rejected");
        }

        let origin = RequestOrigin::from_parts(parts);
        let mut client = self.protocol.init_client(self.client_setup(&origin, true));
        let request = CasRequest {
            query: &query,
            headers: &parts.headers,
        };
        match client.force_authenticate(&request).await {
            Ok(Authentication::Authenticated(_)) => {}
            Ok(Authentication::Redirect(_)) => {
                tracing::warn!(
                    session_id = %session_id,
                    "CAS session gone, cannot refresh proxy ticket"
                );
                return Ok(false);
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    error = %e,
                    "CAS authentication failed on reconnect"
                );
                return Ok(false);
            }
        }

        let ticket = match client
            .proxy_ticket(&self.settings.backend_service_name)
            .await
        {
            Ok(ticket) => ticket,
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    code = e.code,
                    "Proxy ticket refresh failed"
                );
                tracing::debug!(output = %e.output, "Proxy ticket exchange output");
                return Ok(false);
            }
        };

        cache.store(&mut session, &ticket)?;
        self.sessions
            .save(&session)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        self.backend
            .connect(&target, &user, &ticket)
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))
    }

    // ── Failure ────────────────────────────────────────────────────

    /// Terminal backend login failure: static page, session destroyed, never retried.
    async fn failure(&self, jar: CookieJar, session_id: &SessionId) -> Response {
        if let Err(e) = self.sessions.destroy(session_id).await {
            tracing::warn!(error = %e, "Session deletion failed after login failure");
        }
        let jar = jar.remove(cookies::clear_session_cookie(
            &self.settings.session_cookie_name,
            &self.settings.app_root,
        ));
        (StatusCode::OK, jar, Html(FAILURE_PAGE)).into_response()
    }
}
