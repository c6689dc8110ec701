use std::future::Future;

use secrecy::SecretString;

use crate::cas::BoxError;
use crate::return_url::QueryParams;
use crate::types::{ApplicationSession, BackendTarget, SessionId, UserId};

/// Host-provided session persistence.
///
/// Sessions are identified by opaque [`SessionId`]s chosen by the host. The
/// gateway only ever touches the session of the request it is handling.
///
/// # Example
///
/// ```rust,ignore
/// impl SessionStore for MySessions {
///     async fn start(&self) -> Result<ApplicationSession, BoxError> {
///         let session = ApplicationSession::temp(SessionId(Ulid::new().to_string()));
///         self.db.insert(&session).await?;
///         Ok(session)
///     }
///     // ...
/// }
/// ```
pub trait SessionStore: Send + Sync + 'static {
    /// Look up a session by ID.
    fn find(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<Option<ApplicationSession>, BoxError>> + Send;

    /// Create a fresh `temp` session with a new ID.
    fn start(&self) -> impl Future<Output = Result<ApplicationSession, BoxError>> + Send;

    /// Persist the session under `session.id`.
    fn save(
        &self,
        session: &ApplicationSession,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Delete a session and everything stored in it.
    fn destroy(&self, session_id: &SessionId)
    -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Move the session to a new ID. Returns the new ID; the old one is invalid afterwards.
    fn regenerate_id(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<SessionId, BoxError>> + Send;
}

/// Host-provided access to the mail backend.
pub trait MailBackend: Send + Sync + 'static {
    /// Backend this deployment logs users into, if one is configured.
    fn resolve_target(&self) -> Option<BackendTarget>;

    /// Log `user` into the backend with the delegated credential.
    ///
    /// `Ok(false)` means the backend rejected the credential.
    fn login(
        &self,
        user: &UserId,
        credential: &SecretString,
        target: &BackendTarget,
    ) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Open a backend connection for an already logged-in session.
    fn connect(
        &self,
        target: &BackendTarget,
        user: &UserId,
        credential: &SecretString,
    ) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// The host's own logout routines, run before the session is destroyed.
    fn logout_actions(
        &self,
        session: &ApplicationSession,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Rewrite the post-login redirect. Defaults to the preserved request.
    fn login_after(&self, redirect: QueryParams) -> QueryParams {
        redirect
    }
}
