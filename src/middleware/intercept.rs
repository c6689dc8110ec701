use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum_extra::extract::CookieJar;

use super::state::CasGateway;
use super::traits::{MailBackend, SessionStore};
use super::types::TemplateRender;
use crate::cas::CasProtocol;
use crate::phase::{Hook, Phase, RequestDescriptor};
use crate::return_url::QueryParams;
use crate::service_url::RequestOrigin;

/// Put the webmail `router` behind the CAS gateway.
pub fn protect<P, S, B>(router: Router, gateway: CasGateway<P, S, B>) -> Router
where
    P: CasProtocol,
    S: SessionStore,
    B: MailBackend,
{
    router.layer(middleware::from_fn_with_state(gateway, intercept::<P, S, B>))
}

/// Request-start and page-render extension points.
///
/// Callback, login and logout requests are answered here and never reach the
/// host. Everything else runs normally; a response rendering the login
/// template is then swapped for the CAS login round-trip.
pub async fn intercept<P, S, B>(
    State(gateway): State<CasGateway<P, S, B>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response
where
    P: CasProtocol,
    S: SessionStore,
    B: MailBackend,
{
    let (parts, body) = request.into_parts();
    let query = QueryParams::parse(parts.uri.query().unwrap_or_default());

    let descriptor = RequestDescriptor::from_query(&query, Hook::RequestStart);
    match gateway.classify(&descriptor) {
        Phase::Callback => return gateway.callback(&parts, &query).await,
        Phase::Login => return gateway.login(&parts, &query, jar).await,
        Phase::Logout => return gateway.logout(&parts, jar).await,
        Phase::BackendReconnect | Phase::Passthrough => {}
    }

    let origin = RequestOrigin::from_parts(&parts);
    let response = next.run(Request::from_parts(parts, body)).await;

    let Some(render) = response.extensions().get::<TemplateRender>().cloned() else {
        return response;
    };
    let descriptor = RequestDescriptor::from_query(
        &query,
        Hook::PageRender {
            template: render.template,
        },
    );
    if gateway.classify(&descriptor) == Phase::Login {
        return gateway.login_redirect(&origin, &query, render.posted_url.as_deref(), jar);
    }
    response
}
