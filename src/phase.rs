//! Request classification into CAS protocol phases.

use crate::return_url::QueryParams;

/// Action the CAS server calls back on to deliver a proxy-granting ticket.
pub const CALLBACK_ACTION: &str = "pgtcallback";
pub const LOGIN_ACTION: &str = "login";
pub const LOGOUT_TASK: &str = "logout";
/// Template the host renders for unauthenticated users.
pub const LOGIN_TEMPLATE: &str = "login";

/// What the gateway does with one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Out-of-band PGT delivery from the CAS server.
    Callback,
    Login,
    Logout,
    /// Fetch a fresh proxy ticket for a session without backend connection.
    BackendReconnect,
    /// Leave the request to the host.
    Passthrough,
}

/// Host extension point that produced the request descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hook {
    RequestStart,
    PageRender { template: String },
    BackendConnect { connected: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub action: Option<String>,
    pub task: Option<String>,
    pub hook: Hook,
}

impl RequestDescriptor {
    /// Reads `_action` and `_task` from the request query.
    #[must_use]
    pub fn from_query(query: &QueryParams, hook: Hook) -> Self {
        Self {
            action: query.get("_action").map(str::to_string),
            task: query.get("_task").map(str::to_string),
            hook,
        }
    }
}

/// Classifies a request. Rules are checked in order and the first match wins.
#[must_use]
pub fn classify(request: &RequestDescriptor, proxy_mode: bool) -> Phase {
    match &request.hook {
        Hook::RequestStart => match (request.action.as_deref(), request.task.as_deref()) {
            (Some(CALLBACK_ACTION), _) => Phase::Callback,
            (Some(LOGIN_ACTION), _) => Phase::Login,
            (_, Some(LOGOUT_TASK)) => Phase::Logout,
            _ => Phase::Passthrough,
        },
        Hook::PageRender { template } if template == LOGIN_TEMPLATE => Phase::Login,
        Hook::BackendConnect { connected: false } if proxy_mode => Phase::BackendReconnect,
        _ => Phase::Passthrough,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(query: &str) -> RequestDescriptor {
        RequestDescriptor::from_query(&QueryParams::parse(query), Hook::RequestStart)
    }

    #[test]
    fn callback_action() {
        assert_eq!(classify(&start("_action=pgtcallback"), false), Phase::Callback);
    }

    #[test]
    fn callback_wins_over_logout_task() {
        assert_eq!(
            classify(&start("_task=logout&_action=pgtcallback"), true),
            Phase::Callback
        );
    }

    #[test]
    fn login_action() {
        assert_eq!(classify(&start("_action=login"), false), Phase::Login);
    }

    #[test]
    fn login_wins_over_logout_task() {
        assert_eq!(classify(&start("_task=logout&_action=login"), false), Phase::Login);
    }

    #[test]
    fn logout_task() {
        assert_eq!(classify(&start("_task=logout"), false), Phase::Logout);
    }

    #[test]
    fn ordinary_request_passes_through() {
        assert_eq!(classify(&start("_task=mail&_mbox=INBOX"), true), Phase::Passthrough);
        assert_eq!(classify(&start(""), true), Phase::Passthrough);
    }

    #[test]
    fn unprefixed_parameters_are_ignored() {
        assert_eq!(classify(&start("action=login"), false), Phase::Passthrough);
    }

    #[test]
    fn login_template_render_becomes_login() {
        let request = RequestDescriptor::from_query(
            &QueryParams::parse("_task=mail"),
            Hook::PageRender {
                template: LOGIN_TEMPLATE.into(),
            },
        );
        assert_eq!(classify(&request, false), Phase::Login);
    }

    #[test]
    fn other_template_render_passes_through() {
        let request = RequestDescriptor::from_query(
            &QueryParams::default(),
            Hook::PageRender {
                template: "mail".into(),
            },
        );
        assert_eq!(classify(&request, true), Phase::Passthrough);
    }

    #[test]
    fn disconnected_backend_in_proxy_mode_reconnects() {
        let request = RequestDescriptor::from_query(
            &QueryParams::default(),
            Hook::BackendConnect { connected: false },
        );
        assert_eq!(classify(&request, true), Phase::BackendReconnect);
    }

    #[test]
    fn disconnected_backend_without_proxy_passes_through() {
        let request = RequestDescriptor::from_query(
            &QueryParams::default(),
            Hook::BackendConnect { connected: false },
        );
        assert_eq!(classify(&request, false), Phase::Passthrough);
    }

    #[test]
    fn connected_backend_passes_through() {
        let request = RequestDescriptor::from_query(
            &QueryParams::default(),
            Hook::BackendConnect { connected: true },
        );
        assert_eq!(classify(&request, true), Phase::Passthrough);
    }

    #[test]
    fn login_action_only_applies_at_request_start() {
        let request = RequestDescriptor::from_query(
            &QueryParams::parse("_action=login"),
            Hook::BackendConnect { connected: false },
        );
        assert_eq!(classify(&request, true), Phase::BackendReconnect);
    }
}
