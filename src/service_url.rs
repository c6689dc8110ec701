//! Absolute URLs of this gateway, as registered with the CAS server.
//!
//! The CAS server stores the service and callback URLs and calls back to
//! exactly those strings, so the same request origin and parameters must
//! always produce the same URL.

use std::borrow::Cow;

use axum::http::header::HOST;
use axum::http::request::Parts;
use url::form_urlencoded;

/// Scheme, host, port and path of the physical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub secure: bool,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl RequestOrigin {
    /// Reads the origin from the request URI and `Host` header.
    ///
    /// `X-Forwarded-Proto: https` marks the request as secured when TLS is
    /// terminated in front of the application.
    #[must_use]
    pub fn from_parts(parts: &Parts) -> Self {
        let secure = parts.uri.scheme_str() == Some("https")
            || parts
                .headers
                .get("x-forwarded-proto")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|proto| proto.eq_ignore_ascii_case("https"));

        let authority = parts
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(ToString::to_string))
            .unwrap_or_default();
        let (host, port) = split_authority(&authority);

        Self {
            secure,
            host,
            port: port.unwrap_or(default_port(secure)),
            path: parts.uri.path().to_string(),
        }
    }

    /// Builds the absolute URL reaching this gateway with `params`.
    ///
    /// Keys get a leading `_` unless they already have one, pairs with an
    /// empty value are skipped, and the default port of the scheme is left out.
    #[must_use]
    pub fn service_url(&self, params: &[(&str, &str)]) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        let port = if self.port == default_port(self.secure) {
            String::new()
        } else {
            format!(":{}", self.port)
        };

        let mut query = form_urlencoded::Serializer::new(String::new());
        for (key, value) in params.iter().filter(|(_, v)| !v.is_empty()) {
            let key: Cow<'_, str> = if key.starts_with('_') {
                Cow::Borrowed(*key)
            } else {
                Cow::Owned(format!("_{key}"))
            };
            query.append_pair(&key, value);
        }
        let query = query.finish();
        let separator = if query.is_empty() { "" } else { "?" };

        format!(
            "{scheme}://{}{port}{}{separator}{query}",
            self.host, self.path
        )
    }
}

fn default_port(secure: bool) -> u16 {
    if secure { 443 } else { 80 }
}

fn split_authority(authority: &str) -> (String, Option<u16>) {
    if let Some(rest) = authority.strip_prefix('[') {
        if let Some((addr, tail)) = rest.split_once(']') {
            let port = tail.strip_prefix(':').and_then(|p| p.parse().ok());
            return (format!("[{addr}]"), port);
        }
    }
    match authority.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host.to_string(), Some(port)),
            Err(_) => (authority.to_string(), None),
        },
        None => (authority.to_string(), None),
    }
}
