//! Preserving the originally requested URL across the CAS round-trip.
//!
//! The request path and query are kept client-side in a cookie. Its value is
//! `path?query`, the query serialized as `application/x-www-form-urlencoded`
//! pairs, the whole percent-encoded once more so it is always a valid cookie
//! value.

use std::fmt;

use url::form_urlencoded;

/// Ordered query parameters of a webmail URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Parses a raw query string, with or without the leading `?`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        form_urlencoded::parse(raw.as_bytes()).into_owned().collect()
    }

    /// First value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn contains(&self, key: &str, value: &str) -> bool {
        self.0.iter().any(|(k, v)| k == key && v == value)
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Removes every pair named `key`.
    pub fn remove(&mut self, key: &str) {
        self.0.retain(|(k, _)| k != key);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonical `application/x-www-form-urlencoded` form.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.0)
            .finish()
    }
}

impl FromIterator<(String, String)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Where the user was headed before being sent to CAS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnUrl {
    /// Request path; `None` when only a query was preserved.
    pub path: Option<String>,
    pub query: QueryParams,
}

impl ReturnUrl {
    /// Splits `/path?query` or a bare query string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if !raw.starts_with('/') {
            return Self {
                path: None,
                query: QueryParams::parse(raw),
            };
        }
        let (path, query) = raw.split_once('?').unwrap_or((raw, ""));
        Self {
            path: Some(path.to_owned()),
            query: QueryParams::parse(query),
        }
    }

    fn is_empty(&self) -> bool {
        self.path.is_none() && self.query.is_empty()
    }
}

impl fmt::Display for ReturnUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            f.write_str(path)?;
            if self.query.is_empty() {
                return Ok(());
            }
            f.write_str("?")?;
        }
        f.write_str(&self.query.to_query_string())
    }
}

/// Builds the cookie value preserving the current request.
///
/// A non-empty `posted_url` wins; without a path of its own it is taken
/// relative to `path`. Otherwise the current path and query are kept, unless
/// the request is itself a logout, which would log the user straight back out
/// after the round-trip. An empty string means "nothing preserved" and still
/// overwrites a previously captured value.
#[must_use]
pub fn capture(path: &str, posted_url: Option<&str>, query: &QueryParams) -> String {
    let preserved = match posted_url.filter(|u| !u.is_empty()) {
        Some(url) => {
            let mut preserved = ReturnUrl::parse(url);
            preserved.path.get_or_insert_with(|| path.to_owned());
            preserved
        }
        None if query.contains("_task", "logout") => return String::new(),
        None => ReturnUrl {
            path: Some(path.to_owned()),
            query: query.clone(),
        },
    };
    urlencoding::encode(&preserved.to_string()).into_owned()
}

/// Recovers the preserved URL from a cookie value.
///
/// Returns `None` for an empty or undecodable value; callers fall back to the
/// application root.
#[must_use]
pub fn restore(cookie_value: &str) -> Option<ReturnUrl> {
    let decoded = urlencoding::decode(cookie_value).ok()?;
    let preserved = ReturnUrl::parse(&decoded);
    (!preserved.is_empty()).then_some(preserved)
}

/// Whether `path` is a local path under `app_root`, safe to redirect to.
///
/// Rejects scheme-relative and backslash paths, dot segments and anything
/// that is not plain visible ASCII.
#[must_use]
pub fn is_within(path: &str, app_root: &str) -> bool {
    if !path.starts_with('/') || path.starts_with("//") {
        return false;
    }
    if !path
        .chars()
        .all(|c| c.is_ascii_graphic() && !matches!(c, '\\' | '#'))
    {
        return false;
    }
    let dot_segment = path.split('/').any(|segment| {
        urlencoding::decode(segment)
            .map(|s| s == "." || s == "..")
            .unwrap_or(true)
    });
    if dot_segment {
        return false;
    }
    let root = app_root.trim_end_matches('/');
    path == root || path.starts_with(&format!("{root}/"))
}
