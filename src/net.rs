//! Network Access Contract
//!
//! The engine never performs network I/O itself. A plugin that wants the
//! network (curl) receives two things through its invocation context: a
//! [`NetPolicy`] that answers "is this URL + method permitted?", and an
//! embedder-supplied [`FetchFn`] that actually carries out the request.
//! With either one missing, network access fails closed.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// An HTTP response as seen by plugins.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub url: String,
}

/// Embedder-supplied transport: (url, method, headers, body) → response.
pub type FetchFn = Arc<
    dyn Fn(
            String,
            String,
            HashMap<String, String>,
            Option<String>,
        ) -> Pin<Box<dyn Future<Output = Result<FetchResponse, String>> + Send>>
        + Send
        + Sync,
>;

/// The evaluator the engine consults before handing a request to the
/// transport.
pub trait NetPolicy: Send + Sync {
    fn allows(&self, url: &str, method: &str) -> bool;
}

/// The default policy: everything is denied.
pub struct DenyAll;

impl NetPolicy for DenyAll {
    fn allows(&self, _url: &str, _method: &str) -> bool {
        false
    }
}

/// Prefix-based allow-list. An entry like `https://api.example.com/v1`
/// permits any URL with that exact origin whose path starts with `/v1`.
/// Methods default to GET and HEAD.
pub struct UrlAllowList {
    prefixes: Vec<String>,
    methods: Vec<String>,
}

impl UrlAllowList {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self {
            prefixes,
            methods: vec!["GET".to_string(), "HEAD".to_string()],
        }
    }

    pub fn with_methods(mut self, methods: Vec<String>) -> Self {
        self.methods = methods.into_iter().map(|m| m.to_uppercase()).collect();
        self
    }
}

impl NetPolicy for UrlAllowList {
    fn allows(&self, url: &str, method: &str) -> bool {
        if !self.methods.iter().any(|m| m == &method.to_uppercase()) {
            return false;
        }
        self.prefixes.iter().any(|p| prefix_matches(url, p))
    }
}

struct UrlParts<'a> {
    origin: String,
    path: &'a str,
}

/// Split an http(s) URL into origin and path, ignoring query/fragment.
fn split_url(url: &str) -> Option<UrlParts<'_>> {
    let scheme_end = url.find("://")?;
    let scheme = &url[..scheme_end];
    if scheme != "http" && scheme != "https" {
        return None;
    }
    let rest = &url[scheme_end + 3..];
    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };
    if authority.is_empty() {
        return None;
    }
    let path = path.split(['?', '#']).next().unwrap_or("/");
    Some(UrlParts {
        origin: format!("{}://{}", scheme, authority),
        path,
    })
}

/// Origin must match exactly; the URL path must extend the entry path.
fn prefix_matches(url: &str, entry: &str) -> bool {
    let (Some(u), Some(e)) = (split_url(url), split_url(entry)) else {
        return false;
    };
    if u.origin != e.origin {
        return false;
    }
    e.path == "/" || u.path.starts_with(e.path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deny_all() {
        assert!(!DenyAll.allows("https://example.com/", "GET"));
    }

    #[test]
    fn test_origin_must_match_exactly() {
        let policy = UrlAllowList::new(vec!["https://api.example.com".to_string()]);
        assert!(policy.allows("https://api.example.com/users", "GET"));
        assert!(!policy.allows("https://api.example.com.evil.com/users", "GET"));
        assert!(!policy.allows("http://api.example.com/users", "GET"));
    }

    #[test]
    fn test_path_prefix() {
        let policy = UrlAllowList::new(vec!["https://host.test/v1".to_string()]);
        assert!(policy.allows("https://host.test/v1/items?q=1", "GET"));
        assert!(!policy.allows("https://host.test/v2/items", "GET"));
    }

    #[test]
    fn test_method_gate() {
        let policy = UrlAllowList::new(vec!["https://host.test".to_string()]);
        assert!(policy.allows("https://host.test/x", "get"));
        assert!(!policy.allows("https://host.test/x", "POST"));
        let policy = policy.with_methods(vec!["POST".to_string()]);
        assert!(policy.allows("https://host.test/x", "POST"));
        assert!(!policy.allows("https://host.test/x", "GET"));
    }

    #[test]
    fn test_non_http_schemes_rejected() {
        let policy = UrlAllowList::new(vec!["https://host.test".to_string()]);
        assert!(!policy.allows("ftp://host.test/file", "GET"));
        assert!(!policy.allows("not a url", "GET"));
    }
}
