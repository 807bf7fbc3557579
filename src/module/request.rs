//! The parsed request handed to modules.

use std::borrow::Cow;
use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use hyper::header::HeaderMap;
use hyper::Method;

/// A decoded request as seen by a module.
///
/// `path` is the request path with the module identifier stripped; it
/// always starts with `/`. Query parameters are URL-decoded UTF-8 with
/// last-wins semantics on duplicate keys. The body charset is fixed to
/// UTF-8; use [`text`] for a lossy string view.
///
/// [`text`]: ModuleRequest::text
#[derive(Debug, Clone)]
pub struct ModuleRequest {
    pub method: Method,
    pub path: String,
    pub params: HashMap<String, String>,
    pub body: Bytes,
    pub headers: HeaderMap,
    pub remote_addr: SocketAddr,
}

impl ModuleRequest {
    /// The request body as UTF-8 text, with invalid sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// A single query parameter, if present.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Parse a query string into a parameter map.
///
/// Keys and values are percent-decoded as UTF-8 (`+` decodes to space).
/// On duplicate keys the last value wins.
pub(crate) fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}
