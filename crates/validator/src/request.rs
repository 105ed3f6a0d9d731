//! Request handling module that provides access to the parts of an HTTP request a parameter can
//! be read from.
//!
//! This module contains the request-side types the host framework hands to a validated handler:
//! - `RequestContext`: request head, resolved path parameters and the body of one request
//! - `PathParams`: path template variables resolved by the router

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Everything the validation layer reads from one incoming request.
///
/// The parsed query string and the parsed JSON body are computed at most once per request and
/// cached here, so several parameters of the same source never parse twice.
#[derive(Debug)]
pub struct RequestContext<'req> {
    parts: &'req Parts,
    path_params: &'req PathParams,
    body: Bytes,
    query: OnceCell<Vec<(String, String)>>,
    json_body: OnceCell<JsonBody>,
}

/// Outcome of parsing the request body as JSON.
#[derive(Debug, Clone)]
pub(crate) enum JsonBody {
    Empty,
    Parsed(Value),
    Invalid(Arc<serde_json::Error>),
}

impl<'req> RequestContext<'req> {
    pub fn new(parts: &'req Parts, path_params: &'req PathParams, body: Bytes) -> Self {
        Self { parts, path_params, body, query: OnceCell::new(), json_body: OnceCell::new() }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn path_params(&self) -> &PathParams {
        self.path_params
    }

    /// The raw request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Query string entries in the order they appear, repeated keys included.
    pub fn query_pairs(&self) -> &[(String, String)] {
        self.query.get_or_init(|| {
            let Some(query) = self.parts.uri.query() else {
                return vec![];
            };
            serde_urlencoded::from_str::<Vec<(String, String)>>(query).unwrap_or_else(|e| {
                warn!(cause = %e, query, "malformed query string, treating it as empty");
                vec![]
            })
        })
    }

    pub(crate) fn json_body(&self) -> &JsonBody {
        self.json_body.get_or_init(|| {
            if self.body.iter().all(u8::is_ascii_whitespace) {
                return JsonBody::Empty;
            }
            match serde_json::from_slice::<Value>(&self.body) {
                Ok(value) => JsonBody::Parsed(value),
                Err(e) => JsonBody::Invalid(Arc::new(e)),
            }
        })
    }
}

/// Path template variables resolved by the router, e.g. `user_id` for `/users/{user_id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

impl PathParams {
    /// Creates an empty PathParams instance with no parameters
    pub fn empty() -> Self {
        Self { params: vec![] }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Gets the value of a path parameter by its name
    #[inline]
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self { params: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

impl<'k, 'v> From<matchit::Params<'k, 'v>> for PathParams {
    fn from(params: matchit::Params<'k, 'v>) -> Self {
        params.iter().collect()
    }
}
