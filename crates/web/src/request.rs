//! Per-request state shared by every middleware entry.
//!
//! This module contains the core types for working with a request during dispatch:
//! - `RequestContext`: the request head and body plus the mutable state middleware accumulates
//! - `Params`: string maps for path and query parameters
//! - `Extensions`: a type-keyed side channel for middleware-to-middleware data

use std::collections::HashMap;
use std::collections::hash_map;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, Uri, Version};
use switchyard_http::connection::CompleteRequest;
use switchyard_http::protocol::RequestHeader;

/// Represents the context of an HTTP request during dispatch.
///
/// The head (method, URI, version, headers) and the body are fixed when the context is created.
/// Path parameters, query parameters and extensions grow as the request moves through the
/// middleware chain; entries are only ever inserted or overwritten, never removed.
///
/// Cloning is cheap for the head and body, which are shared.
#[derive(Debug, Clone)]
pub struct RequestContext {
    header: Arc<RequestHeader>,
    body: Option<Bytes>,
    trailers: Option<HeaderMap>,
    path_params: Params,
    query_params: Params,
    extensions: Extensions,
}

impl RequestContext {
    /// Creates a context for a request with no body
    pub fn new(header: RequestHeader) -> Self {
        Self::with_body(header, None)
    }

    /// Creates a context for a request carrying `body`
    pub fn with_body(header: RequestHeader, body: Option<Bytes>) -> Self {
        Self {
            header: Arc::new(header),
            body,
            trailers: None,
            path_params: Params::new(),
            query_params: Params::new(),
            extensions: Extensions::new(),
        }
    }

    /// Returns a reference to the underlying RequestHeader
    pub fn request_header(&self) -> &RequestHeader {
        &self.header
    }

    /// Returns the HTTP method of the request
    pub fn method(&self) -> &Method {
        self.header.method()
    }

    /// Returns the URI of the request
    pub fn uri(&self) -> &Uri {
        self.header.uri()
    }

    /// Returns the path of the request URI
    pub fn path(&self) -> &str {
        self.header.path()
    }

    /// Returns the HTTP version of the request
    pub fn version(&self) -> Version {
        self.header.version()
    }

    /// Returns the HTTP headers of the request
    pub fn headers(&self) -> &HeaderMap {
        self.header.headers()
    }

    /// Returns the first value of the header `name`
    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&HeaderValue> {
        self.header.headers().get(name)
    }

    /// Returns the raw body, present only if the transport delivered one
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Returns the trailing headers sent after the body, if any
    pub fn trailers(&self) -> Option<&HeaderMap> {
        self.trailers.as_ref()
    }

    /// Returns true if the request method has body semantics
    pub fn need_body(&self) -> bool {
        self.header.need_body()
    }

    /// Returns the path parameters bound by the matched route
    pub fn path_params(&self) -> &Params {
        &self.path_params
    }

    pub fn path_params_mut(&mut self) -> &mut Params {
        &mut self.path_params
    }

    /// Gets a path parameter by name
    pub fn path_param(&self, name: impl AsRef<str>) -> Option<&str> {
        self.path_params.get(name)
    }

    /// Returns the query parameters parsed so far
    pub fn query_params(&self) -> &Params {
        &self.query_params
    }

    pub fn query_params_mut(&mut self) -> &mut Params {
        &mut self.query_params
    }

    /// Gets a query parameter by name, with repeated keys already joined by `,`
    pub fn query(&self, name: impl AsRef<str>) -> Option<&str> {
        self.query_params.get(name)
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

impl From<CompleteRequest> for RequestContext {
    fn from(request: CompleteRequest) -> Self {
        let (header, body, trailers) = request.into_parts();
        let mut context = Self::with_body(header, body);
        context.trailers = trailers;
        context
    }
}

/// A string map of request parameters.
///
/// Keys are unique. Inserting an existing key overwrites its value; there is no way to remove one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    inner: HashMap<String, String>,
}

impl Params {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites `key`, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.inner.insert(key.into(), value.into())
    }

    /// Gets the value of a parameter by its name
    #[inline]
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        self.inner.get(key.as_ref()).map(String::as_str)
    }

    #[inline]
    pub fn contains(&self, key: impl AsRef<str>) -> bool {
        self.inner.contains_key(key.as_ref())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates over all parameters in arbitrary order
    pub fn iter(&self) -> ParamsIter<'_> {
        ParamsIter { inner: self.inner.iter() }
    }

    /// Copies every parameter of `other` into `self`, overwriting on conflict
    pub fn extend_from(&mut self, other: &Params) {
        for (key, value) in other {
            self.insert(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a str, &'a str);
    type IntoIter = ParamsIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the entries of [`Params`]
#[derive(Debug)]
pub struct ParamsIter<'a> {
    inner: hash_map::Iter<'a, String, String>,
}

impl<'a> Iterator for ParamsIter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// A side channel keyed by type.
///
/// Middleware attaches values here for later entries or handlers to pick up. Each type holds at
/// most one value; inserting again overwrites it. Values cannot be removed.
#[derive(Debug, Clone, Default)]
pub struct Extensions {
    inner: http::Extensions,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the previous value of the same type
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.inner.insert(value)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.inner.get::<T>()
    }

    pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.inner.get_mut::<T>()
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.inner.get::<T>().is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
