//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, Method};
use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::error::{BadRequestHeader, InvalidBody};
use crate::fault::Fault;

/// An incoming HTTP request with its body fully read.
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
}

impl Request {
    /// Wraps an `http::Request` whose body has already been collected.
    pub fn from_http(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            headers: parts.headers,
            body,
            params: HashMap::new(),
        }
    }

    pub(crate) fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Header lookup (case-insensitive). `None` when absent or not UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Like [`header`](Self::header), but a missing or non-UTF-8 header is a
    /// [`BadRequestHeader`] fault (400 / `CH001` in the standard table).
    pub fn require_header(&self, name: &str) -> Result<&str, Fault> {
        self.header(name).ok_or_else(|| Fault::new(BadRequestHeader))
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Decodes the body as JSON.
    ///
    /// On failure the fault is an [`InvalidBody`] carrying the decoder's
    /// message as detail, which the standard table answers with a 400.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Fault> {
        serde_json::from_slice(&self.body).map_err(|e| {
            let detail = e.to_string();
            Fault::new(InvalidBody(e)).with_detail(detail)
        })
    }

    /// The context the error path logs against.
    pub fn context(&self) -> Context {
        Context::new(self.method.clone(), self.path.clone())
    }
}
