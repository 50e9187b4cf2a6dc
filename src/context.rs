//! Per-request context handed to the error path.

use http::Method;

/// What the error path knows about the request being served.
///
/// Built once per request by the router from
/// [`Request::context`](crate::Request::context) and dropped with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Context {
    method: Method,
    path: String,
}

impl Context {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into() }
    }

    pub fn method(&self) -> &Method { &self.method }

    /// The request path, as logged under the `path` key.
    pub fn path(&self) -> &str { &self.path }
}
