//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. Every registered handler
//! runs behind the router's [`Invoker`], and a request that matches nothing
//! is answered through the same error path as a failing handler.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::error::RouteNotFound;
use crate::fault::Fault;
use crate::handler::{BoxedHandler, Handler, always_fail};
use crate::invoke::Invoker;
use crate::request::Request;
use crate::responder::ErrorResponder;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Registration methods return `self` so they chain.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    invoker: Invoker,
}

impl Router {
    /// A router whose failures are classified by
    /// [`ErrorTable::standard`](crate::ErrorTable::standard) and logged
    /// through `tracing`.
    pub fn new() -> Self {
        Self::with_responder(ErrorResponder::default())
    }

    pub fn with_responder(responder: ErrorResponder) -> Self {
        Self { routes: HashMap::new(), invoker: Invoker::new(responder) }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.add(method, path, handler)
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.add(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.add(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.add(Method::PUT, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.add(Method::DELETE, path, handler)
    }

    /// Register a route that always fails with `fault`.
    pub fn disable(self, method: Method, path: &str, fault: Fault) -> Self {
        self.add(method, path, always_fail(fault))
    }

    fn add(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// Routes one request and produces one response.
    ///
    /// Unmatched requests become a [`RouteNotFound`] fault.
    pub async fn handle(&self, req: Request) -> Response {
        match self.lookup(req.method(), req.path()) {
            Some((handler, params)) => {
                handler.call(req.with_params(params), self.invoker.clone()).await
            }
            None => {
                let fault = Fault::new(RouteNotFound {
                    method: req.method().clone(),
                    path: req.path().to_owned(),
                });
                self.invoker.responder().write_error(&req.context(), &fault)
            }
        }
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
