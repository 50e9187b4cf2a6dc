//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! The router holds handlers of *different* types in one
//! `HashMap<Method, Tree>`, so each one is hidden behind a trait object
//! (`dyn ErasedHandler`). Every call goes through the [`Invoker`]:
//!
//! ```text
//! async fn get_user(req: Request) -> Result<User, Fault> { … }  ← user writes this
//!        ↓ router.get("/users/{id}", get_user)
//! Arc::new(FnHandler(Arc::new(get_user)))                       ← BoxedHandler
//!        ↓ handler.call(req, invoker) at request time
//! invoker.invoke(ctx, || get_user(req))                         ← recovery region
//!        ↓
//! invoker.respond(ctx, outcome)                                 ← 200 JSON or error envelope
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;

use crate::fault::Fault;
use crate::invoke::Invoker;
use crate::request::Request;
use crate::response::Response;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request, invoker: Invoker) -> BoxFuture;
}

#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// Satisfied by any function or closure shaped like
///
/// ```text
/// async fn name(req: Request) -> Result<impl Serialize, Fault>
/// ```
///
/// The `Ok` value is sent as a `200 application/json` body. An `Err`, or a
/// panic anywhere in the handler, is logged and answered with the classified
/// error envelope.
///
/// The trait is sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, T> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, Fault>> + Send + 'static,
    T: Serialize + Send + 'static,
{
}

impl<F, Fut, T> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, Fault>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(Arc::new(self)))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Holds a concrete handler `F` and implements [`ErasedHandler`].
///
/// The inner `Arc` lets the boxed future own the function, so building the
/// handler's future happens inside the recovery region.
struct FnHandler<F>(Arc<F>);

impl<F, Fut, T> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, Fault>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    fn call(&self, req: Request, invoker: Invoker) -> BoxFuture {
        let f = Arc::clone(&self.0);
        let ctx = req.context();
        Box::pin(async move {
            let outcome = invoker.invoke(&ctx, move || (*f)(req)).await;
            invoker.respond(&ctx, outcome)
        })
    }
}

// ── Static handlers ───────────────────────────────────────────────────────────

/// A handler that fails every call with `fault`, whatever the request.
///
/// For endpoints that are disabled or not built yet:
///
/// ```rust
/// use bulwark::{always_fail, Fault, NotImplemented, Router};
/// use http::Method;
///
/// let app = Router::new().on(Method::POST, "/v1/reset", always_fail(Fault::new(NotImplemented)));
/// ```
pub fn always_fail(fault: Fault) -> impl Handler {
    move |_req: Request| {
        let fault = fault.clone();
        async move { Err::<(), _>(fault) }
    }
}
