//! The recovery boundary around one handler invocation.
//!
//! # Three ways out, one way back
//!
//! A handler body can finish in exactly one of three ways:
//!
//! ```text
//! body() ─┬─ Ok(value)  → Returned(value) ──────────────→ Outcome::Success
//!         ├─ Err(fault) → Failed(fault)     ─────────────┐
//!         └─ panic!(…)  → Panicked(payload) ─ recover ───┤
//!                                                        ↓
//!                         ErrorResponder::log_error → Outcome::Failure
//! ```
//!
//! A recovered panic is turned into a [`Fault`] before the responder sees
//! it, so a panic and a returned error travel the same road: one log record,
//! one classification, one response. Nothing unwinds past [`Invoker`].
//!
//! The boundary assumes the classifier, logger and stack formatter do not
//! panic. They run outside the recovery region.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use http::StatusCode;
use serde::Serialize;

use crate::classify::Classified;
use crate::context::Context;
use crate::fault::Fault;
use crate::responder::ErrorResponder;
use crate::response::Response;

/// What an invocation produced: the handler's value or a classified failure.
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    Failure(Classified),
}

/// How the body finished, before classification.
enum Settled<T> {
    Returned(T),
    Failed(Fault),
    Panicked(Box<dyn Any + Send>),
}

impl<T> From<Result<T, Fault>> for Settled<T> {
    fn from(result: Result<T, Fault>) -> Self {
        match result {
            Ok(value) => Self::Returned(value),
            Err(fault) => Self::Failed(fault),
        }
    }
}

/// Runs handler bodies under `catch_unwind` and routes every failure
/// through an [`ErrorResponder`].
///
/// # Panic payloads
///
/// A panic classifies the same as returning its payload when the payload is
/// a [`Fault`], a `Box<dyn Error + Send + Sync>`, a `std::io::Error`, or an
/// error type registered with the classifier (see
/// [`ErrorTable::register`](crate::ErrorTable::register)).
///
/// Any other payload becomes a 500 logged as `panic with <type>`, and its
/// value is dropped. The type is named only for strings and primitives;
/// anything else is reported as `panic with unknown type`. Panic with a
/// `Fault` (via [`std::panic::panic_any`]) to keep a message.
///
/// Cheap to clone; clones share the responder.
#[derive(Clone)]
pub struct Invoker {
    responder: Arc<ErrorResponder>,
}

impl Invoker {
    pub fn new(responder: impl Into<Arc<ErrorResponder>>) -> Self {
        Self { responder: responder.into() }
    }

    pub fn responder(&self) -> &ErrorResponder {
        &self.responder
    }

    /// Calls `body` once, synchronously.
    ///
    /// `Ok` values come back untouched and nothing is logged. Errors and
    /// panics are logged once and come back classified.
    pub fn invoke_blocking<T>(
        &self,
        ctx: &Context,
        body: impl FnOnce() -> Result<T, Fault>,
    ) -> Outcome<T> {
        let settled = match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(result) => Settled::from(result),
            Err(payload) => Settled::Panicked(payload),
        };
        self.settle(ctx, settled)
    }

    /// Calls `body` once and drives the future it returns.
    ///
    /// Both the call that builds the future and every poll of it are inside
    /// the recovery region, so a handler that panics before its first
    /// `.await` is caught too.
    pub async fn invoke<F, Fut, T>(&self, ctx: &Context, body: F) -> Outcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Fault>>,
    {
        let settled = match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(fut) => match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(result) => Settled::from(result),
                Err(payload) => Settled::Panicked(payload),
            },
            Err(payload) => Settled::Panicked(payload),
        };
        self.settle(ctx, settled)
    }

    fn settle<T>(&self, ctx: &Context, settled: Settled<T>) -> Outcome<T> {
        let fault = match settled {
            Settled::Returned(value) => return Outcome::Success(value),
            Settled::Failed(fault) => fault,
            Settled::Panicked(payload) => self.responder.recover_panic(payload),
        };
        Outcome::Failure(self.responder.log_error(ctx, &fault))
    }

    /// Serializes an outcome into the response sent to the client.
    ///
    /// A success value that fails to serialize goes through the error write
    /// path like any other server fault.
    pub fn respond<T: Serialize>(&self, ctx: &Context, outcome: Outcome<T>) -> Response {
        match outcome {
            Outcome::Success(value) => match serde_json::to_vec(&value) {
                Ok(bytes) => Response::json(StatusCode::OK, bytes),
                Err(e) => self.responder.write_error(ctx, &Fault::new(e)),
            },
            Outcome::Failure(classified) => Response::from_classified(&classified),
        }
    }
}
