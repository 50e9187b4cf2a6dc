//! # bulwark
//!
//! A panic-safe shim between an HTTP dispatcher and JSON request handlers.
//!
//! ## The contract
//!
//! A handler returns `Result<impl Serialize, Fault>`. Whatever happens in it
//! (success, a returned error, a panic), the client gets a well-formed JSON
//! body and a status code, and the service gets exactly one log line per
//! failure:
//!
//! - **Success**: `200` with the serialized value. Nothing is logged.
//! - **Returned error**: classified by a [`Classifier`] into a body, a status
//!   and a chain code (a stable machine-readable error code).
//! - **Panic**: recovered by the [`Invoker`], turned into a [`Fault`] and
//!   classified exactly like a returned error.
//!
//! Every failure is logged with `status`, `chaincode`, `path` and `error`.
//! Only 500s carry a `stack`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use bulwark::{Fault, NotImplemented, Request, Router, Server};
//! use http::Method;
//! use serde_json::{Value, json};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bulwark::Error> {
//!     let app = Router::new()
//!         .get("/accounts/{id}", get_account)
//!         .disable(Method::POST, "/reset", Fault::new(NotImplemented));
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! async fn get_account(req: Request) -> Result<Value, Fault> {
//!     req.require_header("x-chain-version")?;
//!     Ok(json!({ "id": req.param("id") }))
//! }
//! ```

mod classify;
mod context;
mod error;
mod fault;
mod handler;
mod invoke;
mod request;
mod responder;
mod response;
mod router;
mod server;

pub mod log;

pub use classify::{Classified, Classifier, ErrorInfo, ErrorTable};
pub use context::Context;
pub use error::{BadRequestHeader, Error, InvalidBody, NotImplemented, Panicked, RouteNotFound};
pub use fault::Fault;
pub use handler::{Handler, always_fail};
pub use invoke::{Invoker, Outcome};
pub use log::{BacktraceFormatter, LogRecord, Logger, MemoryLogger, StackFormatter, TracingLogger};
pub use request::Request;
pub use responder::ErrorResponder;
pub use response::Response;
pub use router::Router;
pub use server::Server;
