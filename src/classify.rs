//! Error classification: fault → (JSON body, HTTP status, chain code).
//!
//! The [`Classifier`] trait is the seam. [`ErrorTable`] is the stock
//! implementation: a list of error types, each mapped to an [`ErrorInfo`],
//! plus a fallback entry for everything it does not know about.
//!
//! ```rust
//! use bulwark::{ErrorTable, Fault};
//! use http::StatusCode;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("account is frozen")]
//! struct AccountFrozen;
//!
//! let table = ErrorTable::standard()
//!     .register::<AccountFrozen>(StatusCode::CONFLICT, "CH020", "account is frozen");
//! ```

use std::any::Any;
use std::error::Error as StdError;

use http::StatusCode;
use serde_json::{Value, json};

use crate::error::{BadRequestHeader, InvalidBody, NotImplemented, RouteNotFound};
use crate::fault::Fault;

/// The classified form of a fault: what the client sees.
///
/// Only a [`Classifier`] makes these. There are no setters.
#[derive(Clone, Debug, PartialEq)]
pub struct Classified {
    body: Value,
    status: StatusCode,
    chain_code: String,
}

impl Classified {
    pub fn new(body: Value, status: StatusCode, chain_code: impl Into<String>) -> Self {
        Self { body, status, chain_code: chain_code.into() }
    }

    pub fn body(&self) -> &Value { &self.body }
    pub fn status(&self) -> StatusCode { self.status }
    pub fn chain_code(&self) -> &str { &self.chain_code }
}

/// Maps a fault to its client-facing classification.
///
/// Implementations must be total (every fault gets an answer, status in
/// `100..=599`), must not panic, and must give the same answer for the same
/// fault every time. Nothing in this crate catches a panicking classifier.
pub trait Classifier: Send + Sync + 'static {
    fn classify(&self, fault: &Fault) -> Classified;

    /// Recognises a panic payload that is one of this classifier's error
    /// types, so panicking with it classifies the same as returning it.
    ///
    /// Payloads it does not recognise come back unchanged in `Err`.
    fn recover(&self, payload: Box<dyn Any + Send>) -> Result<Fault, Box<dyn Any + Send>> {
        Err(payload)
    }
}

impl<F> Classifier for F
where
    F: Fn(&Fault) -> Classified + Send + Sync + 'static,
{
    fn classify(&self, fault: &Fault) -> Classified {
        self(fault)
    }
}

// ── ErrorTable ────────────────────────────────────────────────────────────────

/// Status, chain code and client message for one kind of error.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorInfo {
    status: StatusCode,
    chain_code: String,
    message: String,
}

impl ErrorInfo {
    /// # Panics
    ///
    /// Panics if `status` is outside `100..=599`.
    pub fn new(
        status: StatusCode,
        chain_code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        assert!(
            (100..=599).contains(&status.as_u16()),
            "status {status} is not a valid response status",
        );
        Self { status, chain_code: chain_code.into(), message: message.into() }
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn chain_code(&self) -> &str { &self.chain_code }
    pub fn message(&self) -> &str { &self.message }
}

type Payload = Box<dyn Any + Send>;

struct Entry {
    matches: fn(&(dyn StdError + 'static)) -> bool,
    recover: fn(Payload) -> Result<Fault, Payload>,
    info: ErrorInfo,
}

fn is_type<E: StdError + 'static>(err: &(dyn StdError + 'static)) -> bool {
    err.is::<E>()
}

fn recover_as<E: StdError + Send + Sync + 'static>(payload: Payload) -> Result<Fault, Payload> {
    payload.downcast::<E>().map(|err| Fault::new(*err))
}

/// Table-driven [`Classifier`].
///
/// Lookup walks the fault's error chain outermost first and, for each link,
/// tries the entries in registration order. The first hit wins. A fault with
/// no hit gets the fallback entry, which defaults to
/// `500 / CH000 / "Internal server error"`.
///
/// The body is `{"code": <chain code>, "message": <entry message>}`, plus
/// `"detail"` when the fault carries one. The fault's own message is never
/// echoed to the client.
pub struct ErrorTable {
    entries: Vec<Entry>,
    fallback: ErrorInfo,
}

impl ErrorTable {
    /// An empty table: everything classifies to the fallback.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            fallback: ErrorInfo::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "CH000",
                "Internal server error",
            ),
        }
    }

    /// The built-in kinds the router and request helpers raise.
    ///
    /// | Error | Status | Code |
    /// |---|---|---|
    /// | [`BadRequestHeader`] | 400 | `CH001` |
    /// | [`InvalidBody`] | 400 | `CH003` |
    /// | [`RouteNotFound`] | 404 | `CH006` |
    /// | [`NotImplemented`] | 501 | `CH008` |
    /// | anything else, panics included | 500 | `CH000` |
    pub fn standard() -> Self {
        Self::new()
            .register::<BadRequestHeader>(StatusCode::BAD_REQUEST, "CH001", "bad request header")
            .register::<InvalidBody>(StatusCode::BAD_REQUEST, "CH003", "Invalid request body")
            .register::<RouteNotFound>(StatusCode::NOT_FOUND, "CH006", "Not found")
            .register::<NotImplemented>(StatusCode::NOT_IMPLEMENTED, "CH008", "Not implemented")
    }

    /// Maps error type `E` to the given status, code and message.
    ///
    /// A panic whose payload is an `E` is classified the same way.
    ///
    /// # Panics
    ///
    /// Panics if `status` is outside `100..=599`.
    pub fn register<E: StdError + Send + Sync + 'static>(
        mut self,
        status: StatusCode,
        chain_code: &str,
        message: &str,
    ) -> Self {
        self.entries.push(Entry {
            matches: is_type::<E>,
            recover: recover_as::<E>,
            info: ErrorInfo::new(status, chain_code, message),
        });
        self
    }

    /// Replaces the entry used for unregistered errors.
    ///
    /// # Panics
    ///
    /// Panics if `status` is outside `100..=599`.
    pub fn fallback(mut self, status: StatusCode, chain_code: &str, message: &str) -> Self {
        self.fallback = ErrorInfo::new(status, chain_code, message);
        self
    }

    /// The entry `fault` resolves to.
    pub fn lookup(&self, fault: &Fault) -> &ErrorInfo {
        fault
            .chain()
            .find_map(|err| self.entries.iter().find(|entry| (entry.matches)(err)))
            .map_or(&self.fallback, |entry| &entry.info)
    }
}

impl Default for ErrorTable {
    fn default() -> Self { Self::standard() }
}

impl Classifier for ErrorTable {
    fn classify(&self, fault: &Fault) -> Classified {
        let info = self.lookup(fault);
        let mut body = json!({
            "code": info.chain_code,
            "message": info.message,
        });
        if let (Some(detail), Some(map)) = (fault.detail(), body.as_object_mut()) {
            map.insert("detail".to_owned(), Value::from(detail));
        }
        Classified::new(body, info.status, info.chain_code.as_str())
    }

    fn recover(&self, mut payload: Payload) -> Result<Fault, Payload> {
        for entry in &self.entries {
            payload = match (entry.recover)(payload) {
                Ok(fault) => return Ok(fault),
                Err(payload) => payload,
            };
        }
        Err(payload)
    }
}
