//! Error types.
//!
//! Two families live here. [`Error`] surfaces infrastructure failures: a bad
//! socket address, binding to a port, accepting a connection. The structs
//! below are the built-in handler failures that the router and
//! request helpers raise as [`Fault`](crate::Fault)s, and
//! [`ErrorTable::standard`](crate::ErrorTable::standard) maps each one to a
//! status and chain code.

use std::net::AddrParseError;

use thiserror::Error;

/// The error type returned by bulwark's server operations.
///
/// Handler failures never show up here. They are [`Fault`](crate::Fault)s,
/// and they end up as JSON error envelopes on the wire.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: AddrParseError,
    },
}

// ── Built-in fault kinds ─────────────────────────────────────────────────────

/// A required request header is missing or unreadable.
///
/// Raised by [`Request::require_header`](crate::Request::require_header).
#[derive(Debug, Error)]
#[error("bad request header")]
pub struct BadRequestHeader;

/// No route matches the request's method and path.
#[derive(Debug, Error)]
#[error("route not found: {method} {path}")]
pub struct RouteNotFound {
    pub method: http::Method,
    pub path: String,
}

/// The request body could not be decoded as the JSON the handler expected.
#[derive(Debug, Error)]
#[error("invalid request body")]
pub struct InvalidBody(#[source] pub serde_json::Error);

/// The endpoint exists but is switched off. Pair with
/// [`always_fail`](crate::always_fail) or [`Router::disable`](crate::Router::disable).
#[derive(Debug, Error)]
#[error("not implemented")]
pub struct NotImplemented;

/// A handler panicked with a payload that is not an error value.
///
/// Only the payload's type survives; its value is dropped.
#[derive(Debug, Error)]
#[error("panic with {type_name}")]
pub struct Panicked {
    pub type_name: &'static str,
}
