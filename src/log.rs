//! The logging side of the error path.
//!
//! Every classified fault produces exactly one [`LogRecord`], handed to an
//! injected [`Logger`]. Server faults (status 500) also carry a stack trace,
//! rendered by an injected [`StackFormatter`]; nothing else does.
//!
//! The defaults are [`TracingLogger`], which turns each record into a
//! `tracing` event, and [`BacktraceFormatter`]. Swap in [`MemoryLogger`] to
//! assert on records in tests.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::sync::{Mutex, PoisonError};

use http::StatusCode;
use tracing::{error, warn};

use crate::classify::Classified;
use crate::context::Context;
use crate::fault::Fault;

pub const KEY_STATUS: &str = "status";
pub const KEY_CHAIN_CODE: &str = "chaincode";
pub const KEY_PATH: &str = "path";
pub const KEY_ERROR: &str = "error";
pub const KEY_STACK: &str = "stack";

// ── LogRecord ─────────────────────────────────────────────────────────────────

/// One structured log entry for one failed request.
///
/// `stack` is present if and only if the status is exactly 500. The
/// constructor enforces it, so a record in hand always satisfies it.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    status: StatusCode,
    chain_code: String,
    path: String,
    error: String,
    stack: Option<String>,
}

impl LogRecord {
    /// `stack` is only called when the classification is a 500.
    pub(crate) fn new(
        classified: &Classified,
        path: &str,
        error: String,
        stack: impl FnOnce() -> String,
    ) -> Self {
        let stack = (classified.status() == StatusCode::INTERNAL_SERVER_ERROR).then(stack);
        Self {
            status: classified.status(),
            chain_code: classified.chain_code().to_owned(),
            path: path.to_owned(),
            error,
            stack,
        }
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn chain_code(&self) -> &str { &self.chain_code }
    pub fn path(&self) -> &str { &self.path }
    pub fn error(&self) -> &str { &self.error }
    pub fn stack(&self) -> Option<&str> { self.stack.as_deref() }

    /// The record as ordered key/value pairs:
    /// `status`, `chaincode`, `path`, `error`, then `stack` when present.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            (KEY_STATUS, self.status.as_u16().to_string()),
            (KEY_CHAIN_CODE, self.chain_code.clone()),
            (KEY_PATH, self.path.clone()),
            (KEY_ERROR, self.error.clone()),
        ];
        if let Some(stack) = &self.stack {
            fields.push((KEY_STACK, stack.clone()));
        }
        fields
    }

    /// Value of one key, if the record has it.
    pub fn get(&self, key: &str) -> Option<String> {
        self.fields().into_iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

// ── Logger ────────────────────────────────────────────────────────────────────

/// Destination for [`LogRecord`]s.
///
/// Fire-and-forget: implementations must not block for long and must not
/// panic, since they run on the error path of a live request.
pub trait Logger: Send + Sync + 'static {
    fn write(&self, ctx: &Context, record: &LogRecord);
}

/// Emits each record as a `tracing` event.
///
/// 5xx records log at `ERROR`, everything else at `WARN`. Field names match
/// the record keys, with the request method added.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn write(&self, ctx: &Context, record: &LogRecord) {
        let status = record.status().as_u16();
        match record.stack() {
            Some(stack) => error!(
                status,
                chaincode = %record.chain_code(),
                method = %ctx.method(),
                path = %record.path(),
                error = %record.error(),
                stack = %stack,
                "request failed"
            ),
            None if record.status().is_server_error() => error!(
                status,
                chaincode = %record.chain_code(),
                method = %ctx.method(),
                path = %record.path(),
                error = %record.error(),
                "request failed"
            ),
            None => warn!(
                status,
                chaincode = %record.chain_code(),
                method = %ctx.method(),
                path = %record.path(),
                error = %record.error(),
                "request failed"
            ),
        }
    }
}

/// Keeps every record in memory. Meant for tests.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogger {
    pub fn new() -> Self { Self::default() }

    /// A copy of everything written so far, oldest first.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Logger for MemoryLogger {
    fn write(&self, _ctx: &Context, record: &LogRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}

// ── StackFormatter ────────────────────────────────────────────────────────────

/// Renders the multi-frame trace logged under `stack`.
///
/// Only called for 500s. The result must not be empty.
pub trait StackFormatter: Send + Sync + 'static {
    fn stack(&self, fault: &Fault) -> String;
}

/// Uses the backtrace captured when the fault was built. When capture was
/// disabled at that point (no `RUST_BACKTRACE`), a trace of the error path
/// itself is taken instead so the record is never left without one.
#[derive(Clone, Copy, Debug, Default)]
pub struct BacktraceFormatter;

impl StackFormatter for BacktraceFormatter {
    fn stack(&self, fault: &Fault) -> String {
        let rendered = match fault.backtrace().status() {
            BacktraceStatus::Captured => fault.backtrace().to_string(),
            _ => Backtrace::force_capture().to_string(),
        };
        if rendered.trim().is_empty() {
            "<no frames>".to_owned()
        } else {
            rendered
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn classified(status: StatusCode) -> Classified {
        Classified::new(json!({}), status, "CH042")
    }

    #[test]
    fn stack_only_for_500() {
        for code in [400, 401, 404, 429, 501, 502, 503] {
            let status = StatusCode::from_u16(code).unwrap();
            let record = LogRecord::new(&classified(status), "/x", "boom".into(), || {
                panic!("stack must not be rendered for {code}")
            });
            assert_eq!(record.stack(), None);
            assert_eq!(record.get(KEY_STACK), None);
        }

        let record = LogRecord::new(
            &classified(StatusCode::INTERNAL_SERVER_ERROR),
            "/x",
            "boom".into(),
            || "frame 0".to_owned(),
        );
        assert_eq!(record.stack(), Some("frame 0"));
    }

    #[test]
    fn fields_are_ordered() {
        let record = LogRecord::new(
            &classified(StatusCode::INTERNAL_SERVER_ERROR),
            "/build-transaction",
            "panic with &str".into(),
            || "frame 0".to_owned(),
        );
        let keys: Vec<&str> = record.fields().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, ["status", "chaincode", "path", "error", "stack"]);
        assert_eq!(record.get(KEY_STATUS).as_deref(), Some("500"));
        assert_eq!(record.get(KEY_CHAIN_CODE).as_deref(), Some("CH042"));
        assert_eq!(record.get(KEY_PATH).as_deref(), Some("/build-transaction"));
    }

    #[test]
    fn memory_logger_keeps_order() {
        let logger = MemoryLogger::new();
        let ctx = Context::new(http::Method::GET, "/a");
        for code in [400, 404] {
            let status = StatusCode::from_u16(code).unwrap();
            logger.write(&ctx, &LogRecord::new(&classified(status), "/a", "e".into(), String::new));
        }
        let statuses: Vec<u16> = logger.records().iter().map(|r| r.status().as_u16()).collect();
        assert_eq!(statuses, [400, 404]);
    }

    #[test]
    fn backtrace_formatter_never_empty() {
        let stack = BacktraceFormatter.stack(&Fault::msg("x"));
        assert!(!stack.trim().is_empty());
    }
}
