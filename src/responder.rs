//! The error write path: classify, log, respond.

use std::any::Any;
use std::sync::Arc;

use crate::classify::{Classified, Classifier, ErrorTable};
use crate::context::Context;
use crate::fault::Fault;
use crate::log::{BacktraceFormatter, LogRecord, Logger, StackFormatter, TracingLogger};
use crate::response::Response;

/// Turns a [`Fault`] into one log record and one JSON error response.
///
/// The three collaborators are injected and shared; a responder is built
/// once at startup and used by every request.
///
/// ```rust
/// use std::any::Any;
/// use std::sync::Arc;
/// use bulwark::{ErrorResponder, ErrorTable, MemoryLogger};
///
/// let logger = Arc::new(MemoryLogger::new());
/// let responder = ErrorResponder::new(ErrorTable::standard()).with_logger(logger.clone());
/// ```
#[derive(Clone)]
pub struct ErrorResponder {
    classifier: Arc<dyn Classifier>,
    logger: Arc<dyn Logger>,
    stacks: Arc<dyn StackFormatter>,
}

impl ErrorResponder {
    /// A responder for `classifier` that logs through `tracing` and renders
    /// stacks from captured backtraces.
    pub fn new(classifier: impl Classifier) -> Self {
        Self {
            classifier: Arc::new(classifier),
            logger: Arc::new(TracingLogger),
            stacks: Arc::new(BacktraceFormatter),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_stack_formatter(mut self, stacks: Arc<dyn StackFormatter>) -> Self {
        self.stacks = stacks;
        self
    }

    /// Converts a recovered panic payload into a fault.
    ///
    /// Error types the classifier knows are recovered as themselves;
    /// everything else goes through [`Fault::from_panic`].
    pub fn recover_panic(&self, payload: Box<dyn Any + Send>) -> Fault {
        self.classifier.recover(payload).unwrap_or_else(Fault::from_panic)
    }

    /// Classifies `fault` and writes exactly one log record for it.
    ///
    /// The record's `stack` is rendered only when the classification is a
    /// 500. Returns the classification so callers never classify twice.
    pub fn log_error(&self, ctx: &Context, fault: &Fault) -> Classified {
        let classified = self.classifier.classify(fault);
        let record = LogRecord::new(&classified, ctx.path(), fault.message(), || {
            self.stacks.stack(fault)
        });
        self.logger.write(ctx, &record);
        classified
    }

    /// Logs `fault` and builds its JSON error response.
    pub fn write_error(&self, ctx: &Context, fault: &Fault) -> Response {
        Response::from_classified(&self.log_error(ctx, fault))
    }
}

impl Default for ErrorResponder {
    fn default() -> Self { Self::new(ErrorTable::standard()) }
}
