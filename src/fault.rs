//! The handler failure type.
//!
//! A [`Fault`] keeps the human-readable message and the stack trace apart:
//! the message is the wrapped error's `Display`, the trace is a
//! [`Backtrace`] captured when the fault was built. Logging the message never
//! drags trace text along with it, and the trace is only rendered when a
//! server fault needs it.

use std::any::Any;
use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::error::Panicked;

type DynError = dyn StdError + Send + Sync + 'static;

/// A failed handler invocation: an error value plus the backtrace captured
/// where it was created.
///
/// Any `std::error::Error + Send + Sync + 'static` converts into a `Fault`,
/// so handlers propagate with `?`:
///
/// ```rust
/// use bulwark::Fault;
///
/// fn parse(raw: &str) -> Result<u64, Fault> {
///     Ok(raw.parse::<u64>()?)
/// }
/// ```
///
/// `Fault` does not implement `std::error::Error` itself; the blanket `From`
/// conversion depends on that.
///
/// Cloning is cheap: the error and the backtrace are shared.
#[derive(Clone)]
pub struct Fault {
    source: Arc<DynError>,
    backtrace: Arc<Backtrace>,
    detail: Option<String>,
}

impl Fault {
    /// Wraps `err`, capturing a backtrace (subject to `RUST_BACKTRACE` /
    /// `RUST_LIB_BACKTRACE`).
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::from_boxed(Box::new(err))
    }

    /// A fault whose whole message is `msg`.
    pub fn msg(msg: impl fmt::Display) -> Self {
        Self::new(Message(msg.to_string()))
    }

    fn from_boxed(source: Box<DynError>) -> Self {
        Self {
            source: Arc::from(source),
            backtrace: Arc::new(Backtrace::capture()),
            detail: None,
        }
    }

    /// Attaches a client-facing detail string, echoed in the error envelope.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Converts a payload recovered from `catch_unwind` into a fault.
    ///
    /// Payloads that are themselves errors keep their identity: a `Fault`
    /// raised with [`std::panic::panic_any`] comes back unchanged, and a
    /// boxed error or `std::io::Error` is wrapped as if it had been returned.
    /// Anything else becomes [`Panicked`], which records the payload's type
    /// and nothing more. Error types a [`Classifier`](crate::Classifier)
    /// knows about are recognised earlier, by
    /// [`Classifier::recover`](crate::Classifier::recover).
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<Fault>() {
            Ok(fault) => return *fault,
            Err(other) => other,
        };
        let payload = match payload.downcast::<Box<DynError>>() {
            Ok(err) => return Self::from_boxed(*err),
            Err(other) => other,
        };
        let payload = match payload.downcast::<std::io::Error>() {
            Ok(err) => return Self::new(*err),
            Err(other) => other,
        };
        Self::new(Panicked { type_name: payload_type(payload.as_ref()) })
    }

    /// The error's display string. Never contains trace text.
    pub fn message(&self) -> String {
        self.source.to_string()
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// The wrapped error followed by its `source()` chain, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &(dyn StdError + 'static)> {
        let head: &(dyn StdError + 'static) = &*self.source;
        std::iter::successors(Some(head), |&err| err.source())
    }

    /// Whether any link of the chain is an `E`.
    pub fn is<E: StdError + 'static>(&self) -> bool {
        self.find::<E>().is_some()
    }

    /// The first link of the chain that is an `E`.
    pub fn find<E: StdError + 'static>(&self) -> Option<&E> {
        self.chain().find_map(|err| err.downcast_ref::<E>())
    }
}

impl<E> From<E> for Fault
where
    E: StdError + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self::new(err)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, f)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("message", &self.message())
            .field("detail", &self.detail)
            .field("backtrace", &self.backtrace.status())
            .finish()
    }
}

/// Plain-text error behind [`Fault::msg`].
#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for Message {}

// ── Panic payload type tags ───────────────────────────────────────────────────

macro_rules! type_tag {
    ($payload:expr; $($ty:ty),+ $(,)?) => {
        $(
            if $payload.is::<$ty>() {
                return std::any::type_name::<$ty>();
            }
        )+
    };
}

/// `Any` cannot name an arbitrary type, so only the payloads `panic!` and
/// `panic_any` commonly carry are recognised.
fn payload_type(payload: &(dyn Any + Send)) -> &'static str {
    type_tag!(payload;
        &'static str, String, bool, char,
        i8, i16, i32, i64, i128, isize,
        u8, u16, u32, u64, u128, usize,
        f32, f64, (),
    );
    "unknown type"
}

#[cfg(test)]
mod tests {
    use std::panic;

    use super::*;
    use crate::error::NotImplemented;

    #[derive(Debug, thiserror::Error)]
    #[error("loading account")]
    struct Outer(#[source] std::io::Error);

    fn recover(f: impl FnOnce() + panic::UnwindSafe) -> Fault {
        let payload = panic::catch_unwind(f).expect_err("closure must panic");
        Fault::from_panic(payload)
    }

    #[test]
    fn message_is_display_without_trace() {
        let fault = Fault::msg("bad request header");
        assert_eq!(fault.message(), "bad request header");
        assert_eq!(fault.to_string(), "bad request header");
        assert!(!fault.message().contains("backtrace"));
    }

    #[test]
    fn question_mark_converts_errors() {
        fn parse() -> Result<u32, Fault> {
            Ok("nope".parse::<u32>()?)
        }
        let fault = parse().unwrap_err();
        assert!(fault.is::<std::num::ParseIntError>());
    }

    #[test]
    fn chain_walks_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let fault = Fault::new(Outer(io));
        let messages: Vec<String> = fault.chain().map(|e| e.to_string()).collect();
        assert_eq!(messages, ["loading account", "missing"]);
        assert!(fault.is::<std::io::Error>());
        assert!(!fault.is::<NotImplemented>());
    }

    #[test]
    fn find_returns_inner_link() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let fault = Fault::new(Outer(io));
        let inner = fault.find::<std::io::Error>().map(std::io::Error::kind);
        assert_eq!(inner, Some(std::io::ErrorKind::NotFound));
        assert_eq!(fault.chain().count(), 2);
    }

    #[test]
    fn detail_is_kept() {
        let fault = Fault::new(NotImplemented).with_detail("try v2");
        assert_eq!(fault.detail(), Some("try v2"));
        assert_eq!(fault.clone().detail(), Some("try v2"));
    }

    #[test]
    fn panic_with_fault_keeps_identity() {
        let fault = recover(|| panic::panic_any(Fault::new(NotImplemented).with_detail("x")));
        assert!(fault.is::<NotImplemented>());
        assert_eq!(fault.detail(), Some("x"));
    }

    #[test]
    fn panic_with_boxed_error_keeps_message() {
        let fault = recover(|| {
            let err: Box<dyn StdError + Send + Sync> = "disk on fire".into();
            panic::panic_any(err)
        });
        assert_eq!(fault.message(), "disk on fire");
        assert!(!fault.is::<Panicked>());
    }

    #[test]
    fn panic_with_io_error_keeps_message() {
        let fault = recover(|| {
            panic::panic_any(std::io::Error::other("pipe closed"))
        });
        assert_eq!(fault.message(), "pipe closed");
        assert!(fault.is::<std::io::Error>());
    }

    #[test]
    fn panic_with_str_names_type_only() {
        let fault = recover(|| panic!("secret token 1234"));
        assert_eq!(fault.message(), "panic with &str");
        assert!(fault.is::<Panicked>());
    }

    #[test]
    fn panic_with_formatted_string_names_type_only() {
        let token = 1234;
        let fault = recover(move || panic!("secret token {token}"));
        assert!(fault.message().starts_with("panic with "));
        assert!(fault.message().contains("String"));
        assert!(!fault.message().contains("1234"));
    }

    #[test]
    fn panic_with_integer_names_type() {
        let fault = recover(|| panic::panic_any(7_i32));
        assert_eq!(fault.message(), "panic with i32");
    }

    #[test]
    fn panic_with_unrecognised_payload() {
        struct Opaque;
        let fault = recover(|| panic::panic_any(Opaque));
        assert_eq!(fault.message(), "panic with unknown type");
    }
}
