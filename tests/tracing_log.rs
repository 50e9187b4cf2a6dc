//! `TracingLogger` output as seen by a `tracing-subscriber` fmt layer.

use std::io;
use std::sync::{Arc, Mutex};

use bulwark::{BadRequestHeader, Context, ErrorResponder, ErrorTable, Fault};
use http::Method;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a fmt subscriber writing into a buffer; returns the output.
fn capture(f: impl FnOnce()) -> String {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    captured.text()
}

fn responder() -> ErrorResponder {
    ErrorResponder::new(ErrorTable::standard())
}

#[test]
fn client_fault_is_a_warning_without_stack() {
    let ctx = Context::new(Method::POST, "/transact");
    let out = capture(|| {
        responder().write_error(&ctx, &Fault::new(BadRequestHeader));
    });

    assert!(out.contains("WARN"), "{out}");
    assert!(out.contains("status=400"), "{out}");
    assert!(out.contains("chaincode=CH001"), "{out}");
    assert!(out.contains("path=/transact"), "{out}");
    assert!(out.contains("error=bad request header"), "{out}");
    assert!(!out.contains("stack="), "{out}");
}

#[test]
fn server_fault_is_an_error_with_stack() {
    let ctx = Context::new(Method::GET, "/info");
    let out = capture(|| {
        responder().write_error(&ctx, &Fault::msg("connection refused"));
    });

    assert!(out.contains("ERROR"), "{out}");
    assert!(out.contains("status=500"), "{out}");
    assert!(out.contains("chaincode=CH000"), "{out}");
    assert!(out.contains("stack="), "{out}");
}

#[test]
fn non_500_server_error_has_no_stack() {
    let ctx = Context::new(Method::POST, "/reset");
    let out = capture(|| {
        responder().write_error(&ctx, &Fault::new(bulwark::NotImplemented));
    });

    assert!(out.contains("ERROR"), "{out}");
    assert!(out.contains("status=501"), "{out}");
    assert!(!out.contains("stack="), "{out}");
}
