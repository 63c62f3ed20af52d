//! # Error Classifier
//!
//! One vocabulary over heterogeneous transport failures. Every I/O path
//! wraps its error once, at the point of failure, into [`ConnError`] with
//! enough context to diagnose without a stack trace; upper layers then ask
//! `eof`/`timeout`/`temporary` to pick a retry policy without ever
//! type-switching on concrete error kinds.

use std::error::Error;
use std::io;

/// Classified connection-level error: the underlying cause plus the
/// operation, network kind, endpoints, and owning connection identity.
#[derive(Debug, thiserror::Error)]
#[error("{}: {cause}", identity(.conn, .op, .src, .dest))]
pub struct ConnError {
    pub op: &'static str,
    pub net: String,
    pub src: String,
    pub dest: String,
    pub conn: String,
    #[source]
    pub cause: io::Error,
}

fn identity(conn: &str, op: &str, src: &str, dest: &str) -> String {
    let mut s = String::from("connection error");
    if !conn.is_empty() {
        s.push_str(" [");
        s.push_str(conn);
        s.push(']');
    }
    s.push(' ');
    s.push_str(op);
    if !src.is_empty() {
        s.push(' ');
        s.push_str(src);
    }
    if !dest.is_empty() {
        s.push_str(if src.is_empty() { " " } else { "->" });
        s.push_str(dest);
    }
    s
}

impl ConnError {
    /// End-of-stream: the peer is gone and retrying the same connection
    /// is pointless.
    pub fn eof(&self) -> bool {
        eof_kind(self.cause.kind())
    }

    /// The per-call deadline elapsed.
    pub fn timeout(&self) -> bool {
        timeout_kind(self.cause.kind())
    }

    /// A retry of the same call may succeed.
    pub fn temporary(&self) -> bool {
        temporary_kind(self.cause.kind())
    }
}

fn eof_kind(kind: io::ErrorKind) -> bool {
    matches!(kind, io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe)
}

fn timeout_kind(kind: io::ErrorKind) -> bool {
    matches!(kind, io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

fn temporary_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// True if `err` is an end-of-stream error. Delegates to [`ConnError`]
/// when the error is one, falls back to the platform `io::Error` kind,
/// and treats anything else as non-network.
pub fn is_eof_error(err: &(dyn Error + 'static)) -> bool {
    if let Some(err) = err.downcast_ref::<ConnError>() {
        return err.eof();
    }
    if let Some(err) = err.downcast_ref::<io::Error>() {
        return eof_kind(err.kind());
    }
    false
}

/// True if `err` is a deadline/timeout error; classification walk as in
/// [`is_eof_error`].
pub fn is_timeout_error(err: &(dyn Error + 'static)) -> bool {
    if let Some(err) = err.downcast_ref::<ConnError>() {
        return err.timeout();
    }
    if let Some(err) = err.downcast_ref::<io::Error>() {
        return timeout_kind(err.kind());
    }
    false
}

/// True if `err` is worth retrying; classification walk as in
/// [`is_eof_error`].
pub fn is_temporary_error(err: &(dyn Error + 'static)) -> bool {
    if let Some(err) = err.downcast_ref::<ConnError>() {
        return err.temporary();
    }
    if let Some(err) = err.downcast_ref::<io::Error>() {
        return temporary_kind(err.kind());
    }
    false
}
