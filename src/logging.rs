//! Low-level diagnostic channel.
//!
//! User-facing problems are returned as [`Diagnostic`] values. A [`LogSink`]
//! receives the extra detail behind a handler failure, which points at a bug in
//! command logic rather than at bad input.

use crate::diagnostic::Diagnostic;

pub trait LogSink {
    /// A handler returned an error or panicked. `detail` carries the full
    /// context (error chain, panic payload).
    fn handler_failed(&self, keyword: &str, detail: &str);

    /// Every other diagnostic produced by a dispatch.
    fn diagnostic(&self, _line: &str, _diagnostic: &Diagnostic) {}
}

/// Forwards everything to [`tracing`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn handler_failed(&self, keyword: &str, detail: &str) {
        tracing::error!(keyword, "command handler failed: {}", detail);
    }

    fn diagnostic(&self, line: &str, diagnostic: &Diagnostic) {
        tracing::warn!(
            line,
            kind = ?diagnostic.kind,
            token = diagnostic.offending_token.as_deref(),
            "{}",
            diagnostic
        );
    }
}
