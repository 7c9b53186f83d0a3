//! User-facing failure reports produced by the interpreter.

use crate::convert::{ConversionError, ConversionFailure};
use std::fmt;

/// Category of a dispatch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    UnknownCommand,
    MissingArguments,
    ConversionNoMatch,
    ConversionTooManyMatches,
    ConversionFormatError,
    HandlerExecutionFailure,
}

impl From<ConversionFailure> for DiagnosticKind {
    fn from(failure: ConversionFailure) -> Self {
        match failure {
            ConversionFailure::NoMatch => DiagnosticKind::ConversionNoMatch,
            ConversionFailure::TooManyMatches => DiagnosticKind::ConversionTooManyMatches,
            ConversionFailure::FormatError => DiagnosticKind::ConversionFormatError,
        }
    }
}

/// One-line, human-readable description of why a line was not executed
/// (or failed while executing).
///
/// The interpreter never prints these; the embedding application decides how
/// to render them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub offending_token: Option<String>,
}

impl Diagnostic {
    /// Diagnostic without an offending token.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            offending_token: None,
        }
    }

    /// Names the token that caused the failure.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.offending_token = Some(token.into());
        self
    }

    pub(crate) fn unknown_command(keyword: &str) -> Self {
        Self::new(
            DiagnosticKind::UnknownCommand,
            format!("unknown command: {}", keyword),
        )
        .with_token(keyword)
    }

    pub(crate) fn missing_arguments(keyword: &str, hint: &str, supplied: usize, required: usize) -> Self {
        Self::new(
            DiagnosticKind::MissingArguments,
            format!(
                "{} expects at least {} argument(s), got {}. Usage: {} {}",
                keyword, required, supplied, keyword, hint
            ),
        )
    }

    pub(crate) fn conversion(param: &str, token: &str, err: ConversionError) -> Self {
        let message = match err.kind {
            ConversionFailure::NoMatch => format!("couldn't find '{}' for {}: {}", token, param, err),
            ConversionFailure::TooManyMatches => {
                format!("found more than one '{}' for {}, be more specific: {}", token, param, err)
            }
            ConversionFailure::FormatError => format!("invalid value for {}: {}", param, err),
        };
        Self::new(err.kind.into(), message).with_token(token)
    }

    pub(crate) fn handler_failure(keyword: &str, reason: &str) -> Self {
        Self::new(
            DiagnosticKind::HandlerExecutionFailure,
            format!("error executing {}: {}", keyword, reason),
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Diagnostic {}
