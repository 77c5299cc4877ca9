//! The error taxonomy surfaced through [`crate::Parser::error`] and
//! returned by the one-shot [`crate::collect::collect`] entry point.

use std::error::Error as StdError;
use std::fmt::{self, Debug, Display};

/// The stable, enumerable error kinds a [`crate::Parser`] can report.
///
/// There is deliberately no `Ok`/`Unknown` variant: the absence of an error
/// is represented by `Parser::error()` returning `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A callback returned a non-zero/`Pause` status. Recoverable via
    /// [`crate::Parser::reset`] or [`crate::Parser::resume`].
    Paused,
    /// A collect-mode progress callback returned non-zero. Recoverable via
    /// `reset`.
    Interrupted,
    /// The configured memory cap would be exceeded.
    MemoryLimitExceeded,
    /// A `reset` supplied a boundary longer than the originally allocated
    /// capacity.
    BoundaryTooLong,
    /// `execute`/`feed` was called while the parser had no valid state to
    /// continue from (e.g. after a fatal error, without an intervening
    /// `reset`).
    InvalidState,
    /// The boundary passed at construction or reset was empty.
    InvalidBoundary,
    /// A header name contained a byte outside `A-Za-z0-9_-`.
    InvalidHeaderField,
    /// A header value's CR was not followed by LF, or header bytes appeared
    /// where a terminator was expected.
    InvalidHeaderValue,
    /// A callback raised a host-language error.
    CallbackError,
}

impl ErrorKind {
    /// Whether this error kind is recoverable by `reset` alone (as opposed
    /// to being, in addition, already recoverable in-place via `resume`).
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            ErrorKind::Paused | ErrorKind::Interrupted | ErrorKind::CallbackError
        )
    }

    fn message(self) -> &'static str {
        match self {
            ErrorKind::Paused => "parsing paused by a callback",
            ErrorKind::Interrupted => "collect-mode progress callback requested abort",
            ErrorKind::MemoryLimitExceeded => "memory cap exceeded",
            ErrorKind::BoundaryTooLong => "replacement boundary exceeds allocated capacity",
            ErrorKind::InvalidState => "parser is not in a state that can accept input",
            ErrorKind::InvalidBoundary => "boundary must be a non-empty byte string",
            ErrorKind::InvalidHeaderField => "invalid byte in header field name",
            ErrorKind::InvalidHeaderValue => "invalid header value (unterminated CR)",
            ErrorKind::CallbackError => "a callback returned an error",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A host-language error raised from inside a callback, captured as
/// [`ErrorKind::CallbackError`].
pub type CallbackError = Box<dyn StdError + Send + Sync + 'static>;

/// An error reported by the parser: a stable [`ErrorKind`] plus, for
/// [`ErrorKind::CallbackError`], the original error raised by the
/// callback.
pub struct ParserError {
    kind: ErrorKind,
    source: Option<CallbackError>,
}

impl ParserError {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    pub(crate) fn callback(err: CallbackError) -> Self {
        Self {
            kind: ErrorKind::CallbackError,
            source: Some(err),
        }
    }

    /// The stable error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl Debug for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ParserError");
        s.field("kind", &self.kind);
        if let Some(source) = &self.source {
            s.field("source", &source.to_string());
        }
        s.finish()
    }
}

impl Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.kind, source),
            None => Display::fmt(&self.kind, f),
        }
    }
}

impl From<CallbackError> for ParserError {
    fn from(err: CallbackError) -> Self {
        Self::callback(err)
    }
}

impl StdError for ParserError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn StdError + 'static))
    }
}
