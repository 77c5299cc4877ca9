//! Internal parser states.

/// Every state the byte-dispatch loop can be in.
///
/// Transitions are driven one input byte at a time; see [`crate::parser`]
/// for the dispatch table itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    /// No match of the first delimiter currently in progress; bytes are
    /// discarded silently as they arrive.
    Preamble,
    /// Mid-match of `--<boundary>` (no leading CRLF for the very first
    /// delimiter).
    FirstBoundary,
    /// Just consumed a boundary line's CRLF, or are about to decide between
    /// another part and the closing `--`.
    AfterBoundary,
    /// About to read a header name, or the blank line ending the headers.
    HeaderFieldStart,
    /// Inside a header name, accumulating until `:`.
    HeaderField,
    /// Skipping optional whitespace after `:`.
    HeaderValueStart,
    /// Inside a header value, accumulating until CR.
    HeaderValue,
    /// Saw CR inside a header value; expecting LF.
    HeaderValueAlmostDone,
    /// Saw the blank-line CR; expecting LF.
    HeadersAlmostDone,
    /// Inside part body, searching for `CRLF--<boundary>`.
    PartData,
    /// Matched a prefix of the delimiter inside part data; bytes are deferred
    /// in the lookbehind buffer until the match resolves.
    PartDataAlmostBoundary,
    /// Full boundary line matched; deciding between CRLF (new part) and `--`
    /// (end of body).
    PartDataBoundary,
    /// Saw the second `-` of the closing `--`; expecting CRLF or EOF.
    PartDataAlmostEnd,
    /// Closing CRLF consumed after the final boundary.
    PartDataEnd,
    /// Terminal. Further bytes are epilogue, consumed silently.
    BodyEnd,
    /// Terminal on error. Further `execute` calls return 0.
    Errored,
}
