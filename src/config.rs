//! Configuration for the one-shot [`crate::collect::collect`] entry point.

/// What a progress callback passed to [`crate::collect::collect`] should
/// return: `Continue` to keep going, `Abort` to stop with
/// [`crate::ErrorKind::Interrupted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSignal {
    /// Keep parsing.
    Continue,
    /// Stop, surfacing `ErrorKind::Interrupted`.
    Abort,
}

/// Options controlling [`crate::collect::collect`].
pub struct CollectOptions<'a> {
    /// The multipart boundary, without the leading `--`.
    pub boundary: &'a [u8],
    /// A soft cap, in bytes, on total memory used while collecting. `0`
    /// means unlimited. See [`crate::parser::ParserOptions::max_memory`].
    pub max_memory: usize,
    /// The chunk size, in bytes, `collect` feeds the underlying
    /// [`crate::Parser`] per iteration. Only affects progress-callback
    /// granularity, never the result.
    pub chunk_size: usize,
    /// Whether a part whose `Content-Type` begins with `multipart/` is
    /// recursively collected into a [`crate::collect::Value::Many`] instead
    /// of being kept as a raw [`crate::collect::Value::File`].
    pub recurse_nested: bool,
    /// Upper bound on nested `multipart/*` recursion depth. A `multipart/*`
    /// part found at this depth is collected as a raw
    /// [`crate::collect::Value::File`] instead of being recursed into,
    /// bounding recursion on adversarial input.
    pub max_nesting_depth: u32,
    /// Called after every chunk with `(bytes_parsed, total_bytes, percent)`,
    /// where `percent` is `bytes_parsed * 100 / total_bytes` (0 when
    /// `total_bytes` is 0). Return [`ProgressSignal::Abort`] to stop early.
    pub on_progress: Option<&'a mut dyn FnMut(u64, u64, u8) -> ProgressSignal>,
}

impl<'a> CollectOptions<'a> {
    /// Options with a boundary and otherwise sensible defaults: no memory
    /// cap, 64 KiB chunks, nested `multipart/*` parts collected recursively
    /// up to depth 4.
    pub fn new(boundary: &'a [u8]) -> Self {
        Self {
            boundary,
            max_memory: 0,
            chunk_size: 64 * 1024,
            recurse_nested: true,
            max_nesting_depth: 4,
            on_progress: None,
        }
    }
}
