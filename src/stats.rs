//! Parsing statistics, reset to zero by [`crate::Parser::reset`].

/// A snapshot of the counters a [`crate::Parser`] maintains about the
/// stream it has consumed since construction or the last `reset`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Total bytes handed to `execute`/`feed`, including bytes that were
    /// part of delimiters, headers, preamble, or epilogue (not just part
    /// bodies).
    pub total_bytes: u64,
    /// Number of parts whose `on_part_data_end` has fired.
    pub parts_count: u64,
    /// The largest single part body seen so far, in bytes.
    pub max_part_size: u64,
    /// Bytes currently counted against `max_memory`, i.e. bytes delivered
    /// to accumulating callbacks since the last `reset`.
    pub current_memory: usize,
    /// The configured memory cap, or `0` if unlimited.
    pub max_memory: usize,
}

impl Statistics {
    pub(crate) fn record_part_complete(&mut self, part_size: u64) {
        self.parts_count += 1;
        if part_size > self.max_part_size {
            self.max_part_size = part_size;
        }
    }
}
