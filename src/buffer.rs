//! The optional callback buffer: a bounded accumulator that coalesces many
//! small header/data emissions into fewer, larger callback invocations.
//!
//! Enabled by a non-zero `buffer_size` at construction (see
//! [`crate::ParserOptions`]). Buffering is transparent: the byte content
//! observed by any single-kind callback, in order, is identical whether or
//! not buffering is enabled — only the chunking differs.

use crate::callbacks::{CallbackResult, Control};

/// Which of the three byte-bearing callbacks a run of buffered bytes is
/// destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldTag {
    HeaderField,
    HeaderValue,
    PartData,
}

pub(crate) struct CallbackBuffer {
    capacity: usize,
    buf: Vec<u8>,
    tag: Option<FieldTag>,
}

impl CallbackBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buf: Vec::with_capacity(capacity.min(64 * 1024)),
            tag: None,
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    /// Accumulate `data` tagged `tag`, flushing through `emit` whenever the
    /// buffer would overflow or the tag changes.
    pub(crate) fn feed<E>(&mut self, tag: FieldTag, mut data: &[u8], mut emit: E) -> CallbackResult
    where
        E: FnMut(FieldTag, &[u8]) -> CallbackResult,
    {
        if self.tag.is_some() && self.tag != Some(tag) {
            let control = self.flush(&mut emit)?;
            if control == Control::Pause {
                return Ok(Control::Pause);
            }
        }
        self.tag = Some(tag);

        while !data.is_empty() {
            let space = self.capacity - self.buf.len();
            if space == 0 {
                let control = self.flush(&mut emit)?;
                self.tag = Some(tag);
                if control == Control::Pause {
                    return Ok(Control::Pause);
                }
                continue;
            }

            let take = space.min(data.len());
            self.buf.extend_from_slice(&data[..take]);
            data = &data[take..];
        }

        Ok(Control::Continue)
    }

    /// Flush whatever is buffered, regardless of tag. Called when the
    /// logical field ends (the parser is about to transition state).
    pub(crate) fn end_field<E>(&mut self, mut emit: E) -> CallbackResult
    where
        E: FnMut(FieldTag, &[u8]) -> CallbackResult,
    {
        self.flush(&mut emit)
    }

    fn flush<E>(&mut self, emit: &mut E) -> CallbackResult
    where
        E: FnMut(FieldTag, &[u8]) -> CallbackResult,
    {
        if let Some(tag) = self.tag.take() {
            if !self.buf.is_empty() {
                let control = emit(tag, &self.buf)?;
                self.buf.clear();
                return Ok(control);
            }
        }
        Ok(Control::Continue)
    }
}
