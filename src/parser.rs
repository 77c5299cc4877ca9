//! The byte-dispatch state machine: the core of this crate.
//!
//! [`Parser::execute`]/[`Parser::feed`] consume arbitrary byte chunks — down
//! to a single byte at a time — and drive a [`Callbacks`] implementation
//! through the seven multipart events, while only ever copying input bytes
//! into a small internal "lookbehind" window bounded by the delimiter's
//! length (see the module-level discussion in `lib.rs`).

use crate::buffer::{CallbackBuffer, FieldTag};
use crate::boundary::BoundaryTable;
use crate::callbacks::{CallbackResult, Callbacks, Control};
use crate::error::{ErrorKind, ParserError};
use crate::state::State;
use crate::stats::Statistics;

const CR: u8 = b'\r';
const LF: u8 = b'\n';
const SP: u8 = b' ';
const HTAB: u8 = b'\t';

fn is_header_token_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'_'
}

/// Construction-time options for a [`Parser`].
#[derive(Debug, Clone)]
pub struct ParserOptions<'a> {
    /// The multipart boundary, without the leading `--`. Must be non-empty.
    pub boundary: &'a [u8],
    /// A soft cap, in bytes, on the sum of bytes delivered to the three
    /// accumulating callbacks since the last `reset`. `0` means unlimited.
    pub max_memory: usize,
    /// If non-zero, enables the callback buffer (see [`crate::buffer`])
    /// with this capacity.
    pub buffer_size: usize,
}

impl<'a> ParserOptions<'a> {
    /// Options with a boundary and no memory cap or buffering.
    pub fn new(boundary: &'a [u8]) -> Self {
        Self {
            boundary,
            max_memory: 0,
            buffer_size: 0,
        }
    }

    /// Set the memory cap.
    pub fn max_memory(mut self, max_memory: usize) -> Self {
        self.max_memory = max_memory;
        self
    }

    /// Set the callback buffer capacity.
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }
}

fn invoke<C: Callbacks>(callbacks: &mut C, tag: FieldTag, data: &[u8]) -> CallbackResult {
    match tag {
        FieldTag::HeaderField => callbacks.on_header_field(data),
        FieldTag::HeaderValue => callbacks.on_header_value(data),
        FieldTag::PartData => callbacks.on_part_data(data),
    }
}

/// The streaming `multipart/form-data` parser.
///
/// See the crate-level documentation for the event ordering and the
/// pause/error/reset contract.
pub struct Parser<C: Callbacks> {
    boundary: BoundaryTable,
    state: State,
    /// Progress matching whatever delimiter the current state cares about;
    /// reused as a tiny sub-state counter (0/1/2) once a full boundary has
    /// already been matched and we're only deciding CRLF-vs-`--`.
    index: usize,
    /// Bytes of a tentative boundary match that must be re-emitted as part
    /// data if the match fails. Never exceeds the delimiter's length.
    lookbehind: Vec<u8>,
    /// Start offset, within the *current* `execute` call's buffer, of the
    /// byte run being accumulated for the active header/data callback.
    mark: Option<usize>,
    callbacks: C,
    buffer: Option<CallbackBuffer>,
    buffer_size: usize,
    max_memory: usize,
    error: Option<ParserError>,
    stats: Statistics,
    current_part_size: u64,
    /// Set once `on_body_end` has been invoked. The grammar is complete at
    /// that point regardless of how much of the optional trailing CRLF or
    /// epilogue has arrived; tracked separately from `state` because a
    /// terminated body with no trailing CRLF never visits `State::BodyEnd`.
    body_ended: bool,
}

impl<C: Callbacks> Parser<C> {
    /// Construct a new parser from `options` and a `Callbacks` implementation.
    pub fn new(options: ParserOptions<'_>, callbacks: C) -> Result<Self, ParserError> {
        let boundary = BoundaryTable::new(options.boundary)?;
        let buffer = if options.buffer_size > 0 {
            Some(CallbackBuffer::new(options.buffer_size))
        } else {
            None
        };

        Ok(Self {
            boundary,
            state: State::Preamble,
            index: 0,
            lookbehind: Vec::new(),
            mark: None,
            callbacks,
            buffer,
            buffer_size: options.buffer_size,
            max_memory: options.max_memory,
            error: None,
            stats: Statistics {
                max_memory: options.max_memory,
                ..Statistics::default()
            },
            current_part_size: 0,
            body_ended: false,
        })
    }

    /// The last error reported, or `None` if the parser is healthy.
    pub fn error(&self) -> Option<&ParserError> {
        self.error.as_ref()
    }

    /// Current statistics snapshot.
    pub fn statistics(&self) -> Statistics {
        self.stats
    }

    /// Access the callback implementation.
    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    /// Mutably access the callback implementation.
    pub fn callbacks_mut(&mut self) -> &mut C {
        &mut self.callbacks
    }

    /// Consume the parser, returning the callback implementation.
    pub fn into_callbacks(self) -> C {
        self.callbacks
    }

    /// Whether the body has been fully parsed (the final boundary and its
    /// trailing epilogue, if any, have been consumed).
    pub fn is_complete(&self) -> bool {
        self.body_ended
    }

    /// If paused (a callback returned [`Control::Pause`]), clear the pause
    /// flag in place without resetting any other state. The caller is then
    /// responsible for re-feeding whatever bytes of the original chunk
    /// were not reported as consumed.
    pub fn resume(&mut self) {
        if matches!(self.error.as_ref().map(|e| e.kind()), Some(ErrorKind::Paused)) {
            self.error = None;
        }
    }

    /// Reinitialize the parser to its just-constructed state, optionally
    /// installing a new boundary. Reuses the existing boundary allocation;
    /// fails (leaving the parser untouched) if `new_boundary` is longer
    /// than the originally configured boundary.
    pub fn reset(&mut self, new_boundary: Option<&[u8]>) -> Result<(), ParserError> {
        if let Some(boundary) = new_boundary {
            self.boundary.reset(boundary)?;
        }

        self.state = State::Preamble;
        self.index = 0;
        self.lookbehind.clear();
        self.mark = None;
        if self.buffer_size > 0 {
            self.buffer = Some(CallbackBuffer::new(self.buffer_size));
        }
        self.error = None;
        self.current_part_size = 0;
        self.body_ended = false;
        self.stats = Statistics {
            max_memory: self.max_memory,
            ..Statistics::default()
        };

        log::debug!("parser reset");
        Ok(())
    }

    /// Feed a chunk of input. Returns the number of bytes consumed; this
    /// equals `data.len()` unless a callback paused or an error occurred.
    pub fn execute(&mut self, data: &[u8]) -> usize {
        if let Some(err) = &self.error {
            log::debug!("execute called while errored: {}", err.kind());
            return 0;
        }

        let consumed = self.run(data);
        self.stats.total_bytes += consumed as u64;
        consumed
    }

    /// Alias for [`Parser::execute`], for streaming call sites.
    pub fn feed(&mut self, data: &[u8]) -> usize {
        self.execute(data)
    }

    fn fail(&mut self, kind: ErrorKind) {
        log::debug!("parser entering errored state: {}", kind);
        self.error = Some(ParserError::new(kind));
        self.state = State::Errored;
    }

    fn pause(&mut self) {
        self.error = Some(ParserError::new(ErrorKind::Paused));
    }

    /// Dispatch `data` to the callback (or the coalescing buffer) for `tag`,
    /// tracking the memory cap. Does not touch `self.mark`/`self.state`.
    fn dispatch_bytes(&mut self, tag: FieldTag, data: &[u8]) -> Result<Control, ParserError> {
        if data.is_empty() {
            return Ok(Control::Continue);
        }

        if self.max_memory > 0 && self.stats.current_memory + data.len() > self.max_memory {
            return Err(ParserError::new(ErrorKind::MemoryLimitExceeded));
        }
        self.stats.current_memory += data.len();
        if tag == FieldTag::PartData {
            self.current_part_size += data.len() as u64;
        }

        let Parser {
            callbacks, buffer, ..
        } = self;

        let control = match buffer {
            Some(buffer) => buffer.feed(tag, data, |tag, chunk| invoke(callbacks, tag, chunk))?,
            None => invoke(callbacks, tag, data)?,
        };
        Ok(control)
    }

    /// Force the callback buffer (if any) to flush, regardless of tag.
    /// Called whenever a logical field ends.
    fn flush_buffer(&mut self) -> Result<Control, ParserError> {
        let Parser {
            callbacks, buffer, ..
        } = self;
        match buffer {
            Some(buffer) => Ok(buffer.end_field(|tag, chunk| invoke(callbacks, tag, chunk))?),
            None => Ok(Control::Continue),
        }
    }

    fn call(&mut self, call: impl FnOnce(&mut C) -> CallbackResult) -> Result<Control, ParserError> {
        call(&mut self.callbacks).map_err(ParserError::callback)
    }

    /// The main byte-dispatch loop. Returns the number of bytes of `data`
    /// consumed.
    fn run(&mut self, data: &[u8]) -> usize {
        let len = data.len();
        let mut i = 0;

        macro_rules! halt {
            ($consumed:expr) => {{
                return $consumed;
            }};
        }

        macro_rules! apply {
            ($result:expr) => {
                match $result {
                    Ok(Control::Continue) => {}
                    Ok(Control::Pause) => {
                        self.pause();
                        halt!(i + 1);
                    }
                    Err(err) => {
                        log::debug!("callback error: {}", err);
                        self.state = State::Errored;
                        self.error = Some(err);
                        halt!(i);
                    }
                }
            };
        }

        while i < len {
            let c = data[i];

            match self.state {
                State::Errored => halt!(i),

                State::Preamble | State::FirstBoundary => {
                    let delim = self.boundary.delimiter_no_crlf();
                    if delim[self.index] == c {
                        self.index += 1;
                        if self.index == delim.len() {
                            self.index = 0;
                            self.state = State::AfterBoundary;
                        } else {
                            self.state = State::FirstBoundary;
                        }
                    } else {
                        self.index = kmp_fallback(self.boundary.failure_first(), self.index, c, delim);
                        self.state = if self.index == 0 {
                            State::Preamble
                        } else {
                            State::FirstBoundary
                        };
                    }
                }

                State::AfterBoundary | State::PartDataBoundary => {
                    match self.boundary_decision(c) {
                        Ok(Some(result)) => apply!(result),
                        Ok(None) => {}
                        Err(kind) => {
                            self.fail(kind);
                            halt!(i);
                        }
                    }
                }

                State::HeaderFieldStart => {
                    if c == CR {
                        self.state = State::HeadersAlmostDone;
                    } else if c == SP || c == HTAB {
                        self.fail(ErrorKind::InvalidHeaderField);
                        halt!(i);
                    } else if is_header_token_byte(c) {
                        self.mark = Some(i);
                        self.state = State::HeaderField;
                    } else {
                        self.fail(ErrorKind::InvalidHeaderField);
                        halt!(i);
                    }
                }

                State::HeaderField => {
                    if c == b':' {
                        let start = self.mark.take().unwrap_or(i);
                        self.state = State::HeaderValueStart;
                        let result = self.dispatch_bytes(FieldTag::HeaderField, &data[start..i]);
                        match result {
                            Ok(Control::Continue) => {}
                            other => apply!(other),
                        }
                        apply!(self.flush_buffer());
                    } else if !is_header_token_byte(c) {
                        let start = self.mark.take().unwrap_or(i);
                        let _ = self.dispatch_bytes(FieldTag::HeaderField, &data[start..i]);
                        self.fail(ErrorKind::InvalidHeaderField);
                        halt!(i);
                    } else if self.mark.is_none() {
                        self.mark = Some(i);
                    }
                }

                State::HeaderValueStart => {
                    if c == SP || c == HTAB {
                        // skip
                    } else if c == CR {
                        self.state = State::HeaderValueAlmostDone;
                    } else {
                        self.mark = Some(i);
                        self.state = State::HeaderValue;
                    }
                }

                State::HeaderValue => {
                    if c == CR {
                        let start = self.mark.take().unwrap_or(i);
                        self.state = State::HeaderValueAlmostDone;
                        let result = self.dispatch_bytes(FieldTag::HeaderValue, &data[start..i]);
                        match result {
                            Ok(Control::Continue) => {}
                            other => apply!(other),
                        }
                        apply!(self.flush_buffer());
                    } else if c == LF {
                        let start = self.mark.take().unwrap_or(i);
                        let _ = self.dispatch_bytes(FieldTag::HeaderValue, &data[start..i]);
                        self.fail(ErrorKind::InvalidHeaderValue);
                        halt!(i);
                    } else if self.mark.is_none() {
                        self.mark = Some(i);
                    }
                }

                State::HeaderValueAlmostDone => {
                    if c == LF {
                        self.state = State::HeaderFieldStart;
                    } else {
                        self.fail(ErrorKind::InvalidHeaderValue);
                        halt!(i);
                    }
                }

                State::HeadersAlmostDone => {
                    if c == LF {
                        self.current_part_size = 0;
                        self.state = State::PartData;
                        apply!(self.call(Callbacks::on_headers_complete));
                    } else {
                        self.fail(ErrorKind::InvalidHeaderValue);
                        halt!(i);
                    }
                }

                State::PartData => {
                    let delim = self.boundary.delimiter();
                    if c == delim[0] {
                        let start = self.mark.take();
                        self.lookbehind.clear();
                        self.lookbehind.push(c);
                        self.index = 1;
                        self.state = State::PartDataAlmostBoundary;
                        if let Some(start) = start {
                            apply!(self.dispatch_bytes(FieldTag::PartData, &data[start..i]));
                        }
                    } else if self.mark.is_none() {
                        self.mark = Some(i);
                    }
                }

                State::PartDataAlmostBoundary => {
                    let delim = self.boundary.delimiter();
                    if delim[self.index] == c {
                        self.lookbehind.push(c);
                        self.index += 1;
                        if self.index == delim.len() {
                            self.stats.record_part_complete(self.current_part_size);
                            self.lookbehind.clear();
                            self.index = 0;
                            self.state = State::PartDataBoundary;
                            apply!(self.call(Callbacks::on_part_data_end));
                        }
                    } else {
                        let old_index = self.index;
                        let failure = self.boundary.failure();
                        self.lookbehind.push(c);

                        let mut idx = old_index;
                        loop {
                            if idx == 0 {
                                break;
                            }
                            if delim[idx] == c {
                                break;
                            }
                            idx = failure[idx - 1];
                        }
                        if delim[idx] == c {
                            idx += 1;
                        }

                        let prefix_len = (old_index + 1) - idx;
                        let prefix: Vec<u8> = self.lookbehind[..prefix_len].to_vec();
                        self.lookbehind.drain(..prefix_len);
                        self.index = idx;
                        if self.index == 0 {
                            self.state = State::PartData;
                            // the retained suffix (now empty) leaves no mark;
                            // scanning for new data resumes at the next byte
                        }
                        apply!(self.dispatch_bytes(FieldTag::PartData, &prefix));
                    }
                }

                State::PartDataAlmostEnd => {
                    if c == b'-' {
                        self.body_ended = true;
                        self.state = State::PartDataEnd;
                        self.index = 0;
                        apply!(self.call(Callbacks::on_body_end));
                    } else {
                        self.fail(ErrorKind::InvalidBoundary);
                        halt!(i);
                    }
                }

                State::PartDataEnd => {
                    if self.index == 0 {
                        if c == CR {
                            self.index = 1;
                        } else {
                            self.state = State::BodyEnd;
                            continue; // redo this byte as epilogue
                        }
                    } else if c == LF {
                        self.index = 0;
                        self.state = State::BodyEnd;
                    } else {
                        self.index = 0;
                        self.state = State::BodyEnd;
                        continue; // redo this byte as epilogue
                    }
                }

                State::BodyEnd => {
                    // epilogue, silently discarded
                }
            }

            i += 1;
        }

        // Flush whatever mark is still open at the end of this call so the
        // next call's buffer can start fresh at index 0.
        if let Some(start) = self.mark.take() {
            let tag = match self.state {
                State::HeaderField => Some(FieldTag::HeaderField),
                State::HeaderValue => Some(FieldTag::HeaderValue),
                State::PartData => Some(FieldTag::PartData),
                _ => None,
            };
            if let Some(tag) = tag {
                if let Err(err) = self.dispatch_bytes(tag, &data[start..len]) {
                    self.state = State::Errored;
                    self.error = Some(err);
                    return len;
                }
                // A pause here can't be represented exactly (the whole tail
                // was already handed to the caller's buffer), so the most
                // truthful `consumed` count is the full chunk: every byte
                // really was read by the state machine.
            }
        }

        len
    }

    /// Shared decision logic for `AfterBoundary`/`PartDataBoundary`: having
    /// just matched a full `CRLF--boundary` (or the CRLF-less first one),
    /// is the next thing a new part (`CRLF`) or the end of the body (`--`)?
    fn boundary_decision(&mut self, c: u8) -> Result<Option<Result<Control, ParserError>>, ErrorKind> {
        match self.index {
            0 => {
                if c == CR {
                    self.index = 1;
                    Ok(None)
                } else if c == b'-' {
                    self.state = State::PartDataAlmostEnd;
                    self.index = 0;
                    Ok(None)
                } else {
                    Err(ErrorKind::InvalidBoundary)
                }
            }
            1 => {
                if c == LF {
                    self.index = 0;
                    self.state = State::HeaderFieldStart;
                    Ok(Some(self.call(Callbacks::on_part_data_begin)))
                } else {
                    Err(ErrorKind::InvalidBoundary)
                }
            }
            _ => unreachable!("boundary decision index out of range"),
        }
    }
}

/// Apply the KMP failure function on a mismatch at `pattern[index]`,
/// returning the new, possibly-zero match index for byte `c`.
fn kmp_fallback(failure: &[usize], index: usize, c: u8, pattern: &[u8]) -> usize {
    let mut idx = index;
    loop {
        if idx == 0 {
            break;
        }
        if pattern[idx] == c {
            break;
        }
        idx = failure[idx - 1];
    }
    if pattern[idx] == c {
        idx + 1
    } else {
        idx
    }
}
