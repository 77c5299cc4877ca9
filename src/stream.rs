//! An optional `futures_core::Stream` front-end over the push-based
//! [`crate::Parser`], for callers who'd rather `.await` events than
//! implement [`crate::Callbacks`] directly.
//!
//! Unlike the sans-io core, this front-end cannot be zero-copy: queued
//! events must outlive the `execute` call that produced them, so every
//! byte-bearing event owns a fresh copy of its data.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures_core::stream::{FusedStream, Stream};
use pin_project_lite::pin_project;

use crate::callbacks::{CallbackResult, Callbacks, Control};
use crate::error::ErrorKind;
use crate::headers::RawHeaders;
use crate::parser::{Parser, ParserOptions};

/// How many events may sit in the internal queue before the parser is
/// cooperatively paused to apply backpressure to the input stream.
const EVENT_QUEUE_CAP: usize = 32;

/// One multipart event, owning its data.
#[derive(Debug)]
pub enum Event {
    /// A new part's headers have been fully read.
    NewPart {
        /// The part's unparsed headers.
        headers: RawHeaders,
    },
    /// A chunk of the current part's body.
    Part(Bytes),
    /// The current part's body has ended.
    PartEnd,
}

struct QueueCallbacks {
    queue: VecDeque<Event>,
    headers: Vec<(Bytes, Bytes)>,
    field: BytesMut,
    value: BytesMut,
    have_value: bool,
}

impl QueueCallbacks {
    fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            headers: Vec::new(),
            field: BytesMut::new(),
            value: BytesMut::new(),
            have_value: false,
        }
    }

    fn finish_header(&mut self) {
        if self.have_value || !self.field.is_empty() {
            let name = self.field.split().freeze();
            let value = self.value.split().freeze();
            self.headers.push((name, value));
        }
        self.have_value = false;
    }

    fn push(&mut self, event: Event) -> CallbackResult {
        self.queue.push_back(event);
        if self.queue.len() >= EVENT_QUEUE_CAP {
            Ok(Control::Pause)
        } else {
            Ok(Control::Continue)
        }
    }
}

impl Callbacks for QueueCallbacks {
    fn on_part_data_begin(&mut self) -> CallbackResult {
        self.headers.clear();
        Ok(Control::Continue)
    }

    fn on_header_field(&mut self, data: &[u8]) -> CallbackResult {
        if self.have_value {
            self.finish_header();
        }
        self.field.extend_from_slice(data);
        Ok(Control::Continue)
    }

    fn on_header_value(&mut self, data: &[u8]) -> CallbackResult {
        self.have_value = true;
        self.value.extend_from_slice(data);
        Ok(Control::Continue)
    }

    fn on_headers_complete(&mut self) -> CallbackResult {
        self.finish_header();
        let headers = RawHeaders::new(std::mem::take(&mut self.headers));
        self.push(Event::NewPart { headers })
    }

    fn on_part_data(&mut self, data: &[u8]) -> CallbackResult {
        self.push(Event::Part(Bytes::copy_from_slice(data)))
    }

    fn on_part_data_end(&mut self) -> CallbackResult {
        self.push(Event::PartEnd)
    }
}

pin_project! {
    /// Adapts a `Stream<Item = io::Result<Bytes>>` of raw body chunks into
    /// a `Stream<Item = io::Result<Event>>` of multipart events.
    pub struct FormData<S> {
        #[pin]
        stream: S,
        parser: Parser<QueueCallbacks>,
        stream_done: bool,
        // Bytes from the most recently polled chunk that `execute` hasn't
        // consumed yet, because the parser paused for backpressure
        // mid-chunk. Re-fed before pulling a new chunk from `stream`.
        pending: Bytes,
    }
}

impl<S> FormData<S> {
    /// Wrap `stream`, splitting it on `boundary`.
    pub fn new(stream: S, boundary: &str) -> Result<Self, crate::ParserError> {
        let parser = Parser::new(ParserOptions::new(boundary.as_bytes()), QueueCallbacks::new())?;
        Ok(Self {
            stream,
            parser,
            stream_done: false,
            pending: Bytes::new(),
        })
    }
}

impl<S> Stream for FormData<S>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    type Item = io::Result<Event>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(event) = this.parser.callbacks_mut().queue.pop_front() {
                if this.parser.callbacks_mut().queue.is_empty() {
                    this.parser.resume();
                }
                return Poll::Ready(Some(Ok(event)));
            }

            if let Some(err) = this.parser.error() {
                if err.kind() != ErrorKind::Paused {
                    return Poll::Ready(Some(Err(io::Error::new(io::ErrorKind::Other, err.to_string()))));
                }
            }

            if !this.pending.is_empty() {
                let pending = std::mem::take(this.pending);
                let consumed = this.parser.execute(&pending);
                *this.pending = pending.slice(consumed..);
                continue;
            }

            if *this.stream_done {
                return Poll::Ready(None);
            }

            match this.stream.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(bytes))) => {
                    let consumed = this.parser.execute(&bytes);
                    *this.pending = bytes.slice(consumed..);
                }
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Some(Err(err))),
                Poll::Ready(None) => {
                    *this.stream_done = true;
                }
            }
        }
    }
}

impl<S> FusedStream for FormData<S>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    fn is_terminated(&self) -> bool {
        self.stream_done && self.parser.is_complete()
    }
}
