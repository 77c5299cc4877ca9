//! The one-shot "collect" convenience mode: parse a complete in-memory body
//! into a name-keyed tree of fields and files, without writing a
//! [`Callbacks`] implementation by hand.

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};

use crate::callbacks::{CallbackResult, Callbacks, Control};
use crate::config::{CollectOptions, ProgressSignal};
use crate::error::{ErrorKind, ParserError};
use crate::headers::RawHeaders;
use crate::parser::{Parser, ParserOptions};

/// A single collected part's body, plus the headers it arrived with.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    /// The part's raw, unmodified body.
    pub bytes: Bytes,
    /// The `filename` parameter of `Content-Disposition`, if any.
    pub filename: Option<String>,
    /// The `Content-Type` header, if any.
    pub content_type: Option<String>,
}

/// The result of collecting one named part, or a nested `multipart/*` body.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A plain form field decoded as UTF-8. Parts whose bytes aren't valid
    /// UTF-8 are always collected as [`Value::File`] instead.
    Field(String),
    /// A file (or a non-UTF-8 field): the part's raw bytes plus metadata.
    File(FilePart),
    /// More than one part shared the same `name`, or a `multipart/*`
    /// part's own parts, collected in order of appearance.
    Many(Vec<Value>),
}

/// Parse `body` as a complete `multipart/form-data` message and collect it
/// into a name-keyed map of [`Value`]s.
///
/// This is a convenience wrapper around [`Parser`] for callers who want a
/// materialized result rather than a streaming callback interface; it holds
/// the entire body, and every part's bytes, in memory at once.
pub fn collect(body: &[u8], options: CollectOptions<'_>) -> Result<HashMap<String, Value>, ParserError> {
    let chunk_size = options.chunk_size.max(1);
    let max_nesting_depth = options.max_nesting_depth;
    let recurse_nested = options.recurse_nested;
    let mut on_progress = options.on_progress;

    let callbacks = CollectCallbacks::new(recurse_nested, max_nesting_depth, 0);
    let parser_options = ParserOptions::new(options.boundary).max_memory(options.max_memory);
    let mut parser = Parser::new(parser_options, callbacks)?;

    let total = body.len() as u64;
    let mut parsed = 0u64;

    for chunk in body.chunks(chunk_size) {
        let consumed = parser.execute(chunk);
        parsed += consumed as u64;

        if let Some(err) = parser.error() {
            return Err(clone_fatal(err));
        }

        if consumed < chunk.len() {
            // execute never under-consumes unless paused, and nothing in
            // CollectCallbacks ever pauses.
            return Err(ParserError::new(ErrorKind::InvalidState));
        }

        if let Some(on_progress) = on_progress.as_mut() {
            let percent = if total == 0 { 100 } else { (parsed * 100 / total) as u8 };
            if on_progress(parsed, total, percent) == ProgressSignal::Abort {
                return Err(ParserError::new(ErrorKind::Interrupted));
            }
        }
    }

    if !parser.is_complete() {
        return Err(ParserError::new(ErrorKind::InvalidState));
    }

    Ok(parser.into_callbacks().finish())
}

fn clone_fatal(err: &ParserError) -> ParserError {
    ParserError::new(err.kind())
}

struct PendingPart {
    headers: Vec<(Bytes, Bytes)>,
    field: BytesMut,
    value: BytesMut,
    have_value: bool,
    body: BytesMut,
}

impl PendingPart {
    fn new() -> Self {
        Self {
            headers: Vec::new(),
            field: BytesMut::new(),
            value: BytesMut::new(),
            have_value: false,
            body: BytesMut::new(),
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
}

struct CollectCallbacks {
    recurse_nested: bool,
    max_nesting_depth: u32,
    depth: u32,
    part: PendingPart,
    entries: Vec<(String, Value)>,
    unnamed_index: usize,
}

impl CollectCallbacks {
    fn new(recurse_nested: bool, max_nesting_depth: u32, depth: u32) -> Self {
        Self {
            recurse_nested,
            max_nesting_depth,
            depth,
            part: PendingPart::new(),
            entries: Vec::new(),
            unnamed_index: 0,
        }
    }

    fn finish(self) -> HashMap<String, Value> {
        let mut map: HashMap<String, Value> = HashMap::new();
        for (name, value) in self.entries {
            match map.remove(&name) {
                None => {
                    map.insert(name, value);
                }
                Some(Value::Many(mut existing)) => {
                    existing.push(value);
                    map.insert(name, Value::Many(existing));
                }
                Some(existing) => {
                    map.insert(name, Value::Many(vec![existing, value]));
                }
            }
        }
        map
    }
}

impl Callbacks for CollectCallbacks {
    fn on_part_data_begin(&mut self) -> CallbackResult {
        self.part = PendingPart::new();
        Ok(Control::Continue)
    }

    fn on_header_field(&mut self, data: &[u8]) -> CallbackResult {
        if self.part.have_value {
            self.part.finish_header();
        }
        self.part.field.extend_from_slice(data);
        Ok(Control::Continue)
    }

    fn on_header_value(&mut self, data: &[u8]) -> CallbackResult {
        self.part.have_value = true;
        self.part.value.extend_from_slice(data);
        Ok(Control::Continue)
    }

    fn on_headers_complete(&mut self) -> CallbackResult {
        self.part.finish_header();
        Ok(Control::Continue)
    }

    fn on_part_data(&mut self, data: &[u8]) -> CallbackResult {
        self.part.body.extend_from_slice(data);
        Ok(Control::Continue)
    }

    fn on_part_data_end(&mut self) -> CallbackResult {
        let raw = RawHeaders::new(std::mem::take(&mut self.part.headers));
        let body = self.part.body.split().freeze();
        self.unnamed_index += 1;

        let (name, filename, content_type) = match raw.parse() {
            Ok(headers) => (headers.name, headers.filename, headers.content_type),
            Err(_) => (self.unnamed_index.to_string(), None, None),
        };

        let is_nested = self.recurse_nested
            && self.depth < self.max_nesting_depth
            && content_type
                .as_deref()
                .map(|ct| ct.trim_start().starts_with("multipart/"))
                .unwrap_or(false);

        if is_nested {
            if let Some(boundary) = content_type
                .as_deref()
                .and_then(|ct| extract_boundary(ct))
            {
                if let Ok(nested) = collect_nested(&body, boundary.as_bytes(), self.depth + 1, self.recurse_nested, self.max_nesting_depth)
                {
                    self.entries.push((name, Value::Many(nested)));
                    return Ok(Control::Continue);
                }
            }
        }

        let value = match (filename.is_none(), std::str::from_utf8(&body)) {
            (true, Ok(text)) => Value::Field(text.to_string()),
            _ => Value::File(FilePart {
                bytes: body,
                filename,
                content_type,
            }),
        };
        self.entries.push((name, value));
        Ok(Control::Continue)
    }

    fn on_body_end(&mut self) -> CallbackResult {
        Ok(Control::Continue)
    }
}

fn extract_boundary(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let param = param.trim();
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("boundary") {
            Some(value.trim_matches(|c: char| c.is_whitespace() || c == '"').to_string())
        } else {
            None
        }
    })
}

fn collect_nested(
    body: &[u8],
    boundary: &[u8],
    depth: u32,
    recurse_nested: bool,
    max_nesting_depth: u32,
) -> Result<Vec<Value>, ParserError> {
    let callbacks = CollectCallbacks::new(recurse_nested, max_nesting_depth, depth);
    let parser_options = ParserOptions::new(boundary);
    let mut parser = Parser::new(parser_options, callbacks)?;

    let consumed = parser.execute(body);
    if let Some(err) = parser.error() {
        return Err(clone_fatal(err));
    }
    if consumed != body.len() || !parser.is_complete() {
        return Err(ParserError::new(ErrorKind::InvalidState));
    }

    let map = parser.into_callbacks().finish();
    Ok(map.into_values().collect())
}
