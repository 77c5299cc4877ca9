//! Core state-machine tests: chunk-boundary invariance, binary safety,
//! pause/resume, reset/reuse, and the no-trailing-CRLF completion edge case.

mod common;

use common::{byte_at_a_time, init_logging, random_chunks, RecordedPart, Recorder};
use multipart_machine::{CallbackResult, Callbacks, Control, ErrorKind, NoopCallbacks, Parser, ParserOptions};

const BOUNDARY: &[u8] = b"X";

fn sample_body() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(b"--X\r\n");
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"a\"\r\n");
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(b"hello world");
    body.extend_from_slice(b"\r\n--X\r\n");
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"b\"; filename=\"f.bin\"\r\n");
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(&[0u8, 1, 2, 3, 0xff, 0xfe]);
    body.extend_from_slice(b"\r\n--X--\r\n");
    body
}

fn run_in_chunks(body: &[u8], chunks: &[Vec<u8>]) -> (Vec<RecordedPart>, bool) {
    let mut parser = Parser::new(ParserOptions::new(BOUNDARY), Recorder::default()).unwrap();
    let mut total_consumed = 0;
    for chunk in chunks {
        total_consumed += parser.execute(chunk);
    }
    assert_eq!(total_consumed, body.len(), "every byte must be consumed");
    assert!(parser.error().is_none());
    let recorder = parser.into_callbacks();
    (recorder.parts, recorder.body_ended)
}

#[test]
fn single_chunk_parses_two_parts() {
    let body = sample_body();
    let (parts, body_ended) = run_in_chunks(&body, &[body.clone()]);
    assert!(body_ended);
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].headers, vec![(
        "Content-Disposition".to_string(),
        "form-data; name=\"a\"".to_string(),
    )]);
    assert_eq!(parts[0].body, b"hello world");
    assert_eq!(parts[1].body, vec![0u8, 1, 2, 3, 0xff, 0xfe]);
}

#[test]
fn chunk_boundary_invariance() {
    let body = sample_body();
    let baseline = run_in_chunks(&body, &[body.clone()]);

    for _ in 0..64 {
        let chunks = random_chunks(&body);
        let observed = run_in_chunks(&body, &chunks);
        assert_eq!(observed.0, baseline.0);
        assert_eq!(observed.1, baseline.1);
    }
}

#[test]
fn byte_at_a_time_matches_whole_chunk() {
    let body = sample_body();
    let baseline = run_in_chunks(&body, &[body.clone()]);
    let observed = run_in_chunks(&body, &byte_at_a_time(&body));
    assert_eq!(observed, baseline);
}

#[test]
fn binary_transparency_with_boundary_lookalikes() {
    // Part data containing a near-miss of the delimiter: "\r\n--X" followed
    // by a byte that rules out a real boundary. The parser must recover the
    // wrongly tentative match and hand every byte back as part data.
    let mut body = Vec::new();
    body.extend_from_slice(b"--X\r\n\r\n");
    body.extend_from_slice(b"lead-in\r\n--Xtrailing\0still data");
    body.extend_from_slice(b"\r\n--X--");

    let mut parser = Parser::new(ParserOptions::new(BOUNDARY), Recorder::default()).unwrap();
    let consumed = parser.execute(&body);
    assert_eq!(consumed, body.len());
    assert!(parser.error().is_none());

    let recorder = parser.into_callbacks();
    assert_eq!(recorder.parts.len(), 1);
    assert_eq!(
        recorder.parts[0].body,
        b"lead-in\r\n--Xtrailing\0still data".to_vec()
    );
}

#[test]
fn completion_without_trailing_crlf() {
    // No CRLF (or epilogue) after the closing "--": is_complete() must not
    // depend on ever reaching the epilogue state.
    let mut body = Vec::new();
    body.extend_from_slice(b"--X\r\n\r\n");
    body.extend_from_slice(b"1");
    body.extend_from_slice(b"\r\n--X--");

    let mut parser = Parser::new(ParserOptions::new(BOUNDARY), NoopCallbacks).unwrap();
    let consumed = parser.execute(&body);
    assert_eq!(consumed, body.len());
    assert!(parser.is_complete());
}

#[test]
fn incomplete_body_is_not_complete() {
    let body = b"--X\r\n\r\npartial";
    let mut parser = Parser::new(ParserOptions::new(BOUNDARY), NoopCallbacks).unwrap();
    parser.execute(body);
    assert!(!parser.is_complete());
}

#[test]
fn one_byte_at_a_time_header_value_has_no_stray_cr() {
    // Regression against the classic "CR leaked into header value on
    // 1-byte feeding" defect: the CR that terminates a header value must
    // never be included in what's handed to `on_header_value`, regardless
    // of how the input is chunked.
    let body = b"--B\r\nContent-Type: text/plain\r\n\r\ndata\r\n--B--";
    let mut parser = Parser::new(ParserOptions::new(b"B"), Recorder::default()).unwrap();
    for &byte in body.iter() {
        let consumed = parser.execute(&[byte]);
        assert_eq!(consumed, 1);
    }
    assert!(parser.error().is_none());

    let recorder = parser.into_callbacks();
    assert_eq!(recorder.parts.len(), 1);
    assert_eq!(
        recorder.parts[0].headers,
        vec![("Content-Type".to_string(), "text/plain".to_string())]
    );
    assert_eq!(recorder.parts[0].body, b"data");
}

struct PauseAfterFirstHeaderValue {
    seen: usize,
}

impl Callbacks for PauseAfterFirstHeaderValue {
    fn on_header_value(&mut self, _data: &[u8]) -> CallbackResult {
        self.seen += 1;
        if self.seen == 1 {
            Ok(Control::Pause)
        } else {
            Ok(Control::Continue)
        }
    }
}

#[test]
fn pause_then_resume_continues_from_the_right_byte() {
    let body = sample_body();
    let mut parser = Parser::new(
        ParserOptions::new(BOUNDARY),
        PauseAfterFirstHeaderValue { seen: 0 },
    )
    .unwrap();

    let consumed = parser.execute(&body);
    assert!(consumed < body.len());
    assert_eq!(parser.error().map(|e| e.kind()), Some(ErrorKind::Paused));

    parser.resume();
    assert!(parser.error().is_none());

    let rest_consumed = parser.execute(&body[consumed..]);
    assert_eq!(consumed + rest_consumed, body.len());
    assert!(parser.is_complete());
}

struct PausingRecorder {
    recorder: Recorder,
    pause_after_part_data_calls: usize,
    part_data_calls: usize,
    paused_once: bool,
}

impl Callbacks for PausingRecorder {
    fn on_part_data_begin(&mut self) -> CallbackResult {
        self.recorder.on_part_data_begin()
    }

    fn on_header_field(&mut self, data: &[u8]) -> CallbackResult {
        self.recorder.on_header_field(data)
    }

    fn on_header_value(&mut self, data: &[u8]) -> CallbackResult {
        self.recorder.on_header_value(data)
    }

    fn on_headers_complete(&mut self) -> CallbackResult {
        self.recorder.on_headers_complete()
    }

    fn on_part_data(&mut self, data: &[u8]) -> CallbackResult {
        self.recorder.on_part_data(data)?;
        self.part_data_calls += 1;
        if !self.paused_once && self.part_data_calls == self.pause_after_part_data_calls {
            self.paused_once = true;
            return Ok(Control::Pause);
        }
        Ok(Control::Continue)
    }

    fn on_part_data_end(&mut self) -> CallbackResult {
        self.recorder.on_part_data_end()
    }

    fn on_body_end(&mut self) -> CallbackResult {
        self.recorder.on_body_end()
    }
}

#[test]
fn pause_then_reset_refeed_from_zero_matches_uninterrupted() {
    // Testable property: pausing at byte k, then reset + re-feeding from
    // byte 0, yields the same trace as an uninterrupted parse.
    let body = sample_body();

    let mut baseline = Parser::new(ParserOptions::new(BOUNDARY), Recorder::default()).unwrap();
    baseline.execute(&body);
    let baseline_parts = baseline.into_callbacks().parts;

    let mut parser = Parser::new(
        ParserOptions::new(BOUNDARY),
        PausingRecorder {
            recorder: Recorder::default(),
            pause_after_part_data_calls: 1,
            part_data_calls: 0,
            paused_once: false,
        },
    )
    .unwrap();

    let consumed = parser.execute(&body);
    assert!(consumed < body.len());
    assert_eq!(parser.error().map(|e| e.kind()), Some(ErrorKind::Paused));

    parser.reset(None).unwrap();
    let consumed_again = parser.execute(&body);
    assert_eq!(consumed_again, body.len());
    assert!(parser.is_complete());

    let callbacks = parser.into_callbacks();
    assert_eq!(callbacks.recorder.parts, baseline_parts);
}

#[test]
fn reset_reuses_allocation_for_shorter_or_equal_boundary() {
    let body_x = sample_body();
    let mut parser = Parser::new(ParserOptions::new(BOUNDARY), Recorder::default()).unwrap();
    parser.execute(&body_x);
    assert!(parser.is_complete());

    parser.reset(Some(b"Y")).expect("shorter boundary reuses capacity");

    let mut body_y = Vec::new();
    body_y.extend_from_slice(b"--Y\r\n\r\nhi\r\n--Y--");
    let consumed = parser.execute(&body_y);
    assert_eq!(consumed, body_y.len());
    assert!(parser.is_complete());
}

#[test]
fn reset_rejects_boundary_longer_than_original_capacity() {
    let mut parser = Parser::new(ParserOptions::new(b"X"), NoopCallbacks).unwrap();
    let err = parser.reset(Some(b"much-longer-boundary")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BoundaryTooLong);
}

#[test]
fn memory_cap_is_enforced_on_a_large_part_body() {
    let mut body = Vec::new();
    body.extend_from_slice(b"--X\r\n\r\n");
    body.extend_from_slice(&vec![b'a'; 1000]);
    body.extend_from_slice(b"\r\n--X--");

    let mut parser = Parser::new(
        ParserOptions::new(BOUNDARY).max_memory(500),
        Recorder::default(),
    )
    .unwrap();

    parser.execute(&body);
    assert_eq!(parser.error().map(|e| e.kind()), Some(ErrorKind::MemoryLimitExceeded));
    assert!(!parser.is_complete());
}

#[test]
fn empty_part_body_fires_no_part_data_callback() {
    let body = b"--X\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n\r\n--X--";
    let mut parser = Parser::new(ParserOptions::new(BOUNDARY), Recorder::default()).unwrap();
    parser.execute(body);

    let recorder = parser.into_callbacks();
    assert_eq!(recorder.parts.len(), 1);
    assert!(recorder.parts[0].body.is_empty());
    assert!(recorder.body_ended);
}

#[test]
fn near_match_diverging_at_the_last_byte_is_recovered_as_data() {
    // "\r\n--boundarX" matches the 11-byte delimiter prefix "\r\n--boundar"
    // before diverging on the final byte ('X' instead of 'y'), forcing the
    // KMP fallback to release the deferred bytes as part data.
    let mut body = Vec::new();
    body.extend_from_slice(b"--boundary\r\n\r\n");
    body.extend_from_slice(b"abc\r\n--boundarX more data");
    body.extend_from_slice(b"\r\n--boundary--");

    let mut parser = Parser::new(ParserOptions::new(b"boundary"), Recorder::default()).unwrap();
    let consumed = parser.execute(&body);
    assert_eq!(consumed, body.len());
    assert!(parser.is_complete());

    let recorder = parser.into_callbacks();
    assert_eq!(recorder.parts.len(), 1);
    assert_eq!(
        recorder.parts[0].body,
        b"abc\r\n--boundarX more data".to_vec()
    );
}

#[test]
fn invalid_header_field_byte_is_rejected() {
    init_logging();
    let body = b"--X\r\nBad Header: v\r\n\r\n\r\n--X--";
    let mut parser = Parser::new(ParserOptions::new(BOUNDARY), NoopCallbacks).unwrap();
    parser.execute(body);
    assert_eq!(parser.error().map(|e| e.kind()), Some(ErrorKind::InvalidHeaderField));
}
