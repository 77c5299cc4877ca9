//! Shared test helpers: a recording `Callbacks` implementation and a
//! fastrand-driven chunk splitter, used across the integration test suite.

use multipart_machine::{CallbackResult, Callbacks, Control};

/// One recorded part: its headers, in arrival order, and its full body.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RecordedPart {
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Records every part the parser produces, concatenating whatever pieces
/// each byte-bearing callback is invoked with.
#[derive(Default)]
pub struct Recorder {
    pub parts: Vec<RecordedPart>,
    pub body_ended: bool,
    field: Vec<u8>,
    value: Vec<u8>,
    have_value: bool,
}

impl Recorder {
    fn finish_header(&mut self) {
        if self.have_value || !self.field.is_empty() {
            let part = self.parts.last_mut().expect("header callback outside a part");
            part.headers.push((
                String::from_utf8_lossy(&self.field).into_owned(),
                String::from_utf8_lossy(&self.value).into_owned(),
            ));
        }
        self.field.clear();
        self.value.clear();
        self.have_value = false;
    }
}

impl Callbacks for Recorder {
    fn on_part_data_begin(&mut self) -> CallbackResult {
        self.parts.push(RecordedPart::default());
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
        Ok(Control::Continue)
    }

    fn on_part_data(&mut self, data: &[u8]) -> CallbackResult {
        self.parts
            .last_mut()
            .expect("part data outside a part")
            .body
            .extend_from_slice(data);
        Ok(Control::Continue)
    }

    fn on_part_data_end(&mut self) -> CallbackResult {
        Ok(Control::Continue)
    }

    fn on_body_end(&mut self) -> CallbackResult {
        self.body_ended = true;
        Ok(Control::Continue)
    }
}

/// Split `data` into a random sequence of non-empty chunks covering it
/// exactly, for chunk-boundary-invariance tests.
pub fn random_chunks(data: &[u8]) -> Vec<Vec<u8>> {
    let mut chunks = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let take = fastrand::usize(1..=rest.len());
        let (chunk, tail) = rest.split_at(take);
        chunks.push(chunk.to_vec());
        rest = tail;
    }
    chunks
}

/// Split `data` into one chunk per byte.
pub fn byte_at_a_time(data: &[u8]) -> Vec<Vec<u8>> {
    data.iter().map(|&b| vec![b]).collect()
}

/// Route the parser's `log::debug!` trail to the test harness's captured
/// output when `RUST_LOG` is set. Safe to call from every test; only the
/// first call in a process actually installs the logger.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
