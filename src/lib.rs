//! # multipart-machine
//!
//! A streaming, binary-safe `multipart/form-data` parser built around a
//! byte-dispatch state machine, in the tradition of `http_parser` and the
//! classic C `multipart-parser`: [`Parser::execute`]/[`Parser::feed`] accept
//! arbitrary chunk boundaries, down to a single byte at a time, and the
//! result never depends on how the input was split.
//!
//! Parsing is driven entirely by callbacks (see [`Callbacks`]); the parser
//! itself performs no I/O. Slices passed to byte-bearing callbacks borrow
//! the buffer given to the triggering `execute` call and are never copied,
//! except for a small internal window (bounded by the boundary's length)
//! used to hold a tentative boundary match that later turns out not to be
//! one.
//!
//! ## Quick start
//!
//! ```rust
//! use multipart_machine::{Callbacks, CallbackResult, Control, Parser, ParserOptions};
//!
//! #[derive(Default)]
//! struct CountParts(u64);
//!
//! impl Callbacks for CountParts {
//!     fn on_part_data_begin(&mut self) -> CallbackResult {
//!         self.0 += 1;
//!         Ok(Control::Continue)
//!     }
//! }
//!
//! let body = "--X\r\ncontent-disposition: form-data; name=\"a\"\r\n\r\n1\r\n--X--".as_bytes();
//! let mut parser = Parser::new(ParserOptions::new(b"X"), CountParts::default())?;
//! let consumed = parser.execute(body);
//! assert_eq!(consumed, body.len());
//! assert!(parser.is_complete());
//! assert_eq!(parser.callbacks().0, 1);
//! # Ok::<(), multipart_machine::ParserError>(())
//! ```
//!
//! For a ready-made materialized result, see [`collect::collect`] (enabled
//! by the default `collect` feature). For an async `Stream` front-end over
//! a byte stream, see [`stream`] (enabled by the `futures` feature).

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

mod boundary;
mod buffer;
mod callbacks;
#[cfg(feature = "collect")]
#[cfg_attr(docsrs, doc(cfg(feature = "collect")))]
pub mod collect;
#[cfg(feature = "collect")]
#[cfg_attr(docsrs, doc(cfg(feature = "collect")))]
pub mod config;
mod error;
pub mod headers;
mod parser;
mod state;
mod stats;
#[cfg(feature = "futures")]
#[cfg_attr(docsrs, doc(cfg(feature = "futures")))]
pub mod stream;

pub use callbacks::{CallbackResult, Callbacks, Control, NoopCallbacks};
pub use error::{CallbackError, ErrorKind, ParserError};
pub use parser::{Parser, ParserOptions};
pub use stats::Statistics;

#[cfg(feature = "collect")]
pub use collect::{collect, FilePart, Value};
#[cfg(feature = "collect")]
pub use config::{CollectOptions, ProgressSignal};
