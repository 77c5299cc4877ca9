//! The callback contract: seven event handlers with default no-op bodies,
//! and the cooperative pause/abort return value they share.

use crate::error::CallbackError;

/// What a callback wants the dispatch loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Keep parsing.
    Continue,
    /// Cooperatively pause. `execute`/`feed` will return the number of
    /// bytes consumed up to and including the byte that triggered this
    /// callback; [`crate::Parser::error`] will report
    /// [`crate::ErrorKind::Paused`] until `reset` or `resume`.
    Pause,
}

/// The result type every callback method returns: `Ok(Control)` on success,
/// or `Err` to signal a host-language error, captured by the parser as
/// [`crate::ErrorKind::CallbackError`].
pub type CallbackResult = Result<Control, CallbackError>;

/// The seven multipart parsing events, as default no-op trait methods.
///
/// This is the Rust realization of what would be a function-pointer vtable
/// plus an opaque `void *user_data` in a C-style API: implementors hold
/// whatever state they need directly as fields, since `Self` already plays
/// the role the `user_data` pointer would.
///
/// All byte-bearing methods may be invoked multiple times per logical
/// field; implementations MUST concatenate the slices, in call order, to
/// reconstruct the full value. Slices passed to these methods borrow the
/// buffer given to the triggering `execute`/`feed` call and MUST NOT be
/// retained past the method's return.
pub trait Callbacks {
    /// A new part has begun.
    fn on_part_data_begin(&mut self) -> CallbackResult {
        Ok(Control::Continue)
    }

    /// Bytes of a header field (name).
    fn on_header_field(&mut self, _data: &[u8]) -> CallbackResult {
        Ok(Control::Continue)
    }

    /// Bytes of a header value.
    fn on_header_value(&mut self, _data: &[u8]) -> CallbackResult {
        Ok(Control::Continue)
    }

    /// The blank line ending this part's headers has been consumed.
    fn on_headers_complete(&mut self) -> CallbackResult {
        Ok(Control::Continue)
    }

    /// Bytes of the current part's body.
    fn on_part_data(&mut self, _data: &[u8]) -> CallbackResult {
        Ok(Control::Continue)
    }

    /// The current part's body has ended.
    fn on_part_data_end(&mut self) -> CallbackResult {
        Ok(Control::Continue)
    }

    /// The final boundary has been consumed; no further parts follow.
    fn on_body_end(&mut self) -> CallbackResult {
        Ok(Control::Continue)
    }
}

/// A [`Callbacks`] implementation that does nothing and never pauses.
/// Useful for validating a body's grammar without collecting its contents.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallbacks;

impl Callbacks for NoopCallbacks {}
