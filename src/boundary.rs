//! The boundary table: the literal delimiter plus a KMP-style failure
//! function, enabling single-pass detection of `CRLF--<boundary>` with
//! bounded look-back.

use crate::error::{ErrorKind, ParserError};

/// Holds the configured boundary's delimiter bytes and its failure
/// function, reused across [`crate::Parser::reset`] calls.
#[derive(Debug, Clone)]
pub(crate) struct BoundaryTable {
    /// `"\r\n--" ++ boundary`, length `n + 4`.
    delimiter: Vec<u8>,
    /// KMP failure function over `delimiter`, same length.
    failure: Vec<usize>,
    /// KMP failure function over `delimiter[2..]` (`"--" ++ boundary`),
    /// used only for matching the very first, CRLF-less delimiter.
    failure_first: Vec<usize>,
    /// The longest boundary this table's allocation was built for; a
    /// `reset` with a longer boundary must fail rather than reallocate.
    capacity: usize,
}

impl BoundaryTable {
    /// Build a new table for `boundary`. Fails on an empty boundary.
    pub(crate) fn new(boundary: &[u8]) -> Result<Self, ParserError> {
        if boundary.is_empty() {
            return Err(ParserError::new(ErrorKind::InvalidBoundary));
        }

        let capacity = boundary.len();
        let mut table = Self {
            delimiter: Vec::with_capacity(capacity + 4),
            failure: Vec::with_capacity(capacity + 4),
            failure_first: Vec::with_capacity(capacity + 2),
            capacity,
        };
        table.install(boundary);
        Ok(table)
    }

    /// Reinstall a (possibly different, but not longer) boundary, reusing
    /// the existing allocation.
    pub(crate) fn reset(&mut self, boundary: &[u8]) -> Result<(), ParserError> {
        if boundary.is_empty() {
            return Err(ParserError::new(ErrorKind::InvalidBoundary));
        }
        if boundary.len() > self.capacity {
            return Err(ParserError::new(ErrorKind::BoundaryTooLong));
        }

        self.install(boundary);
        Ok(())
    }

    fn install(&mut self, boundary: &[u8]) {
        self.delimiter.clear();
        self.delimiter.extend_from_slice(b"\r\n--");
        self.delimiter.extend_from_slice(boundary);

        self.failure.clear();
        self.failure.resize(self.delimiter.len(), 0);
        compute_failure_function(&self.delimiter, &mut self.failure);

        self.failure_first.clear();
        self.failure_first.resize(self.delimiter.len() - 2, 0);
        compute_failure_function(&self.delimiter[2..], &mut self.failure_first);

        log::debug!(
            "boundary table installed, delimiter length = {}",
            self.delimiter.len()
        );
    }

    /// `"\r\n--" ++ boundary`, used while inside part data.
    pub(crate) fn delimiter(&self) -> &[u8] {
        &self.delimiter
    }

    /// `"--" ++ boundary`, used only for the very first delimiter, which
    /// has no required leading CRLF.
    pub(crate) fn delimiter_no_crlf(&self) -> &[u8] {
        &self.delimiter[2..]
    }

    pub(crate) fn failure(&self) -> &[usize] {
        &self.failure
    }

    pub(crate) fn failure_first(&self) -> &[usize] {
        &self.failure_first
    }

    pub(crate) fn len(&self) -> usize {
        self.delimiter.len()
    }
}

/// Standard KMP prefix-function: `failure[i]` is the length of the longest
/// proper prefix of `pattern[..=i]` that is also a suffix of it.
fn compute_failure_function(pattern: &[u8], failure: &mut [usize]) {
    if pattern.is_empty() {
        return;
    }

    failure[0] = 0;
    let mut k = 0;
    for i in 1..pattern.len() {
        while k > 0 && pattern[k] != pattern[i] {
            k = failure[k - 1];
        }
        if pattern[k] == pattern[i] {
            k += 1;
        }
        failure[i] = k;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_shape() {
        let table = BoundaryTable::new(b"abcd").unwrap();
        assert_eq!(table.delimiter(), b"\r\n--abcd");
        assert_eq!(table.delimiter_no_crlf(), b"--abcd");
    }

    #[test]
    fn empty_boundary_rejected() {
        assert!(matches!(
            BoundaryTable::new(b"").unwrap_err().kind(),
            ErrorKind::InvalidBoundary
        ));
    }

    #[test]
    fn reset_reuses_allocation_same_length() {
        let mut table = BoundaryTable::new(b"abcd").unwrap();
        table.reset(b"wxyz").unwrap();
        assert_eq!(table.delimiter(), b"\r\n--wxyz");
    }

    #[test]
    fn reset_allows_shorter() {
        let mut table = BoundaryTable::new(b"abcdef").unwrap();
        table.reset(b"xy").unwrap();
        assert_eq!(table.delimiter(), b"\r\n--xy");
    }

    #[test]
    fn reset_rejects_longer() {
        let mut table = BoundaryTable::new(b"ab").unwrap();
        assert!(matches!(
            table.reset(b"abcdef").unwrap_err().kind(),
            ErrorKind::BoundaryTooLong
        ));
    }

    #[test]
    fn failure_function_has_no_self_overlap() {
        // delimiter = "\r\n--aaaa"; "\r\n--" doesn't overlap with "aaaa"
        let table = BoundaryTable::new(b"aaaa").unwrap();
        assert_eq!(table.failure()[0], 0);
    }
}
