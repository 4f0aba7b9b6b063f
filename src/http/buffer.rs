//! Fixed-capacity read buffer and the CRLF line scanner.
//!
//! The scanner never writes into the buffer. A logical line is reported as a
//! [`LineSpan`] (offset + length) that the parser resolves back into bytes.

/// Default capacity of a connection's read buffer.
pub const READ_BUFFER_SIZE: usize = 2048;

/// Location of one logical line inside the read buffer, CRLF excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: usize,
    pub len: usize,
}

/// Result of scanning for the next CRLF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    /// A full line was found.
    Complete(LineSpan),
    /// No CRLF yet; more bytes are needed.
    Incomplete,
    /// A CR not followed by LF, or a bare LF.
    Malformed,
}

/// Scans `buf` from `checked_pos` for the CRLF that ends the line starting
/// at `line_start`.
///
/// Returns the status and the new scan position. On `Complete` the position
/// is just past the LF. On `Incomplete` it stops at the end of the buffer, or
/// on a trailing CR so that the CR is examined again once its LF arrives.
pub fn scan_line(buf: &[u8], line_start: usize, checked_pos: usize) -> (LineStatus, usize) {
    let mut pos = checked_pos;

    while pos < buf.len() {
        match buf[pos] {
            b'\r' => {
                if pos + 1 == buf.len() {
                    return (LineStatus::Incomplete, pos);
                }
                if buf[pos + 1] == b'\n' {
                    let span = LineSpan {
                        start: line_start,
                        len: pos - line_start,
                    };
                    return (LineStatus::Complete(span), pos + 2);
                }
                return (LineStatus::Malformed, pos);
            }
            // Every CR is handled above, so an LF reached here is bare.
            b'\n' => return (LineStatus::Malformed, pos),
            _ => pos += 1,
        }
    }

    (LineStatus::Incomplete, pos)
}

/// The read side of a connection.
///
/// Holds `line_start <= checked_pos <= read_len <= capacity` at all times.
pub struct ReadBuffer {
    data: Box<[u8]>,
    read_len: usize,
    checked_pos: usize,
    line_start: usize,
}

impl ReadBuffer {
    pub fn new() -> Self {
        Self::with_capacity(READ_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            read_len: 0,
            checked_pos: 0,
            line_start: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn read_len(&self) -> usize {
        self.read_len
    }

    pub fn checked_pos(&self) -> usize {
        self.checked_pos
    }

    pub fn line_start(&self) -> usize {
        self.line_start
    }

    pub fn is_full(&self) -> bool {
        self.read_len == self.data.len()
    }

    /// The unused tail of the buffer, where the next read lands.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.read_len..]
    }

    /// Records `n` bytes written into [`spare_mut`](Self::spare_mut).
    pub fn commit(&mut self, n: usize) {
        self.read_len = (self.read_len + n).min(self.data.len());
    }

    /// Copies as much of `bytes` as fits and returns how much was taken.
    pub fn fill(&mut self, bytes: &[u8]) -> usize {
        let spare = self.spare_mut();
        let n = bytes.len().min(spare.len());
        spare[..n].copy_from_slice(&bytes[..n]);
        self.commit(n);
        n
    }

    /// Advances the scanner over the line currently being assembled.
    pub fn next_line(&mut self) -> LineStatus {
        let (status, pos) = scan_line(
            &self.data[..self.read_len],
            self.line_start,
            self.checked_pos,
        );
        self.checked_pos = pos;
        if let LineStatus::Complete(_) = status {
            self.line_start = pos;
        }
        status
    }

    pub fn line(&self, span: LineSpan) -> &[u8] {
        &self.data[span.start..span.start + span.len]
    }

    /// Bytes received but not yet claimed by a complete line or body.
    pub fn unparsed(&self) -> &[u8] {
        &self.data[self.line_start..self.read_len]
    }

    /// Claims `n` unparsed bytes, e.g. a request body.
    pub fn consume(&mut self, n: usize) {
        self.line_start = (self.line_start + n).min(self.read_len);
        self.checked_pos = self.line_start;
    }

    pub fn reset(&mut self) {
        self.data.fill(0);
        self.read_len = 0;
        self.checked_pos = 0;
        self.line_start = 0;
    }
}

impl Default for ReadBuffer {
    fn default() -> Self {
        Self::new()
    }
}
