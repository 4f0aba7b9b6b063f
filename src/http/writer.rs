use std::fmt;
use std::io::{self, IoSlice};

use crate::http::mapped::MappedFile;
use crate::http::transport::Transport;

/// Default capacity of a connection's write buffer.
pub const WRITE_BUFFER_SIZE: usize = 1024;

/// Smallest write buffer that still fits the fallback 500 response.
pub const MIN_WRITE_BUFFER_SIZE: usize = 128;

#[derive(Debug, thiserror::Error)]
#[error("write buffer overflow: {needed} bytes needed, {remaining} remaining")]
pub struct Overflow {
    pub needed: usize,
    pub remaining: usize,
}

/// Fixed-capacity buffer holding the response head (and generated pages).
pub struct WriteBuffer {
    data: Box<[u8]>,
    len: usize,
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self::with_capacity(WRITE_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity.max(MIN_WRITE_BUFFER_SIZE)].into_boxed_slice(),
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.len
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Appends `bytes`, or leaves the buffer untouched if they do not fit.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), Overflow> {
        if bytes.len() > self.remaining() {
            return Err(Overflow {
                needed: bytes.len(),
                remaining: self.remaining(),
            });
        }
        self.data[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }

    pub fn append_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<(), Overflow> {
        match args.as_str() {
            Some(text) => self.append(text.as_bytes()),
            None => self.append(fmt::format(args).as_bytes()),
        }
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for WriteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// How far a call to [`ResponseWriter::write_to`] got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flush {
    /// Every queued byte has been sent.
    Complete,
    /// Bytes were written and the caller asked for a single write.
    Progress(usize),
    /// The socket stopped accepting bytes after `usize` were written.
    Blocked(usize),
}

/// The send vector of one response: header bytes, then optional file bytes.
pub struct ResponseWriter {
    head: WriteBuffer,
    body: Option<MappedFile>,
    bytes_sent: usize,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::with_capacity(WRITE_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            head: WriteBuffer::with_capacity(capacity),
            body: None,
            bytes_sent: 0,
        }
    }

    pub fn head(&self) -> &WriteBuffer {
        &self.head
    }

    pub fn head_mut(&mut self) -> &mut WriteBuffer {
        &mut self.head
    }

    /// Queues the file segment that follows the head.
    pub fn attach(&mut self, body: Option<MappedFile>) {
        self.body = body;
        self.bytes_sent = 0;
    }

    pub fn body(&self) -> Option<&MappedFile> {
        self.body.as_ref()
    }

    pub fn bytes_queued(&self) -> usize {
        self.head.len() + self.body.as_ref().map_or(0, MappedFile::len)
    }

    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }

    pub fn is_flushed(&self) -> bool {
        self.bytes_sent >= self.bytes_queued()
    }

    /// Drops the queued response, releasing any file mapping.
    pub fn clear(&mut self) {
        self.head.clear();
        self.body = None;
        self.bytes_sent = 0;
    }

    fn pending(&self) -> ([IoSlice<'_>; 2], usize) {
        let head = self.head.as_bytes();
        let body = self.body.as_ref().map_or(&[][..], MappedFile::as_bytes);

        if self.bytes_sent < head.len() {
            (
                [IoSlice::new(&head[self.bytes_sent..]), IoSlice::new(body)],
                if body.is_empty() { 1 } else { 2 },
            )
        } else {
            let offset = self.bytes_sent - head.len();
            ([IoSlice::new(&body[offset..]), IoSlice::new(&[])], 1)
        }
    }

    /// Writes pending segments until done, blocked, or (with `once`) after
    /// the first successful write.
    pub fn write_to<T: Transport>(&mut self, socket: &T, once: bool) -> io::Result<Flush> {
        let mut written = 0;

        while !self.is_flushed() {
            let result = {
                let (slices, count) = self.pending();
                socket.try_write_vectored(&slices[..count])
            };

            match result {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "connection closed while writing",
                    ));
                }
                Ok(n) => {
                    self.bytes_sent = (self.bytes_sent + n).min(self.bytes_queued());
                    written += n;
                    if once && !self.is_flushed() {
                        return Ok(Flush::Progress(written));
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(Flush::Blocked(written));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        Ok(Flush::Complete)
    }
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}
