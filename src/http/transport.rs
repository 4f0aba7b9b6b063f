use std::io::{self, IoSlice};

/// Non-blocking socket operations a [`Connection`](crate::http::connection::Connection)
/// needs.
///
/// Both calls must return `ErrorKind::WouldBlock` instead of waiting. The
/// reactor re-arms the socket and calls back once it is ready again.
pub trait Transport {
    /// Reads into `buf`. `Ok(0)` means the peer closed its side.
    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes from several buffers in one call.
    fn try_write_vectored(&self, bufs: &[IoSlice<'_>]) -> io::Result<usize>;
}

impl Transport for tokio::net::TcpStream {
    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        tokio::net::TcpStream::try_read(self, buf)
    }

    fn try_write_vectored(&self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        tokio::net::TcpStream::try_write_vectored(self, bufs)
    }
}
