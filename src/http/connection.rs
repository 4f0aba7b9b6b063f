use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::TriggerMode;
use crate::http::buffer::ReadBuffer;
use crate::http::parser::{ParseError, ParseState, RequestParser};
use crate::http::request::Method;
use crate::http::resolver::Outcome;
use crate::http::response::build_response;
use crate::http::transport::Transport;
use crate::http::writer::{Flush, ResponseWriter};
use crate::server::ServerContext;

/// Readiness the connection is waiting for next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Read,
    Write,
}

/// Result of [`Connection::drain`].
#[derive(Debug)]
pub enum DrainStatus {
    /// Bytes were added to the read buffer.
    Progress(usize),
    /// Nothing to read right now.
    WouldBlock,
    PeerClosed,
    Failed(io::Error),
}

/// Result of [`Connection::process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// The request is not complete yet; wait for readability.
    AwaitInput,
    /// A response is queued; wait for writability.
    ReadyToSend,
}

/// Result of [`Connection::send`].
#[derive(Debug)]
pub enum SendStatus {
    Progress(usize),
    /// The socket is full; wait for writability and call again.
    WouldBlock,
    /// The response is flushed. A persistent connection has been reset for
    /// the next request, any other one has been closed.
    Complete { keep_alive: bool },
    Failed(io::Error),
}

/// Markers read by the idle timer.
///
/// `active` is set whenever bytes move in either direction, `improved` when
/// a response was prepared or fully sent.
#[derive(Debug, Default)]
pub struct ActivityFlags {
    active: bool,
    improved: bool,
}

impl ActivityFlags {
    pub fn take_active(&mut self) -> bool {
        std::mem::take(&mut self.active)
    }

    pub fn take_improved(&mut self) -> bool {
        std::mem::take(&mut self.improved)
    }
}

/// One accepted socket and everything needed to serve requests on it.
///
/// The reactor calls [`drain`](Self::drain) and [`process`](Self::process)
/// on readability and [`send`](Self::send) on writability. None of them
/// block: "not ready" comes back as a status. Only one caller may drive a
/// connection at a time.
pub struct Connection<S> {
    socket: Option<S>,
    peer: SocketAddr,
    ctx: Arc<ServerContext>,
    read_buf: ReadBuffer,
    parser: RequestParser,
    writer: ResponseWriter,
    interest: Interest,
    keep_alive: bool,
    flags: ActivityFlags,
}

impl<S> Connection<S> {
    /// Takes ownership of an accepted socket and counts it as active.
    pub fn new(socket: S, peer: SocketAddr, ctx: Arc<ServerContext>) -> Self {
        let active = ctx.connection_opened();
        tracing::debug!(peer = %peer, active, "Connection opened");

        Self {
            socket: Some(socket),
            peer,
            ctx,
            read_buf: ReadBuffer::new(),
            parser: RequestParser::new(),
            writer: ResponseWriter::new(),
            interest: Interest::Read,
            keep_alive: false,
            flags: ActivityFlags::default(),
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.ctx
    }

    pub fn socket(&self) -> Option<&S> {
        self.socket.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }

    pub fn interest(&self) -> Interest {
        self.interest
    }

    pub fn parse_state(&self) -> ParseState {
        self.parser.state()
    }

    pub fn read_buffer(&self) -> &ReadBuffer {
        &self.read_buf
    }

    pub fn response(&self) -> &ResponseWriter {
        &self.writer
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn flags_mut(&mut self) -> &mut ActivityFlags {
        &mut self.flags
    }

    /// Releases the file mapping, closes the socket and uncounts the
    /// connection. Later calls do nothing.
    pub fn close(&mut self) {
        let Some(socket) = self.socket.take() else {
            return;
        };

        self.writer.clear();
        drop(socket);

        let active = self.ctx.connection_closed();
        tracing::debug!(peer = %self.peer, active, "Connection closed");
    }

    /// Returns to the initial parse state for the next request.
    fn reset(&mut self) {
        self.read_buf.reset();
        self.parser.reset();
        self.writer.clear();
        self.interest = Interest::Read;
        self.keep_alive = false;
    }

    fn trigger_mode(&self) -> TriggerMode {
        self.ctx.config().server.trigger_mode
    }
}

impl<S: Transport> Connection<S> {
    /// Reads whatever the socket has into the read buffer.
    ///
    /// In edge-triggered mode this reads until the socket would block, in
    /// level-triggered mode it reads once. A full buffer reports
    /// `Progress(0)` and leaves the parser to reject the request.
    pub fn drain(&mut self) -> DrainStatus {
        let edge = self.trigger_mode() == TriggerMode::Edge;
        let Some(socket) = self.socket.as_ref() else {
            return DrainStatus::Failed(io::ErrorKind::NotConnected.into());
        };

        let mut total = 0;
        loop {
            let spare = self.read_buf.spare_mut();
            if spare.is_empty() {
                return DrainStatus::Progress(total);
            }

            match socket.try_read(spare) {
                Ok(0) => return DrainStatus::PeerClosed,
                Ok(n) => {
                    self.read_buf.commit(n);
                    self.flags.active = true;
                    total += n;
                    if !edge {
                        return DrainStatus::Progress(total);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return DrainStatus::Failed(e),
            }
        }

        if total == 0 {
            DrainStatus::WouldBlock
        } else {
            DrainStatus::Progress(total)
        }
    }

    /// Parses what has arrived and, once a request is complete, resolves it
    /// and queues the response.
    pub fn process(&mut self) -> ProcessStatus {
        if self.interest == Interest::Write {
            return ProcessStatus::ReadyToSend;
        }

        let (outcome, head_only, request_line) = match self.parser.advance(&mut self.read_buf) {
            Err(ParseError::Incomplete) => return ProcessStatus::AwaitInput,
            Ok(request) => {
                self.keep_alive = request.keep_alive;
                let outcome = self.ctx.resolver().resolve(&request);
                (
                    outcome,
                    request.method == Method::HEAD,
                    Some((request.method, request.path)),
                )
            }
            Err(e) => {
                tracing::debug!(peer = %self.peer, error = ?e, "Rejected request");
                self.keep_alive = false;
                (Outcome::from(e), false, None)
            }
        };

        let prepared = build_response(outcome, head_only, self.keep_alive, self.writer.head_mut());
        self.keep_alive = prepared.keep_alive;

        if self.ctx.config().server.access_log {
            let (method, path) = request_line
                .as_ref()
                .map_or(("-", "-"), |(m, p)| (m.as_str(), p.as_str()));
            tracing::info!(
                peer = %self.peer,
                method,
                path,
                status = prepared.status.as_u16(),
                keep_alive = prepared.keep_alive,
                "Request served"
            );
        }

        self.writer.attach(prepared.body);
        self.interest = Interest::Write;
        self.flags.improved = true;
        ProcessStatus::ReadyToSend
    }

    /// Writes the queued response: header bytes, then mapped file bytes.
    pub fn send(&mut self) -> SendStatus {
        let once = self.trigger_mode() == TriggerMode::Level;
        let Some(socket) = self.socket.as_ref() else {
            return SendStatus::Failed(io::ErrorKind::NotConnected.into());
        };

        match self.writer.write_to(socket, once) {
            Ok(Flush::Progress(n)) => {
                self.flags.active = true;
                SendStatus::Progress(n)
            }
            Ok(Flush::Blocked(n)) => {
                if n > 0 {
                    self.flags.active = true;
                }
                SendStatus::WouldBlock
            }
            Ok(Flush::Complete) => {
                self.flags.active = true;
                self.flags.improved = true;
                let keep_alive = self.keep_alive;
                if keep_alive {
                    self.reset();
                } else {
                    self.close();
                }
                SendStatus::Complete { keep_alive }
            }
            Err(e) => SendStatus::Failed(e),
        }
    }
}

impl<S> Drop for Connection<S> {
    fn drop(&mut self) {
        self.close();
    }
}
