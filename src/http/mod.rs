//! HTTP/1.1 request engine.
//!
//! Turns bytes from a non-blocking socket into a parsed request, resolves it
//! against the document root or a credential action, and sends the response
//! with the file bytes taken straight from a read-only mapping.
//!
//! # Architecture
//!
//! - **`buffer`**: Fixed-capacity read buffer and CRLF line scanner
//! - **`parser`**: Incremental request parser (the main state machine)
//! - **`request`**: HTTP request representation
//! - **`resolver`**: Maps a request to a file or a login/registration action
//! - **`mapped`**: Read-only file mappings released on drop
//! - **`response`**: Status codes and the response builder
//! - **`writer`**: Write buffer and the two-segment vectored send
//! - **`mime`**: MIME type detection based on file extensions
//! - **`transport`**: The non-blocking socket operations a connection uses
//! - **`connection`**: Per-socket lifecycle driven by readiness events
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← drain() + process(): RequestLine → Headers → Content
//!        └──────┬──────┘
//!               │ Request complete (or rejected)
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← send(): header bytes + mapped file bytes
//!        └──────┬───────────┘
//!               │ Response flushed
//!               ├─ Keep-Alive → Reading (same connection, buffers reset)
//!               └─ Close → Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use tideway::http::connection::{Connection, DrainStatus, ProcessStatus};
//!
//! let mut conn = Connection::new(socket, peer, ctx);
//! if let DrainStatus::Progress(_) = conn.drain() {
//!     if conn.process() == ProcessStatus::ReadyToSend {
//!         conn.send();
//!     }
//! }
//! ```

pub mod buffer;
pub mod connection;
pub mod mapped;
pub mod mime;
pub mod parser;
pub mod request;
pub mod resolver;
pub mod response;
pub mod transport;
pub mod writer;
