//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, IoSlice};
use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tempfile::TempDir;
use tideway::auth::CredentialStore;
use tideway::config::{Config, TriggerMode};
use tideway::http::request::{Method, Request};
use tideway::http::transport::Transport;
use tideway::server::ServerContext;

pub const INDEX_HTML: &[u8] = b"<html><body>hello</body></html>";
pub const WELCOME_HTML: &[u8] = b"<html>welcome</html>";
pub const LOGIN_ERROR_HTML: &[u8] = b"<html>login failed</html>";
pub const LOGIN_HTML: &[u8] = b"<html>please log in</html>";
pub const REGISTER_ERROR_HTML: &[u8] = b"<html>registration failed</html>";

/// Contents of `large.bin`: bigger than the write buffer, not periodic in
/// a way that would hide skipped or repeated bytes.
pub fn large_body() -> Vec<u8> {
    (0..5000u32).map(|i| (i * 7 % 251) as u8).collect()
}

fn write_file(dir: &Path, name: &str, contents: &[u8], mode: u32) {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
}

/// A document root with the pages the default routes expect.
pub fn doc_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write_file(root, "index.html", INDEX_HTML, 0o644);
    write_file(root, "welcome.html", WELCOME_HTML, 0o644);
    write_file(root, "login_error.html", LOGIN_ERROR_HTML, 0o644);
    write_file(root, "login.html", LOGIN_HTML, 0o644);
    write_file(root, "register_error.html", REGISTER_ERROR_HTML, 0o644);
    write_file(root, "large.bin", &large_body(), 0o644);
    write_file(root, "empty.txt", b"", 0o644);
    write_file(root, "private.html", b"secret", 0o600);
    std::fs::create_dir(root.join("assets")).unwrap();

    dir
}

pub fn config(root: &Path, mode: TriggerMode) -> Config {
    let mut cfg = Config::default();
    cfg.server.doc_root = root.to_path_buf();
    cfg.server.trigger_mode = mode;
    cfg.server.access_log = false;
    cfg
}

pub fn context(cfg: Config, store: Arc<dyn CredentialStore>) -> Arc<ServerContext> {
    Arc::new(ServerContext::new(cfg, store).unwrap())
}

pub fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

/// A request as the parser would hand it over, with no Host header.
pub fn request(method: Method, path: &str, body: &'static str) -> Request {
    Request {
        method,
        path: path.to_string(),
        version: "HTTP/1.1".to_string(),
        host: None,
        content_length: body.len(),
        keep_alive: false,
        body: Bytes::from_static(body.as_bytes()),
    }
}

#[derive(Default)]
struct MockState {
    inbound: VecDeque<Vec<u8>>,
    eof: bool,
    read_error: Option<io::ErrorKind>,
    written: Vec<u8>,
    /// Bytes the socket accepts before reporting WouldBlock.
    write_budget: Option<usize>,
    /// Most bytes taken by a single write call.
    per_call_limit: Option<usize>,
}

/// In-memory socket scripted from the test through a [`MockHandle`].
pub struct MockSocket {
    state: Arc<Mutex<MockState>>,
}

#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

pub fn mock_socket() -> (MockSocket, MockHandle) {
    let state = Arc::new(Mutex::new(MockState::default()));
    (
        MockSocket {
            state: state.clone(),
        },
        MockHandle { state },
    )
}

impl MockHandle {
    /// Makes `bytes` available to the next reads.
    pub fn push(&self, bytes: &[u8]) {
        self.state.lock().unwrap().inbound.push_back(bytes.to_vec());
    }

    /// Reads return 0 once the queued bytes are consumed.
    pub fn close_input(&self) {
        self.state.lock().unwrap().eof = true;
    }

    pub fn fail_reads(&self, kind: io::ErrorKind) {
        self.state.lock().unwrap().read_error = Some(kind);
    }

    /// Lets the socket accept `n` more bytes before blocking.
    pub fn grant(&self, n: usize) {
        let mut state = self.state.lock().unwrap();
        state.write_budget = Some(state.write_budget.unwrap_or(0) + n);
    }

    pub fn block_writes(&self) {
        self.state.lock().unwrap().write_budget = Some(0);
    }

    pub fn limit_per_call(&self, n: usize) {
        self.state.lock().unwrap().per_call_limit = Some(n);
    }

    pub fn written(&self) -> Vec<u8> {
        self.state.lock().unwrap().written.clone()
    }
}

impl Transport for MockSocket {
    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        if let Some(kind) = state.read_error {
            return Err(kind.into());
        }

        match state.inbound.pop_front() {
            Some(mut chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    let rest = chunk.split_off(n);
                    state.inbound.push_front(rest);
                }
                Ok(n)
            }
            None if state.eof => Ok(0),
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }

    fn try_write_vectored(&self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        let mut allowed = state.write_budget.unwrap_or(usize::MAX);
        if let Some(limit) = state.per_call_limit {
            allowed = allowed.min(limit);
        }
        if allowed == 0 {
            return Err(io::ErrorKind::WouldBlock.into());
        }

        let mut n = 0;
        for slice in bufs {
            let take = slice.len().min(allowed - n);
            state.written.extend_from_slice(&slice[..take]);
            n += take;
            if n == allowed {
                break;
            }
        }

        if let Some(budget) = state.write_budget.as_mut() {
            *budget -= n;
        }
        Ok(n)
    }
}

/// Splits a raw response into its head (without the blank line) and body.
pub fn split_response(raw: &[u8]) -> (String, Vec<u8>) {
    let end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has no header terminator");
    (
        String::from_utf8(raw[..end].to_vec()).unwrap(),
        raw[end + 4..].to_vec(),
    )
}
