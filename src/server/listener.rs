use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tracing::info;

use crate::auth;
use crate::config::Config;
use crate::http::connection::{Connection, DrainStatus, Interest, ProcessStatus, SendStatus};
use crate::server::ServerContext;
use crate::server::timer::IdleTimer;

const BUSY_RESPONSE: &[u8] =
    b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// Opens the credential store, binds the listener and serves until error.
pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let store = auth::open_store(&cfg.credentials)?;
    let ctx = Arc::new(ServerContext::new(cfg.clone(), store)?);

    let listener = TcpListener::bind(&cfg.server.listen_addr).await?;
    info!(
        "Listening on {} (root {}, {:?}-triggered)",
        cfg.server.listen_addr,
        cfg.server.doc_root.display(),
        cfg.server.trigger_mode
    );

    serve(listener, ctx).await
}

/// Accepts connections and spawns one task per socket.
///
/// The connection is counted before its task starts, so the limit check
/// always sees every socket accepted so far.
pub async fn serve(listener: TcpListener, ctx: Arc<ServerContext>) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;

        if ctx.active_connections() >= ctx.config().server.max_connections {
            tracing::warn!(peer = %peer, "Too many connections, rejecting");
            reject_busy(&socket, peer);
            continue;
        }

        let mut conn = Connection::new(socket, peer, ctx.clone());
        tokio::spawn(async move {
            drive(&mut conn).await;
        });
    }
}

/// Best-effort 503; the socket is dropped right after.
fn reject_busy(socket: &TcpStream, peer: SocketAddr) {
    match socket.try_write(BUSY_RESPONSE) {
        Ok(n) if n < BUSY_RESPONSE.len() => {
            tracing::debug!(peer = %peer, written = n, "Busy response cut short");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::debug!(peer = %peer, error = %e, "Busy response not sent");
        }
    }
}

enum Event {
    Ready(std::io::Result<()>),
    Idle,
}

/// Runs one connection until it closes.
///
/// The task owns the connection, so readiness handling and idle eviction
/// never overlap.
pub async fn drive(conn: &mut Connection<TcpStream>) {
    let peer = conn.peer();
    let mut timer = IdleTimer::new(conn.context().config().server.idle_timeout());

    loop {
        let Some(socket) = conn.socket() else {
            break;
        };
        let interest = conn.interest();

        let event = tokio::select! {
            ready = async {
                match interest {
                    Interest::Read => socket.readable().await,
                    Interest::Write => socket.writable().await,
                }
            } => Event::Ready(ready),
            _ = timer.expired() => Event::Idle,
        };

        match event {
            Event::Idle => {
                info!(peer = %peer, "Closing idle connection");
                conn.close();
                break;
            }
            Event::Ready(Err(e)) => {
                tracing::warn!(peer = %peer, error = %e, "Readiness wait failed");
                conn.close();
                break;
            }
            Event::Ready(Ok(())) => {}
        }

        match interest {
            Interest::Read => match conn.drain() {
                DrainStatus::Progress(_) => {
                    if conn.process() == ProcessStatus::ReadyToSend {
                        tracing::trace!(peer = %peer, "Response queued");
                    }
                }
                DrainStatus::WouldBlock => {}
                DrainStatus::PeerClosed => {
                    conn.close();
                    break;
                }
                DrainStatus::Failed(e) => {
                    tracing::warn!(peer = %peer, error = %e, "Read failed");
                    conn.close();
                    break;
                }
            },
            Interest::Write => match conn.send() {
                SendStatus::Progress(_) | SendStatus::WouldBlock => {}
                SendStatus::Complete { keep_alive: true } => {}
                SendStatus::Complete { keep_alive: false } => break,
                SendStatus::Failed(e) => {
                    tracing::warn!(peer = %peer, error = %e, "Write failed");
                    conn.close();
                    break;
                }
            },
        }

        timer.observe(conn.flags_mut());
    }
}
