//! server
//!
//! TCP transport: one line-delimited JSON stream per connection.
//!
//! # Architecture
//!
//! The accept loop spawns one task per connection. Each connection has a
//! reader (the task itself) and a writer task:
//!
//! - The reader decodes lines, dispatches them, and queues direct replies
//! - The writer drains the connection's outbox onto the socket
//!
//! Lines are read as raw bytes up to a frame limit. An overlong line is
//! discarded through its newline and answered with a protocol error, as is
//! a line that is not valid UTF-8 JSON; neither closes the connection.
//!
//! Fan-out only ever touches the outbox, so a slow socket delays its own
//! writer and nothing else. A connection whose outbox overflows is closed.
//! When the reader hits EOF or an I/O error the connection is disconnected;
//! the writer flushes what is queued and exits.

pub mod dispatch;
pub mod protocol;

pub use protocol::{encode_event, ClientMessage, ProtocolError};

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::core::config::DEFAULT_MAX_FRAME_BYTES;
use crate::session::{ServerEvent, SessionCoordinator};

/// A bound listener ready to serve.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    coordinator: Arc<SessionCoordinator>,
    max_frame_bytes: usize,
}

impl Server {
    /// Bind `addr`. Port 0 picks a free port; see [`local_addr`](Self::local_addr).
    ///
    /// # Errors
    ///
    /// Returns the bind error.
    pub async fn bind(addr: SocketAddr, coordinator: Arc<SessionCoordinator>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            coordinator,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        })
    }

    /// Reject request lines longer than `limit` bytes.
    pub fn with_max_frame_bytes(mut self, limit: usize) -> Self {
        self.max_frame_bytes = limit.max(1);
        self
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever.
    pub async fn run(self) -> io::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` completes. Connections already
    /// accepted keep running on their own tasks.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> io::Result<()> {
        info!(addr = %self.local_addr()?, "listening");
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutting down listener");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let coordinator = Arc::clone(&self.coordinator);
                            tokio::spawn(
                                serve_connection(coordinator, stream, self.max_frame_bytes)
                                    .instrument(info_span!("conn", peer = %peer)),
                            );
                        }
                        Err(err) => warn!(error = %err, "accept failed"),
                    }
                }
            }
        }
    }
}

/// One inbound line.
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    /// A complete line, newline stripped, in the read buffer.
    Line,
    /// A line over the limit; it has been consumed and dropped.
    TooLong,
    /// The peer closed its side.
    Eof,
}

/// Read the next line into `buf`, holding at most `limit` bytes of it.
async fn read_frame<R>(reader: &mut R, limit: usize, buf: &mut Vec<u8>) -> io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let cap = (limit as u64).saturating_add(1);
    if (&mut *reader).take(cap).read_until(b'\n', buf).await? == 0 {
        return Ok(Frame::Eof);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        return Ok(Frame::Line);
    }
    if buf.len() <= limit {
        // Final line without a newline.
        return Ok(Frame::Line);
    }
    loop {
        buf.clear();
        let n = (&mut *reader).take(cap).read_until(b'\n', buf).await?;
        if n == 0 || buf.last() == Some(&b'\n') {
            break;
        }
    }
    buf.clear();
    Ok(Frame::TooLong)
}

async fn serve_connection(
    coordinator: Arc<SessionCoordinator>,
    stream: TcpStream,
    max_frame_bytes: usize,
) {
    let (read_half, write_half) = stream.into_split();
    let (mut conn, events) = coordinator.connect();
    debug!(conn = %conn.id(), "accepted");

    let writer = tokio::spawn(write_events(write_half, events).in_current_span());
    let overflow = conn.overflow_signal();

    let mut reader = BufReader::new(read_half);
    let mut buf = Vec::new();
    loop {
        let frame = tokio::select! {
            _ = overflow.notified() => {
                warn!(conn = %conn.id(), "outbox overflowed, closing connection");
                break;
            }
            frame = read_frame(&mut reader, max_frame_bytes, &mut buf) => frame,
        };
        let reply = match frame {
            Ok(Frame::Eof) => break,
            Ok(Frame::TooLong) => {
                debug!(limit = max_frame_bytes, "discarded overlong line");
                Some(ProtocolError::FrameTooLong { limit: max_frame_bytes }.to_event())
            }
            Ok(Frame::Line) if buf.iter().all(u8::is_ascii_whitespace) => continue,
            Ok(Frame::Line) => match ClientMessage::parse_bytes(&buf) {
                Ok(message) => dispatch::dispatch(&coordinator, &mut conn, message)
                    .await
                    .unwrap_or_else(|err| {
                        debug!(code = err.code(), error = %err, "request failed");
                        Some(err.to_event())
                    }),
                Err(err) => Some(err.to_event()),
            },
            Err(err) => {
                debug!(error = %err, "read failed");
                break;
            }
        };
        if let Some(reply) = reply {
            conn.send(reply);
        }
    }

    coordinator.disconnect(&mut conn);
    drop(conn);
    if let Err(err) = writer.await {
        warn!(error = %err, "writer task failed");
    }
    debug!("closed");
}

async fn write_events(mut socket: OwnedWriteHalf, mut events: mpsc::Receiver<ServerEvent>) {
    while let Some(event) = events.recv().await {
        let mut line = match encode_event(&event) {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "dropping unencodable event");
                continue;
            }
        };
        line.push('\n');
        if let Err(err) = socket.write_all(line.as_bytes()).await {
            debug!(error = %err, "write failed");
            return;
        }
    }
    let _ = socket.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn frames(input: &[u8], limit: usize) -> Vec<(Frame, Vec<u8>)> {
        let mut reader = BufReader::new(input);
        let mut buf = Vec::new();
        let mut out = Vec::new();
        loop {
            let frame = read_frame(&mut reader, limit, &mut buf).await.unwrap();
            if frame == Frame::Eof {
                return out;
            }
            out.push((frame, buf.clone()));
        }
    }

    #[tokio::test]
    async fn splits_lines_and_keeps_trailing_partial() {
        let got = frames(b"one\ntwo\nthree", 8).await;
        assert_eq!(
            got,
            vec![
                (Frame::Line, b"one".to_vec()),
                (Frame::Line, b"two".to_vec()),
                (Frame::Line, b"three".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn overlong_line_is_skipped_through_newline() {
        let got = frames(b"short\n0123456789abcdef0123\nnext\n", 8).await;
        assert_eq!(
            got,
            vec![
                (Frame::Line, b"short".to_vec()),
                (Frame::TooLong, Vec::new()),
                (Frame::Line, b"next".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn line_at_exact_limit_is_accepted() {
        let got = frames(b"12345678\n123456789\n", 8).await;
        assert_eq!(
            got,
            vec![(Frame::Line, b"12345678".to_vec()), (Frame::TooLong, Vec::new())]
        );
    }

    #[tokio::test]
    async fn invalid_utf8_is_returned_as_bytes() {
        let got = frames(b"\xff\xfe\n", 8).await;
        assert_eq!(got, vec![(Frame::Line, vec![0xff, 0xfe])]);
    }
}
