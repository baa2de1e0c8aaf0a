//! # Host Link Module
//!
//! Line-oriented transport between the bridge and the host computer.
//!
//! This module handles:
//! - The [`HostLink`] trait (non-blocking line read, async line write)
//! - [`LineLink`], a link over any async reader/writer pair
//! - Opening the host serial port or stdio ([`serial`])

pub mod serial;

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Default number of buffered, unread host lines
pub const DEFAULT_LINE_BUFFER: usize = 64;

/// Trait for host line I/O
#[async_trait]
pub trait HostLink: Send {
    /// Next complete input line, if one is available right now
    fn read_line(&mut self) -> Option<String>;

    /// Write one line (terminator appended) and flush
    async fn write_line(&mut self, line: &str) -> io::Result<()>;
}

#[async_trait]
impl<T: HostLink + ?Sized> HostLink for Box<T> {
    fn read_line(&mut self) -> Option<String> {
        (**self).read_line()
    }

    async fn write_line(&mut self, line: &str) -> io::Result<()> {
        (**self).write_line(line).await
    }
}

/// Host link over an async reader/writer pair
///
/// A background task splits the reader on `\n` and hands complete lines to
/// the link through a bounded channel, so [`HostLink::read_line`] never waits.
pub struct LineLink<W> {
    lines: mpsc::Receiver<String>,
    writer: W,
    reader_task: JoinHandle<()>,
}

impl<W> std::fmt::Debug for LineLink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineLink").finish_non_exhaustive()
    }
}

impl<W: AsyncWrite + Unpin + Send> LineLink<W> {
    /// Create a link and start its reader task
    ///
    /// # Arguments
    ///
    /// * `reader` - Host input stream
    /// * `writer` - Host output stream
    /// * `buffer` - Number of complete lines buffered before the reader waits
    pub fn new<R>(reader: R, writer: W, buffer: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, lines) = mpsc::channel(buffer.max(1));
        let reader_task = tokio::spawn(read_lines(reader, tx));

        Self {
            lines,
            writer,
            reader_task,
        }
    }

    /// Wait for the next input line; `None` once the input has ended
    pub async fn recv_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }
}

impl<W> Drop for LineLink<W> {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

/// Forward lines from `reader` until end of input or the link is dropped
async fn read_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin + Send,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                debug!("Host input reached end of stream");
                break;
            }
            Ok(_) => {
                let line = decode_line(&buf);
                trace!("Host line: {}", line);
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("Host input failed: {}", e);
                break;
            }
        }
    }
}

/// Strip the line terminator and decode lossily as UTF-8
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> HostLink for LineLink<W> {
    fn read_line(&mut self) -> Option<String> {
        self.lines.try_recv().ok()
    }

    async fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut framed = Vec::with_capacity(line.len() + 1);
        framed.extend_from_slice(line.as_bytes());
        framed.push(b'\n');

        self.writer.write_all(&framed).await?;
        self.writer.flush().await
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Mock host link for testing
    #[derive(Clone, Default)]
    pub struct MockHostLink {
        pub incoming: Arc<Mutex<VecDeque<String>>>,
        pub written: Arc<Mutex<Vec<String>>>,
        pub write_error: Arc<Mutex<Option<io::ErrorKind>>>,
    }

    impl MockHostLink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_line(&self, line: &str) {
            self.incoming.lock().unwrap().push_back(line.to_string());
        }

        pub fn get_written(&self) -> Vec<String> {
            self.written.lock().unwrap().clone()
        }

        pub fn set_write_error(&self, error: io::ErrorKind) {
            *self.write_error.lock().unwrap() = Some(error);
        }
    }

    #[async_trait]
    impl HostLink for MockHostLink {
        fn read_line(&mut self) -> Option<String> {
            self.incoming.lock().unwrap().pop_front()
        }

        async fn write_line(&mut self, line: &str) -> io::Result<()> {
            if let Some(error) = *self.write_error.lock().unwrap() {
                return Err(io::Error::new(error, "Mock write error"));
            }
            self.written.lock().unwrap().push(line.to_string());
            Ok(())
        }
    }
}
