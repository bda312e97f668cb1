//! Line-oriented session I/O
//!
//! Adapts a raw byte stream into line reads and flushed line writes.
//! Nothing in here knows about channels.

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead};

/// Longest line accepted from a peer, terminator excluded
pub const MAX_LINE_LENGTH: usize = 8 * 1024;

/// Split a TCP connection into its line reader and writer
pub fn split(
    stream: TcpStream,
    max_line_length: usize,
) -> (SessionReader<OwnedReadHalf>, SessionWriter<OwnedWriteHalf>) {
    let (read_half, write_half) = stream.into_split();
    (
        SessionReader::with_max_length(read_half, max_line_length),
        SessionWriter::new(write_half),
    )
}

/// Line reader over one side of a connection
///
/// Bytes are passed through as-is; anything that is not valid UTF-8 is
/// replaced with U+FFFD rather than failing the read.
pub struct SessionReader<R> {
    frames: FramedRead<R, AnyDelimiterCodec>,
}

impl<R: AsyncRead + Unpin> SessionReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_max_length(inner, MAX_LINE_LENGTH)
    }

    pub fn with_max_length(inner: R, max_line_length: usize) -> Self {
        let codec =
            AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), b"\n".to_vec(), max_line_length);
        Self {
            frames: FramedRead::new(inner, codec),
        }
    }

    /// Read the next line with its `\n` or `\r\n` terminator stripped.
    ///
    /// `Ok(None)` means the peer closed the stream. A line longer than the
    /// maximum length is an `InvalidData` error.
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let Some(frame) = self.frames.next().await.transpose().map_err(into_io)? else {
            return Ok(None);
        };
        let line = frame.strip_suffix(b"\r").unwrap_or(&frame[..]);
        Ok(Some(String::from_utf8_lossy(line).into_owned()))
    }
}

fn into_io(err: AnyDelimiterCodecError) -> std::io::Error {
    match err {
        AnyDelimiterCodecError::Io(e) => e,
        other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
    }
}

/// Buffered line writer over one side of a connection
pub struct SessionWriter<W> {
    inner: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> SessionWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: BufWriter::new(inner),
        }
    }

    /// Write `text` followed by a newline and flush it to the peer.
    pub async fn write_line(&mut self, text: &str) -> std::io::Result<()> {
        self.inner.write_all(text.as_bytes()).await?;
        self.inner.write_all(b"\n").await?;
        self.inner.flush().await
    }

    /// Flush and close the write direction of the connection.
    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        self.inner.shutdown().await
    }
}
