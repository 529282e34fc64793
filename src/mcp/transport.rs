//! Newline-delimited JSON transport.
//!
//! One JSON-RPC message per line in each direction. stdout carries protocol
//! traffic only; logging goes to stderr.

use std::io;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};

/// Reads requests from `R` and writes replies to `W`.
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
}

/// The transport used by the gateway binary.
pub type StdioTransport = LineTransport<BufReader<Stdin>, Stdout>;

impl StdioTransport {
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub const fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Next line without its terminator, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// Propagates read failures.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    /// Serialises `message` on a single line and flushes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if serialisation fails, otherwise write errors.
    pub async fn send<T: Serialize>(&mut self, message: &T) -> io::Result<()> {
        // serde_json escapes control characters, so compact output is one line
        let mut bytes = serde_json::to_vec(message)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        bytes.push(b'\n');
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await
    }

    /// Gives back the writer, mainly so tests can inspect what was sent.
    pub fn into_writer(self) -> W {
        self.writer
    }
}
