//! Line-delimited JSON-RPC over stdio

use super::protocol::{JsonRpcRequest, JsonRpcResponse};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// One message read from the client
#[derive(Debug)]
pub enum Incoming {
    Request(JsonRpcRequest),
    /// A line that is not a valid JSON-RPC request
    Malformed(String),
    /// Blank line
    Empty,
}

/// Async transport over any buffered reader / writer pair; stdio by default.
pub struct AsyncStdioTransport<R = BufReader<tokio::io::Stdin>, W = tokio::io::Stdout> {
    reader: R,
    writer: W,
}

impl AsyncStdioTransport {
    pub fn new() -> Self {
        Self::with_io(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl Default for AsyncStdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> AsyncStdioTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn with_io(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Read the next message; `None` at end of input.
    pub async fn read_message(&mut self) -> io::Result<Option<Incoming>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }

        let line = line.trim();
        if line.is_empty() {
            return Ok(Some(Incoming::Empty));
        }

        match serde_json::from_str(line) {
            Ok(request) => Ok(Some(Incoming::Request(request))),
            Err(e) => {
                tracing::warn!("Failed to parse JSON-RPC request: {}", e);
                Ok(Some(Incoming::Malformed(e.to_string())))
            }
        }
    }

    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        let json = serde_json::to_string(response)?;
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    /// Give back the writer (tests inspect what was written)
    pub fn into_writer(self) -> W {
        self.writer
    }
}
