//! Live head monitoring over the node's chunked stream.
//!
//! `/monitor/heads/main` keeps the HTTP response open and writes one
//! JSON object per new head, newline-separated. [`HeadMonitor`] buffers
//! the byte stream, splits on newlines, and yields typed [`NewHead`]
//! values one at a time.
//!
//! Cancellation is by drop: dropping the monitor closes the connection.
//! There is no re-subscription here -- reconnect policy belongs to the
//! consumer, which must restart its own search from scratch after a
//! disconnect.

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;

use crate::types::{NewHead, RawNewHead};
use crate::RpcError;

/// A live stream of new block heads.
pub struct HeadMonitor {
    stream: BoxStream<'static, reqwest::Result<Bytes>>,
    buffer: Vec<u8>,
    closed: bool,
}

impl HeadMonitor {
    pub(crate) fn new(
        stream: impl futures_util::Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
    ) -> Self {
        Self {
            stream: stream.boxed(),
            buffer: Vec::new(),
            closed: false,
        }
    }

    /// Await the next head notification.
    ///
    /// Returns `Ok(None)` when the node closed the stream cleanly, and
    /// [`RpcError::Transport`] on a mid-stream failure. After either,
    /// further calls keep returning `Ok(None)`.
    pub async fn next_head(&mut self) -> Result<Option<NewHead>, RpcError> {
        loop {
            if let Some(head) = self.take_buffered_line()? {
                return Ok(Some(head));
            }

            if self.closed {
                return Ok(None);
            }

            match self.stream.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    self.closed = true;
                    return Err(RpcError::Transport(e.to_string()));
                }
                None => {
                    self.closed = true;
                    // A trailing object without a final newline still counts.
                    if let Some(head) = self.take_trailing()? {
                        return Ok(Some(head));
                    }
                    return Ok(None);
                }
            }
        }
    }

    /// Pop one complete newline-terminated object from the buffer.
    fn take_buffered_line(&mut self) -> Result<Option<NewHead>, RpcError> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = &line[..line.len() - 1];
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return parse_head(line).map(Some);
        }
        Ok(None)
    }

    fn take_trailing(&mut self) -> Result<Option<NewHead>, RpcError> {
        if self.buffer.iter().all(u8::is_ascii_whitespace) {
            self.buffer.clear();
            return Ok(None);
        }
        let line = std::mem::take(&mut self.buffer);
        parse_head(&line).map(Some)
    }
}

impl std::fmt::Debug for HeadMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadMonitor")
            .field("buffered", &self.buffer.len())
            .field("closed", &self.closed)
            .finish()
    }
}

fn parse_head(line: &[u8]) -> Result<NewHead, RpcError> {
    let raw: RawNewHead = serde_json::from_slice(line)
        .map_err(|e| RpcError::Decode(format!("bad head notification: {e}")))?;
    raw.try_into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
