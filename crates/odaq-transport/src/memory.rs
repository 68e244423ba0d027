use std::collections::VecDeque;

use tracing::trace;

use crate::error::Result;
use crate::traits::Transport;

/// In-memory device double.
///
/// Bytes passed to [`feed`](Self::feed) are readable immediately. Responses
/// queued with [`queue_response`](Self::queue_response) become readable one
/// per `write_all`, which mimics a device answering each command packet.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    inbound: VecDeque<u8>,
    responses: VecDeque<Vec<u8>>,
    written: Vec<u8>,
    writes: usize,
}

impl MemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport whose inbound side already holds `bytes`.
    pub fn with_inbound(bytes: &[u8]) -> Self {
        let mut link = Self::new();
        link.feed(bytes);
        link
    }

    /// Make bytes readable right away.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    /// Queue a response released by the next write.
    pub fn queue_response(&mut self, bytes: impl Into<Vec<u8>>) {
        self.responses.push_back(bytes.into());
    }

    /// Everything written so far.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Take and clear the write log.
    pub fn take_written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.written)
    }

    /// Number of `write_all` calls seen.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Bytes still waiting to be read.
    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    /// Responses queued but not yet released.
    pub fn pending_responses(&self) -> usize {
        self.responses.len()
    }
}

impl Transport for MemoryTransport {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        Ok(self.inbound.pop_front())
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.written.extend_from_slice(data);
        self.writes += 1;
        if let Some(response) = self.responses.pop_front() {
            trace!(len = response.len(), "releasing scripted response");
            self.inbound.extend(response);
        }
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()> {
        self.inbound.clear();
        Ok(())
    }
}
