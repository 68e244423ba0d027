use std::io::{ErrorKind, Read, Write};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Adapts any `Read + Write` stream to [`Transport`].
///
/// `TimedOut`, `WouldBlock` and end-of-stream all read as "no byte yet", so a
/// socket with a read timeout behaves like a serial port. `clear_input` is a
/// no-op because generic streams expose no receive buffer.
#[derive(Debug)]
pub struct IoTransport<S> {
    inner: S,
}

impl<S: Read + Write> IoTransport<S> {
    /// Wrap a stream.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the adapter and return the inner stream.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Read + Write> Transport for IoTransport<S> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) =>
                {
                    return Ok(None)
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < data.len() {
            match self.inner.write(&data[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        self.inner.flush().map_err(TransportError::Io)
    }

    fn clear_input(&mut self) -> Result<()> {
        Ok(())
    }
}
