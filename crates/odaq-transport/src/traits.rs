use crate::error::Result;

/// A byte link to a device.
///
/// Reads are bounded by the transport's own timeout: `read_byte` returning
/// `Ok(None)` means nothing arrived in time, which is not an error. Only
/// failures of the link itself are reported as `Err`.
pub trait Transport {
    /// Read the next byte, or `None` if the read timed out.
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Write the whole buffer.
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Discard any received-but-unread input.
    fn clear_input(&mut self) -> Result<()>;

    /// Read up to `len` bytes, stopping early at the first timeout.
    ///
    /// The returned buffer is shorter than `len` when the device went quiet.
    fn read_up_to(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len);
        while out.len() < len {
            match self.read_byte()? {
                Some(byte) => out.push(byte),
                None => break,
            }
        }
        Ok(out)
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        (**self).write_all(data)
    }

    fn clear_input(&mut self) -> Result<()> {
        (**self).clear_input()
    }

    fn read_up_to(&mut self, len: usize) -> Result<Vec<u8>> {
        (**self).read_up_to(len)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        (**self).write_all(data)
    }

    fn clear_input(&mut self) -> Result<()> {
        (**self).clear_input()
    }

    fn read_up_to(&mut self, len: usize) -> Result<Vec<u8>> {
        (**self).read_up_to(len)
    }
}
